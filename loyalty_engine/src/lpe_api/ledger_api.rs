use std::fmt::Debug;

use log::*;
use lpg_common::Points;

use crate::{
    db_types::{AccountId, LedgerEntry, Order, OrderNumber},
    lpe_api::ledger_objects::{BalanceResult, WithdrawalResult},
    traits::{LedgerApiError, LedgerManagement, LoyaltyGatewayDatabase, LoyaltyGatewayError},
};

/// `LedgerApi` exposes the balance queries and the withdrawal flow to request handlers.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    /// The user's current balance together with their lifetime withdrawn total.
    pub async fn balance(&self, user: AccountId) -> Result<BalanceResult, LedgerApiError> {
        let current = self.db.current_balance(user).await?;
        let withdrawn = self.db.withdrawn_total(user).await?;
        Ok(BalanceResult { current, withdrawn })
    }

    /// The user's withdrawals, oldest first.
    pub async fn withdrawals(&self, user: AccountId) -> Result<Vec<WithdrawalResult>, LedgerApiError> {
        let entries = self.db.withdrawals_for_account(user).await?;
        Ok(entries.into_iter().map(WithdrawalResult::from).collect())
    }

    /// Every ledger entry that mentions the user's account, oldest first.
    pub async fn history(&self, user: AccountId) -> Result<Vec<LedgerEntry>, LedgerApiError> {
        self.db.entries_for_account(user).await
    }

    /// The user's orders, oldest first.
    pub async fn orders(&self, user: AccountId) -> Result<Vec<Order>, LedgerApiError> {
        self.db.fetch_orders_for_account(user).await
    }
}

impl<B> LedgerApi<B>
where B: LoyaltyGatewayDatabase
{
    /// Spends part of the user's balance against an order number.
    ///
    /// The amount must be positive and the order number Luhn-valid; both are rejected synchronously without
    /// touching the ledger. The funds check itself happens inside the backend's transaction, so the entry is only
    /// appended when the recomputed balance actually covers the amount.
    pub async fn withdraw(
        &self,
        user: AccountId,
        amount: Points,
        order: OrderNumber,
    ) -> Result<LedgerEntry, LoyaltyGatewayError> {
        if !amount.is_positive() {
            return Err(LedgerApiError::NonPositiveAmount(amount).into());
        }
        if !order.is_luhn_valid() {
            debug!("💰️ Rejecting withdrawal: {order} fails Luhn validation");
            return Err(LedgerApiError::InvalidOrderNumber(order).into());
        }
        self.db.withdraw(user, amount, &order).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

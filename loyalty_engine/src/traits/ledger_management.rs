use lpg_common::Points;
use thiserror::Error;

use crate::db_types::{AccountId, LedgerEntry, Order, OrderNumber};

#[derive(Debug, Clone, Error)]
pub enum LedgerApiError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Insufficient funds: the balance is {available} but {requested} was requested")]
    InsufficientFunds { available: Points, requested: Points },
    #[error("Order number {0} fails Luhn validation")]
    InvalidOrderNumber(OrderNumber),
    #[error("A transfer amount must be positive, but {0} was given")]
    NonPositiveAmount(Points),
    #[error("The requested order {0} does not exist")]
    OrderDoesNotExist(OrderNumber),
    #[error("The requested account {0} does not exist")]
    AccountNotFound(AccountId),
}

impl From<sqlx::Error> for LedgerApiError {
    fn from(e: sqlx::Error) -> Self {
        LedgerApiError::DatabaseError(e.to_string())
    }
}

/// Read-side aggregations over the ledger and the order book.
///
/// These methods have no side effects. A user's balance is the signed sum of every ledger entry that mentions
/// their account; the withdrawn total is the same sum restricted to withdraw-kind entries.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// The user's spendable balance, recomputed from the ledger.
    async fn current_balance(&self, user: AccountId) -> Result<Points, LedgerApiError>;

    /// The lifetime sum of the user's withdrawals.
    async fn withdrawn_total(&self, user: AccountId) -> Result<Points, LedgerApiError>;

    /// Every ledger entry that credits or debits the given account, oldest first.
    async fn entries_for_account(&self, user: AccountId) -> Result<Vec<LedgerEntry>, LedgerApiError>;

    /// The user's withdraw-kind entries, oldest first.
    async fn withdrawals_for_account(&self, user: AccountId) -> Result<Vec<LedgerEntry>, LedgerApiError>;

    /// Every ledger entry attached to the given order number, oldest first.
    async fn entries_for_order(&self, order: &OrderNumber) -> Result<Vec<LedgerEntry>, LedgerApiError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, LedgerApiError>;

    /// The user's orders, oldest first.
    async fn fetch_orders_for_account(&self, user: AccountId) -> Result<Vec<Order>, LedgerApiError>;
}

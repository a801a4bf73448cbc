//! `SqliteDatabase` is a concrete implementation of a loyalty points engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use lpg_common::Points;
use sqlx::SqlitePool;

use super::db::{db_url, ledger, new_pool, orders, users};
use crate::{
    db_types::{AccountId, LedgerEntry, NewOrder, Order, OrderNumber, OrderStatusType, TransactionKind, User},
    traits::{
        AccrualOutcome,
        AuthApiError,
        AuthManagement,
        LedgerApiError,
        LedgerManagement,
        LoyaltyGatewayDatabase,
        LoyaltyGatewayError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl LoyaltyGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), LoyaltyGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(order, &mut conn).await
    }

    async fn fetch_orders_by_status(
        &self,
        statuses: &[OrderStatusType],
    ) -> Result<Vec<Order>, LoyaltyGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::orders_by_status(statuses, &mut conn).await?;
        Ok(orders)
    }

    /// Settles an accrual result against an order in a single atomic transaction.
    ///
    /// The status update fires first, guarded against terminal states; the ledger credit is only inserted when
    /// the update actually applied. If the transaction aborts between the two statements, SQLite rolls back the
    /// status change as well, so a half-applied settlement cannot be observed.
    async fn accrue_order(
        &self,
        order: &OrderNumber,
        new_status: OrderStatusType,
        amount: Points,
    ) -> Result<AccrualOutcome, LoyaltyGatewayError> {
        if amount.is_positive() && new_status != OrderStatusType::Processed {
            return Err(LoyaltyGatewayError::InconsistentAccrual { status: new_status, amount });
        }
        let mut tx = self.pool.begin().await?;
        let accrual = amount.is_positive().then_some(amount);
        let outcome = match orders::settle_order(order, new_status, accrual, &mut tx).await? {
            Some(updated) => {
                let entry = if amount.is_positive() {
                    let entry = ledger::insert_entry(
                        AccountId::SYSTEM,
                        updated.user_id,
                        amount,
                        order,
                        TransactionKind::Accrual,
                        &mut tx,
                    )
                    .await?;
                    debug!("🗃️ Order {order} settled as {new_status}. {amount} credited to account {}", updated.user_id);
                    Some(entry)
                } else {
                    debug!("🗃️ Order {order} moved to {new_status}");
                    None
                };
                AccrualOutcome::applied(updated, entry)
            },
            None => {
                // No row matched: the order is either gone or already terminal. Nothing has been written, so
                // committing here is a no-op either way.
                let existing = orders::fetch_order_by_number(order, &mut tx)
                    .await?
                    .ok_or_else(|| LoyaltyGatewayError::OrderNotFound(order.clone()))?;
                trace!("🗃️ Order {order} is already {}. Settlement skipped.", existing.status);
                AccrualOutcome::unchanged(existing)
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn withdraw(
        &self,
        user: AccountId,
        amount: Points,
        order: &OrderNumber,
    ) -> Result<LedgerEntry, LoyaltyGatewayError> {
        if !amount.is_positive() {
            return Err(LedgerApiError::NonPositiveAmount(amount).into());
        }
        let mut tx = self.pool.begin().await?;
        // The balance is recomputed from the ledger inside the same transaction that appends the new entry, so a
        // concurrent writer can never make this check observe a stale figure.
        let available = ledger::balance_for_account(user, &mut tx).await.map_err(LedgerApiError::from)?;
        if available < amount {
            debug!("🗃️ Account {user} requested a withdrawal of {amount} but only has {available}");
            return Err(LedgerApiError::InsufficientFunds { available, requested: amount }.into());
        }
        let entry = ledger::insert_entry(user, AccountId::SYSTEM, amount, order, TransactionKind::Withdraw, &mut tx)
            .await
            .map_err(LedgerApiError::from)?;
        tx.commit().await?;
        debug!("🗃️ Account {user} withdrew {amount} against order {order}");
        Ok(entry)
    }

    async fn close(&mut self) -> Result<(), LoyaltyGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn current_balance(&self, user: AccountId) -> Result<Points, LedgerApiError> {
        let mut conn = self.pool.acquire().await?;
        let balance = ledger::balance_for_account(user, &mut conn).await?;
        Ok(balance)
    }

    async fn withdrawn_total(&self, user: AccountId) -> Result<Points, LedgerApiError> {
        let mut conn = self.pool.acquire().await?;
        let total = ledger::withdrawn_total_for_account(user, &mut conn).await?;
        Ok(total)
    }

    async fn entries_for_account(&self, user: AccountId) -> Result<Vec<LedgerEntry>, LedgerApiError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::entries_for_account(user, &mut conn).await?;
        Ok(entries)
    }

    async fn withdrawals_for_account(&self, user: AccountId) -> Result<Vec<LedgerEntry>, LedgerApiError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::withdrawals_for_account(user, &mut conn).await?;
        Ok(entries)
    }

    async fn entries_for_order(&self, order: &OrderNumber) -> Result<Vec<LedgerEntry>, LedgerApiError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::entries_for_order(order, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, LedgerApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_account(&self, user: AccountId) -> Result<Vec<Order>, LedgerApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::orders_for_account(user, &mut conn).await?;
        Ok(orders)
    }
}

impl AuthManagement for SqliteDatabase {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AuthApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AuthApiError::DatabaseError(e.to_string()))?;
        users::insert_user(username, password_hash, &mut conn).await
    }

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, AuthApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AuthApiError::DatabaseError(e.to_string()))?;
        users::user_by_username(username, &mut conn).await
    }

    async fn fetch_user_by_id(&self, id: AccountId) -> Result<Option<User>, AuthApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| AuthApiError::DatabaseError(e.to_string()))?;
        users::user_by_id(id, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment (or the default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

use lpg_common::Points;
use thiserror::Error;

use crate::{
    db_types::{AccountId, LedgerEntry, NewOrder, Order, OrderNumber, OrderStatusType},
    traits::{data_objects::AccrualOutcome, LedgerApiError, LedgerManagement},
};

/// This trait defines the write-side behaviour for backends supporting the loyalty points engine.
///
/// This behaviour includes:
/// * Storing newly submitted orders.
/// * Settling accrual results against orders, atomically with the matching ledger credit.
/// * Handling withdrawal requests against the ledger.
#[allow(async_fn_in_trait)]
pub trait LoyaltyGatewayDatabase: Clone + LedgerManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Stores a new order. This call is idempotent: if an order with the same number already exists, the stored
    /// record is returned and `false` is returned in the second element.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), LoyaltyGatewayError>;

    /// Fetches all orders whose status is one of `statuses`, oldest first.
    async fn fetch_orders_by_status(&self, statuses: &[OrderStatusType]) -> Result<Vec<Order>, LoyaltyGatewayError>;

    /// Settles an accrual result against an order in a single atomic unit.
    ///
    /// In one transaction:
    /// * the order's status and accrual amount are set to the supplied values, and
    /// * if `amount` is positive, one ledger entry crediting the order's owner from the system account is created.
    ///
    /// Both effects commit or both roll back. A half-applied settlement (order marked `Processed` without the
    /// matching credit, or vice versa) must be impossible by construction.
    ///
    /// The status update only fires when the stored order is still in a non-terminal state. If the order has
    /// already been settled, the stored record is returned unchanged with `applied == false` and no ledger entry
    /// is created, making redundant settlement attempts harmless.
    async fn accrue_order(
        &self,
        order: &OrderNumber,
        new_status: OrderStatusType,
        amount: Points,
    ) -> Result<AccrualOutcome, LoyaltyGatewayError>;

    /// Moves `amount` from the user's balance to the system account, recorded against `order`.
    ///
    /// The pre-transaction balance is recomputed by summing the existing ledger entries inside the same database
    /// transaction that inserts the new entry; if it is less than `amount` the call fails with
    /// [`LedgerApiError::InsufficientFunds`] and nothing is written.
    async fn withdraw(
        &self,
        user: AccountId,
        amount: Points,
        order: &OrderNumber,
    ) -> Result<LedgerEntry, LoyaltyGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LoyaltyGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LoyaltyGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("{0}")]
    LedgerError(#[from] LedgerApiError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("An accrual of {amount} cannot accompany a transition to {status}")]
    InconsistentAccrual { status: OrderStatusType, amount: Points },
    #[error("The account that owns order {0} does not exist (even though it should)")]
    AccountShouldExistForOrder(OrderNumber),
}

impl From<sqlx::Error> for LoyaltyGatewayError {
    fn from(e: sqlx::Error) -> Self {
        LoyaltyGatewayError::DatabaseError(e.to_string())
    }
}

impl LoyaltyGatewayError {
    /// True when the failure is a synchronous validation rejection rather than an infrastructure fault.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            LoyaltyGatewayError::LedgerError(
                LedgerApiError::InvalidOrderNumber(_) | LedgerApiError::NonPositiveAmount(_)
            ) | LoyaltyGatewayError::InconsistentAccrual { .. }
        )
    }
}

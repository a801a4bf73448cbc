use crate::db_types::{LedgerEntry, Order};

/// The result of inserting a (possibly duplicate) order submission.
#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    /// The order was new and has been stored.
    Inserted(Order),
    /// The same user already submitted this order number. Not an error.
    AlreadyUploaded(Order),
    /// A different user already submitted this order number.
    OwnedByAnotherUser(Order),
}

/// The result of an accrual settlement attempt.
///
/// `applied` is false when the order was already terminal and nothing changed; in that case `entry` is always
/// `None` and `order` carries the stored (unchanged) record.
#[derive(Debug, Clone)]
pub struct AccrualOutcome {
    pub order: Order,
    /// The ledger credit created by this settlement, when a positive reward was granted.
    pub entry: Option<LedgerEntry>,
    pub applied: bool,
}

impl AccrualOutcome {
    pub fn applied(order: Order, entry: Option<LedgerEntry>) -> Self {
        Self { order, entry, applied: true }
    }

    pub fn unchanged(order: Order) -> Self {
        Self { order, entry: None, applied: false }
    }
}

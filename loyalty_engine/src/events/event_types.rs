use lpg_common::Points;

use crate::db_types::Order;

/// Emitted when a processed order's reward has been credited to its owner's balance.
///
/// The event carries the settled order and the credited amount, and is published after the ledger entry and the
/// order update have committed together.
#[derive(Debug, Clone)]
pub struct OrderAccruedEvent {
    pub order: Order,
    pub amount: Points,
}

impl OrderAccruedEvent {
    pub fn new(order: Order, amount: Points) -> Self {
        Self { order, amount }
    }
}

/// Emitted when reconciliation gives up on an order and cancels it to the terminal `Invalid` status.
#[derive(Debug, Clone)]
pub struct OrderAnnulledEvent {
    pub order: Order,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

use chrono::{DateTime, Utc};
use lpg_common::Points;
use serde::Serialize;

use crate::db_types::{LedgerEntry, OrderNumber};

/// The wire representation of a user's balance.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BalanceResult {
    pub current: Points,
    pub withdrawn: Points,
}

/// The wire representation of one completed withdrawal.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalResult {
    pub order: OrderNumber,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl From<LedgerEntry> for WithdrawalResult {
    fn from(entry: LedgerEntry) -> Self {
        Self { order: entry.order_number, sum: entry.amount, processed_at: entry.created_at }
    }
}

//! Backend contracts for the loyalty points engine.
//!
//! A storage backend implements these traits to host the engine. The split mirrors how the engine is used:
//!
//! * [`LoyaltyGatewayDatabase`] defines the write-side behaviour: order intake, the atomic accrual settlement, and
//!   withdrawals. This is the contract the reconciliation flow depends on.
//! * [`LedgerManagement`] provides the read-side aggregations: balances, withdrawal totals and history. Balances
//!   are always recomputed from the ledger rows rather than read from a cached counter, so concurrent writers can
//!   never leave a stale figure behind.
//! * [`AuthManagement`] manages user records and credentials.
mod auth_management;
mod data_objects;
mod ledger_management;
mod loyalty_gateway_database;

pub use auth_management::{AuthApiError, AuthManagement};
pub use data_objects::{AccrualOutcome, InsertOrderResult};
pub use ledger_management::{LedgerApiError, LedgerManagement};
pub use loyalty_gateway_database::{LoyaltyGatewayDatabase, LoyaltyGatewayError};

//! The public-facing API of the loyalty points engine.
//!
//! Request handlers and the accrual worker talk to these wrappers rather than to the storage backend directly:
//!
//! * [`order_flow_api::OrderFlowApi`] — order intake and reconciliation (the per-order state machine).
//! * [`ledger_api::LedgerApi`] — balances, withdrawals and ledger history.
//! * [`auth_api::AuthApi`] — user records.
pub mod auth_api;
pub mod ledger_api;
pub mod ledger_objects;
pub mod order_flow_api;
pub mod order_objects;

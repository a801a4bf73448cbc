//! Loyalty Points Engine
//!
//! The engine is the core of the loyalty points gateway: it owns the order lifecycle, the append-only points
//! ledger, and the reconciliation logic that applies externally calculated accruals to both at once. It is
//! transport-agnostic; the HTTP server and the background accrual worker are thin layers on top of this crate.
//!
//! The crate is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the only supported backend at present. You should
//!    never need to touch the database directly; use the public APIs instead. The exception is the data types used
//!    in the database, which live in the public [`mod@db_types`] module.
//! 2. The backend contracts ([`mod@traits`]). A storage backend implements these traits to host the engine. The
//!    most important contract is [`traits::LoyaltyGatewayDatabase::accrue_order`], which must apply the ledger
//!    credit and the order status change as one atomic unit.
//! 3. The public API ([`OrderFlowApi`], [`LedgerApi`], [`AuthApi`]). This is what request handlers and the accrual
//!    worker call.
//!
//! The engine also emits events when orders are credited or annulled. A simple actor framework ([`mod@events`])
//! lets the embedding process hook into these without the engine knowing anything about its observers.
pub mod db_types;
pub mod events;
pub mod helpers;
mod lpe_api;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub mod test_utils;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use lpe_api::{
    auth_api::AuthApi,
    ledger_api::LedgerApi,
    ledger_objects,
    order_flow_api::OrderFlowApi,
    order_objects,
};

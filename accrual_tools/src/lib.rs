//! Client for the external loyalty accrual calculation service.
//!
//! The accrual service is an opaque upstream: orders are registered with it out-of-band, and this crate only asks
//! it for the current calculation state of a single order number. Responses map onto a closed set of outcomes
//! ([`OrderAccrual`] on success, [`AccrualApiError`] otherwise) so that callers can match on them exhaustively
//! instead of sniffing status codes.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::AccrualApi;
pub use config::AccrualConfig;
pub use data_objects::{AccrualStatus, OrderAccrual};
pub use error::AccrualApiError;

//! # Loyalty points gateway server
//!
//! This crate hosts the HTTP server and the background accrual worker. It is responsible for:
//! * User registration and login, issuing JWT bearer tokens.
//! * Accepting order submissions and answering balance/withdrawal queries.
//! * Driving order reconciliation forward by polling the external accrual service.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/user/register`, `/api/user/login`: Credential handling.
//! * `/api/user/orders`: Order submission (POST) and listing (GET).
//! * `/api/user/balance`, `/api/user/balance/withdraw`, `/api/user/withdrawals`: Ledger queries and withdrawals.
pub mod accrual_worker;
pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

//! minibank Library
//!
//! Toy banking backend: per-user balances and append-only transaction
//! histories over an in-memory ledger, with deposit, withdrawal, and atomic
//! peer-to-peer transfer. Re-exports modules for integration testing and
//! the server binary.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;

//! HTTP boundary
//!
//! Route definitions and the middleware stack around the ledger core.

pub mod middleware;
pub mod routes;

pub use routes::create_router;

//! Domain types
//!
//! Pure ledger domain: money conversion, transaction records, and the
//! ledger error taxonomy. No I/O and no web dependencies.

mod error;
pub mod money;
mod record;

pub use error::LedgerError;
pub use record::{TransactionKind, TransactionRecord};

/// Account identity, assigned monotonically at registration.
pub type AccountId = i64;

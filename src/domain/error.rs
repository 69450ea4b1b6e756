//! Ledger Error Types
//!
//! Business rule violations returned by the ledger store. They are
//! independent of the web layer; HTTP status mapping lives in `crate::error`.

use thiserror::Error;

/// Errors produced by ledger operations.
///
/// All variants are expected, recoverable outcomes. A failed operation
/// leaves account state exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or non-positive amount
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Withdrawal or transfer exceeds the available balance
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Unknown account or recipient
    #[error("unknown account: {0}")]
    NotFound(String),

    /// Duplicate account creation
    #[error("account already exists: {0}")]
    Conflict(String),

    /// Transfer recipient resolves to the sender
    #[error("cannot transfer to your own account")]
    SelfTransfer,
}

impl LedgerError {
    /// Create an invalid amount error
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        Self::InvalidAmount(reason.into())
    }

    /// Create an insufficient funds error
    pub fn insufficient_funds(required: i64, available: i64) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }
}

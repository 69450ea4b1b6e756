//! Transaction records
//!
//! Each account owns an append-only sequence of these, oldest first.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a transaction did to the owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
}

/// One committed ledger mutation, as seen from the owning account.
///
/// A transfer produces two of these in the same atomic step: a
/// `TransferOut` on the sender and a `TransferIn` on the recipient, with
/// identical amount and timestamp. `counterparty` names the other side of
/// a transfer and is absent for deposits and withdrawals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub counterparty: Option<String>,
    pub created_at: DateTime<Utc>,
}

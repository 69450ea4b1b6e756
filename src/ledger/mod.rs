//! Ledger store
//!
//! The authoritative mapping of account id to balance and transaction
//! history. All five operations run under one process-wide mutex: at most
//! one ledger operation executes at a time, regardless of which accounts it
//! touches. That serializes unrelated deposits, but it makes transfer
//! atomicity and the non-negative balance invariant trivial to uphold.
//! No operation blocks or performs I/O while the guard is held.
//!
//! Every operation validates fully before mutating, so a failed call leaves
//! the ledger untouched.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::domain::{AccountId, LedgerError, TransactionKind, TransactionRecord};

/// Lookup capability supplied by the account registry.
///
/// The ledger consults this to turn a transfer recipient's username into an
/// account id. It never creates, renames, or deletes registry entries.
pub trait RecipientDirectory {
    fn resolve(&self, username: &str) -> Option<AccountId>;
}

#[derive(Debug, Default)]
struct Account {
    balance_minor: i64,
    history: Vec<TransactionRecord>,
}

/// In-memory ledger, constructed once at startup and shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: Mutex<HashMap<AccountId, Account>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // Operations never panic while holding the guard and never leave a
    // half-applied mutation behind, so a poisoned lock is still consistent.
    fn guard(&self) -> MutexGuard<'_, HashMap<AccountId, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a zero-balance account with an empty history.
    ///
    /// # Errors
    /// `LedgerError::Conflict` if the id is already present.
    pub fn create_account(&self, id: AccountId) -> Result<(), LedgerError> {
        match self.guard().entry(id) {
            Entry::Occupied(_) => Err(LedgerError::Conflict(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Account::default());
                Ok(())
            }
        }
    }

    /// Current balance in minor units. Read-only.
    pub fn balance(&self, id: AccountId) -> Result<i64, LedgerError> {
        let accounts = self.guard();
        let account = accounts
            .get(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        Ok(account.balance_minor)
    }

    /// Credit the account and append a `Deposit` record.
    pub fn deposit(&self, id: AccountId, amount_minor: i64) -> Result<(), LedgerError> {
        if amount_minor <= 0 {
            return Err(LedgerError::invalid_amount("amount must be positive"));
        }

        let mut accounts = self.guard();
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        let credited = account
            .balance_minor
            .checked_add(amount_minor)
            .ok_or_else(|| LedgerError::invalid_amount("balance overflow"))?;

        account.balance_minor = credited;
        account.history.push(TransactionRecord {
            kind: TransactionKind::Deposit,
            amount_minor,
            counterparty: None,
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Debit the account and append a `Withdraw` record.
    ///
    /// # Errors
    /// `LedgerError::InsufficientFunds` if the amount exceeds the balance.
    pub fn withdraw(&self, id: AccountId, amount_minor: i64) -> Result<(), LedgerError> {
        if amount_minor <= 0 {
            return Err(LedgerError::invalid_amount("amount must be positive"));
        }

        let mut accounts = self.guard();
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        if amount_minor > account.balance_minor {
            return Err(LedgerError::insufficient_funds(
                amount_minor,
                account.balance_minor,
            ));
        }

        account.balance_minor -= amount_minor;
        account.history.push(TransactionRecord {
            kind: TransactionKind::Withdraw,
            amount_minor,
            counterparty: None,
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Move funds between two accounts as one indivisible step.
    ///
    /// The recipient username is resolved through `directory`, then the
    /// debit, the credit, and the paired `TransferOut`/`TransferIn` records
    /// (sharing one timestamp) are applied under a single acquisition of the
    /// guard. No observer can see the sender debited without the recipient
    /// credited.
    pub fn transfer(
        &self,
        from: AccountId,
        from_username: &str,
        to_username: &str,
        amount_minor: i64,
        directory: &dyn RecipientDirectory,
    ) -> Result<(), LedgerError> {
        if amount_minor <= 0 {
            return Err(LedgerError::invalid_amount("amount must be positive"));
        }
        let recipient_name = to_username.trim();
        if recipient_name.is_empty() {
            return Err(LedgerError::invalid_amount("recipient required"));
        }
        let to = directory
            .resolve(recipient_name)
            .ok_or_else(|| LedgerError::NotFound(recipient_name.to_string()))?;
        if to == from {
            return Err(LedgerError::SelfTransfer);
        }

        let mut accounts = self.guard();
        let available = accounts
            .get(&from)
            .ok_or_else(|| LedgerError::NotFound(from.to_string()))?
            .balance_minor;
        let recipient_balance = accounts
            .get(&to)
            .ok_or_else(|| LedgerError::NotFound(recipient_name.to_string()))?
            .balance_minor;
        if amount_minor > available {
            return Err(LedgerError::insufficient_funds(amount_minor, available));
        }
        let credited = recipient_balance
            .checked_add(amount_minor)
            .ok_or_else(|| LedgerError::invalid_amount("balance overflow"))?;

        // Both sides validated above; the guard stays held across both
        // mutations.
        let now = Utc::now();
        if let Some(sender) = accounts.get_mut(&from) {
            sender.balance_minor = available - amount_minor;
            sender.history.push(TransactionRecord {
                kind: TransactionKind::TransferOut,
                amount_minor,
                counterparty: Some(recipient_name.to_string()),
                created_at: now,
            });
        }
        if let Some(recipient) = accounts.get_mut(&to) {
            recipient.balance_minor = credited;
            recipient.history.push(TransactionRecord {
                kind: TransactionKind::TransferIn,
                amount_minor,
                counterparty: Some(from_username.to_string()),
                created_at: now,
            });
        }
        Ok(())
    }

    /// Up to `limit` most recent records for the account, newest first.
    /// Read-only; the caller is responsible for clamping `limit`.
    pub fn recent_transactions(
        &self,
        id: AccountId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let accounts = self.guard();
        let account = accounts
            .get(&id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
        Ok(account.history.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::domain::money;

    struct StaticDirectory(HashMap<String, AccountId>);

    impl StaticDirectory {
        fn of(entries: &[(&str, AccountId)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(name, id)| (name.to_string(), *id))
                    .collect(),
            )
        }
    }

    impl RecipientDirectory for StaticDirectory {
        fn resolve(&self, username: &str) -> Option<AccountId> {
            self.0.get(username).copied()
        }
    }

    #[test]
    fn create_account_starts_empty() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        assert_eq!(ledger.balance(1).unwrap(), 0);
        assert!(ledger.recent_transactions(1, 10).unwrap().is_empty());
    }

    #[test]
    fn create_account_rejects_duplicate_id() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        assert!(matches!(
            ledger.create_account(1),
            Err(LedgerError::Conflict(_))
        ));
    }

    #[test]
    fn unknown_account_is_not_found() {
        let ledger = Ledger::new();
        assert!(matches!(ledger.balance(9), Err(LedgerError::NotFound(_))));
        assert!(matches!(
            ledger.deposit(9, 100),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            ledger.recent_transactions(9, 10),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn deposit_increases_balance_and_appends_one_record() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();

        ledger.deposit(1, 2_500).unwrap();

        assert_eq!(ledger.balance(1).unwrap(), 2_500);
        let history = ledger.recent_transactions(1, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TransactionKind::Deposit);
        assert_eq!(history[0].amount_minor, 2_500);
        assert_eq!(history[0].counterparty, None);
    }

    #[test]
    fn deposit_rejects_non_positive_amounts() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();

        for amount in [0, -1, -2_500] {
            assert!(matches!(
                ledger.deposit(1, amount),
                Err(LedgerError::InvalidAmount(_))
            ));
        }
        assert_eq!(ledger.balance(1).unwrap(), 0);
        assert!(ledger.recent_transactions(1, 10).unwrap().is_empty());
    }

    #[test]
    fn withdraw_beyond_balance_leaves_state_unchanged() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.deposit(1, 1_000).unwrap();

        let err = ledger.withdraw(1, 1_001).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                required: 1_001,
                available: 1_000
            }
        );
        assert_eq!(ledger.balance(1).unwrap(), 1_000);
        assert_eq!(ledger.recent_transactions(1, 10).unwrap().len(), 1);
    }

    #[test]
    fn withdraw_of_exact_balance_succeeds() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.deposit(1, 1_000).unwrap();

        ledger.withdraw(1, 1_000).unwrap();
        assert_eq!(ledger.balance(1).unwrap(), 0);
    }

    #[test]
    fn transfer_moves_funds_and_pairs_records() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.create_account(2).unwrap();
        ledger.deposit(1, 10_000).unwrap();
        let directory = StaticDirectory::of(&[("alice", 1), ("bob", 2)]);

        ledger.transfer(1, "alice", "bob", 4_000, &directory).unwrap();

        assert_eq!(ledger.balance(1).unwrap(), 6_000);
        assert_eq!(ledger.balance(2).unwrap(), 4_000);

        let out = &ledger.recent_transactions(1, 1).unwrap()[0];
        let incoming = &ledger.recent_transactions(2, 1).unwrap()[0];
        assert_eq!(out.kind, TransactionKind::TransferOut);
        assert_eq!(out.counterparty.as_deref(), Some("bob"));
        assert_eq!(incoming.kind, TransactionKind::TransferIn);
        assert_eq!(incoming.counterparty.as_deref(), Some("alice"));
        assert_eq!(out.amount_minor, incoming.amount_minor);
        assert_eq!(out.created_at, incoming.created_at);
    }

    #[test]
    fn transfer_to_self_is_rejected_regardless_of_balance() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.deposit(1, 10_000).unwrap();
        let directory = StaticDirectory::of(&[("alice", 1)]);

        assert_eq!(
            ledger.transfer(1, "alice", "alice", 100, &directory),
            Err(LedgerError::SelfTransfer)
        );
        assert_eq!(ledger.balance(1).unwrap(), 10_000);
    }

    #[test]
    fn transfer_to_unknown_recipient_is_not_found() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.deposit(1, 10_000).unwrap();
        let directory = StaticDirectory::of(&[("alice", 1)]);

        assert!(matches!(
            ledger.transfer(1, "alice", "carol", 100, &directory),
            Err(LedgerError::NotFound(_))
        ));
        assert_eq!(ledger.balance(1).unwrap(), 10_000);
        assert_eq!(ledger.recent_transactions(1, 10).unwrap().len(), 1);
    }

    #[test]
    fn transfer_rejects_blank_recipient_and_bad_amounts() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.create_account(2).unwrap();
        ledger.deposit(1, 10_000).unwrap();
        let directory = StaticDirectory::of(&[("alice", 1), ("bob", 2)]);

        assert!(matches!(
            ledger.transfer(1, "alice", "  ", 100, &directory),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.transfer(1, "alice", "bob", 0, &directory),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.transfer(1, "alice", "bob", -5, &directory),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn transfer_with_insufficient_funds_touches_neither_side() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.create_account(2).unwrap();
        ledger.deposit(1, 100).unwrap();
        let directory = StaticDirectory::of(&[("alice", 1), ("bob", 2)]);

        assert!(matches!(
            ledger.transfer(1, "alice", "bob", 200, &directory),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.balance(1).unwrap(), 100);
        assert_eq!(ledger.balance(2).unwrap(), 0);
        assert!(ledger.recent_transactions(2, 10).unwrap().is_empty());
    }

    #[test]
    fn listing_returns_newest_first_up_to_limit() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        for amount in [100, 200, 300] {
            ledger.deposit(1, amount).unwrap();
        }

        let recent = ledger.recent_transactions(1, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].amount_minor, 300);
        assert_eq!(recent[1].amount_minor, 200);
    }

    #[test]
    fn queries_are_idempotent() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.deposit(1, 500).unwrap();

        assert_eq!(ledger.balance(1).unwrap(), ledger.balance(1).unwrap());
        assert_eq!(
            ledger.recent_transactions(1, 10).unwrap(),
            ledger.recent_transactions(1, 10).unwrap()
        );
    }

    // End-to-end flow driven through the money codec.
    #[test]
    fn deposit_transfer_withdraw_scenario() {
        let ledger = Ledger::new();
        ledger.create_account(1).unwrap();
        ledger.create_account(2).unwrap();
        let directory = StaticDirectory::of(&[("alice", 1), ("bob", 2)]);

        ledger.deposit(1, money::parse_minor("100.00").unwrap()).unwrap();
        assert_eq!(money::format_minor(ledger.balance(1).unwrap()), "100.00");

        ledger
            .transfer(1, "alice", "bob", money::parse_minor("40.00").unwrap(), &directory)
            .unwrap();
        assert_eq!(money::format_minor(ledger.balance(1).unwrap()), "60.00");
        assert_eq!(money::format_minor(ledger.balance(2).unwrap()), "40.00");

        let err = ledger
            .withdraw(1, money::parse_minor("1000.00").unwrap())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(money::format_minor(ledger.balance(1).unwrap()), "60.00");
    }

    #[test]
    fn concurrent_deposits_keep_the_balance_exact() {
        let ledger = Arc::new(Ledger::new());
        ledger.create_account(1).unwrap();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..100 {
                        ledger.deposit(1, 25).unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        assert_eq!(ledger.balance(1).unwrap(), 8 * 100 * 25);
        assert_eq!(ledger.recent_transactions(1, 1_000).unwrap().len(), 800);
    }

    #[test]
    fn concurrent_transfers_conserve_total_funds() {
        let ledger = Arc::new(Ledger::new());
        ledger.create_account(1).unwrap();
        ledger.create_account(2).unwrap();
        ledger.deposit(1, 10_000).unwrap();
        ledger.deposit(2, 10_000).unwrap();

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    let directory = StaticDirectory::of(&[("alice", 1), ("bob", 2)]);
                    for _ in 0..50 {
                        // Opposite directions on alternating threads; some
                        // fail with InsufficientFunds, which is fine.
                        let _ = if i % 2 == 0 {
                            ledger.transfer(1, "alice", "bob", 100, &directory)
                        } else {
                            ledger.transfer(2, "bob", "alice", 100, &directory)
                        };
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        let total = ledger.balance(1).unwrap() + ledger.balance(2).unwrap();
        assert_eq!(total, 20_000);
        assert!(ledger.balance(1).unwrap() >= 0);
        assert!(ledger.balance(2).unwrap() >= 0);
    }
}

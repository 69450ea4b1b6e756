//! User registry
//!
//! Owns the username -> account identity mapping and credential hashes.
//! Account ids are assigned monotonically starting at 1 and are never
//! reused or deleted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{AccountId, LedgerError};
use crate::ledger::RecipientDirectory;

use super::password;

/// A registered user.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: AccountId,
    pub username: String,
    pub(crate) password_hash: String,
}

#[derive(Debug)]
struct RegistryInner {
    next_id: AccountId,
    users: HashMap<String, UserRecord>,
}

#[derive(Debug)]
pub struct UserRegistry {
    inner: Mutex<RegistryInner>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_id: 1,
                users: HashMap::new(),
            }),
        }
    }

    fn guard(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new user under the next free account id.
    ///
    /// # Errors
    /// `LedgerError::Conflict` if the username is already taken.
    pub fn register(&self, username: &str, password: &str) -> Result<UserRecord, LedgerError> {
        let mut inner = self.guard();
        if inner.users.contains_key(username) {
            return Err(LedgerError::Conflict(username.to_string()));
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let record = UserRecord {
            id,
            username: username.to_string(),
            password_hash: password::hash(password),
        };
        inner.users.insert(username.to_string(), record.clone());
        Ok(record)
    }

    /// Check credentials; `None` for unknown users or wrong passwords.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<UserRecord> {
        let inner = self.guard();
        let user = inner.users.get(username)?;
        password::verify(&user.password_hash, password).then(|| user.clone())
    }
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipientDirectory for UserRegistry {
    fn resolve(&self, username: &str) -> Option<AccountId> {
        self.guard().users.get(username).map(|user| user.id)
    }
}

//! Session store
//!
//! Random bearer tokens mapped to logged-in users, carried in an HttpOnly
//! cookie. Sessions live only as long as the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::AccountId;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "minibank_session";

const TOKEN_LEN: usize = 32;

/// The authenticated identity a session resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: AccountId,
    pub username: String,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionUser>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, SessionUser>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session and return its token.
    pub fn create(&self, user: SessionUser) -> String {
        let mut bytes = [0u8; TOKEN_LEN];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        self.guard().insert(token.clone(), user);
        token
    }

    pub fn get(&self, token: &str) -> Option<SessionUser> {
        self.guard().get(token).cloned()
    }

    pub fn revoke(&self, token: &str) {
        self.guard().remove(token);
    }
}

//! Shared application state
//!
//! Constructed once at startup and injected into request handlers through
//! axum state. Nothing here survives process shutdown.

use std::sync::Arc;

use crate::auth::{SessionStore, UserRegistry};
use crate::ledger::Ledger;

#[derive(Debug, Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub registry: Arc<UserRegistry>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(Ledger::new()),
            registry: Arc::new(UserRegistry::new()),
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

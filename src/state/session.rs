//! Auth-session data for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Read by route guards and user-aware views; mutated only through
//! `SessionStore`. The access token lives in memory only; `persisted_subset`
//! is the single allow-list deciding what reaches durable storage.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use serde::{Deserialize, Serialize};

use crate::net::types::User;

/// In-memory session state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    /// Short-lived bearer credential. Never persisted.
    pub access_token: Option<String>,
    pub is_authenticated: bool,
    /// True once startup reconciliation has finished. Never persisted.
    pub is_initialized: bool,
}

impl Session {
    /// Persisted "logged in" flag without a token to back it yet.
    #[must_use]
    pub fn is_unverified(&self) -> bool {
        self.is_authenticated && self.access_token.is_none()
    }
}

/// The subset of [`Session`] that survives a reload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
}

/// Storage envelope: `{"state": {...}, "version": N}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEnvelope {
    pub state: PersistedSession,
    #[serde(default)]
    pub version: u32,
}

pub const PERSIST_VERSION: u32 = 0;

/// Allow-list of session fields written to storage.
#[must_use]
pub fn persisted_subset(session: &Session) -> PersistedSession {
    PersistedSession { user: session.user.clone(), is_authenticated: session.is_authenticated }
}

impl From<PersistedSession> for Session {
    fn from(persisted: PersistedSession) -> Self {
        Self {
            user: persisted.user,
            access_token: None,
            is_authenticated: persisted.is_authenticated,
            is_initialized: false,
        }
    }
}

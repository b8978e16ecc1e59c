//! Observable session store with partial persistence.
//!
//! DESIGN
//! ======
//! The store is the single piece of mutable shared state. It wraps a
//! `tokio::sync::watch` sender so views and guards can subscribe to changes,
//! and every mutation goes through a named operation that rewrites the
//! persisted subset (`user`, `is_authenticated`) under [`STORAGE_KEY`].
//! Clones share the same state.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::Arc;

use tokio::sync::watch;

use super::session::{PERSIST_VERSION, PersistedEnvelope, Session, persisted_subset};
use super::storage::{SessionStorage, load_json, save_json};
use crate::net::types::{User, UserPatch};

/// Fixed storage key holding the serialized `{ user, isAuthenticated }` pair.
pub const STORAGE_KEY: &str = "auth-storage";

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Create the store, hydrating the persisted subset from `storage`.
    ///
    /// The hydrated session never carries an access token and always starts
    /// uninitialized.
    #[must_use]
    pub fn hydrate(storage: Arc<dyn SessionStorage>) -> Self {
        let session = load_json::<PersistedEnvelope>(storage.as_ref(), STORAGE_KEY)
            .map(|envelope| Session::from(envelope.state))
            .unwrap_or_default();
        tracing::debug!(
            is_authenticated = session.is_authenticated,
            has_user = session.user.is_some(),
            "session hydrated"
        );
        let (state, _) = watch::channel(session);
        Self { inner: Arc::new(StoreInner { state, storage }) }
    }

    // =========================================================================
    // READS
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.state.borrow().is_initialized
    }

    /// Receiver that observes every subsequent mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Full login: user and token set, authenticated and initialized.
    pub fn set_auth(&self, user: User, access_token: String) {
        self.mutate(|s| {
            s.user = Some(user);
            s.access_token = Some(access_token);
            s.is_authenticated = true;
            s.is_initialized = true;
        });
    }

    pub fn set_user(&self, user: User) {
        self.mutate(|s| s.user = Some(user));
    }

    /// Replace the access token after a silent refresh.
    pub fn set_access_token(&self, access_token: String) {
        self.mutate(|s| s.access_token = Some(access_token));
    }

    /// Full logout. Marks the session initialized so guards stop waiting.
    pub fn clear_auth(&self) {
        self.mutate(|s| {
            s.user = None;
            s.access_token = None;
            s.is_authenticated = false;
            s.is_initialized = true;
        });
    }

    /// Shallow-merge `patch` into the current user. No-op without a user.
    pub fn update_user(&self, patch: UserPatch) {
        self.mutate(|s| {
            if let Some(user) = s.user.as_mut() {
                user.apply(patch);
            }
        });
    }

    /// Owned by startup reconciliation.
    pub fn set_initialized(&self, initialized: bool) {
        self.mutate(|s| s.is_initialized = initialized);
    }

    /// Persisting inside the watch write lock keeps storage writes in the same
    /// order as the mutations.
    fn mutate(&self, f: impl FnOnce(&mut Session)) {
        let storage = self.inner.storage.as_ref();
        self.inner.state.send_modify(|session| {
            f(session);
            let envelope = PersistedEnvelope { state: persisted_subset(session), version: PERSIST_VERSION };
            save_json(storage, STORAGE_KEY, &envelope);
        });
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.state.borrow();
        f.debug_struct("SessionStore")
            .field("is_authenticated", &session.is_authenticated)
            .field("is_initialized", &session.is_initialized)
            .field("has_token", &session.access_token.is_some())
            .finish_non_exhaustive()
    }
}

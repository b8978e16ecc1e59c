//! One-shot session reconciliation at startup.
//!
//! SYSTEM CONTEXT
//! ==============
//! A reload restores `user` and `is_authenticated` from storage but never the
//! access token. Before any guard renders protected content, the persisted
//! "logged in" flag is checked against the backend with a single refresh.
//! There is no retry: one failure means "not authenticated".

#[cfg(test)]
#[path = "startup_test.rs"]
mod startup_test;

use crate::net::client::ApiClient;
use crate::state::session::Session;

/// Verify a hydrated session and mark the store initialized.
///
/// Only an authenticated session without an access token triggers a
/// refresh. Returns the settled session.
pub async fn reconcile_session(client: &ApiClient) -> Session {
    let store = client.store();
    if store.snapshot().is_unverified() {
        match client.refresh_session().await {
            Ok(auth) => {
                tracing::info!(user_id = %auth.user.id, "persisted session verified");
                client.establish_session(auth);
            }
            Err(e) => {
                tracing::info!(status = e.status, error = %e, "persisted session rejected; signing out");
                client.end_session();
            }
        }
    } else {
        tracing::debug!(is_authenticated = store.is_authenticated(), "no session to verify");
    }
    store.set_initialized(true);
    store.snapshot()
}

//! Cookie jar persistence between CLI runs.
//!
//! The refresh credential lives in an HTTP-only cookie. A browser keeps it in
//! its own cookie store; the CLI saves the whole jar as JSON under
//! [`COOKIE_KEY`] so Max-Age, Expires, Secure and Path survive a restart.
//! Expired cookies are dropped on load.

#[cfg(test)]
#[path = "cookies_test.rs"]
mod cookies_test;

use std::sync::PoisonError;

use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;

use super::storage::SessionStorage;

/// Storage key for the saved cookie jar.
pub const COOKIE_KEY: &str = "refresh-cookie";

/// Restore the jar saved by a previous run. Missing or unreadable entries
/// yield an empty jar.
#[must_use]
pub fn load_cookies(storage: &dyn SessionStorage) -> CookieStore {
    let raw = match storage.get_item(COOKIE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return CookieStore::default(),
        Err(e) => {
            tracing::warn!(error = %e, "cookie jar read failed");
            return CookieStore::default();
        }
    };
    cookie_store::serde::json::load(raw.as_bytes()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "discarding malformed cookie jar");
        CookieStore::default()
    })
}

/// Save the jar, session cookies included. An empty jar removes the entry.
pub fn save_cookies(storage: &dyn SessionStorage, cookies: &CookieStoreMutex) {
    let store = cookies.lock().unwrap_or_else(PoisonError::into_inner);
    if store.iter_unexpired().next().is_none() {
        if let Err(e) = storage.remove_item(COOKIE_KEY) {
            tracing::warn!(error = %e, "failed to remove saved cookies");
        }
        return;
    }

    let mut raw = Vec::new();
    if let Err(e) = cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut raw) {
        tracing::warn!(error = %e, "cookie jar serialize failed");
        return;
    }
    drop(store);
    match String::from_utf8(raw) {
        Ok(raw) => {
            if let Err(e) = storage.set_item(COOKIE_KEY, &raw) {
                tracing::warn!(error = %e, "cookie jar write failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "cookie jar is not valid UTF-8; not saved"),
    }
}

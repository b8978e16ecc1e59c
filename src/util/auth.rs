//! Shared route-guard decisions.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected page applies the same gate: render nothing while the
//! startup check is pending, then either render or send the user to login
//! carrying the page they asked for. Auth pages (login, register) apply the
//! inverse gate.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use tokio::sync::watch;

use crate::state::session::Session;
use crate::util::locale::{dashboard_path, login_redirect};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Startup reconciliation has not finished; render a placeholder.
    Pending,
    Render,
    Redirect(String),
}

/// Gate for pages that require a session.
#[must_use]
pub fn protected_route(session: &Session, location: &str) -> GuardDecision {
    if !session.is_initialized {
        return GuardDecision::Pending;
    }
    if session.is_authenticated {
        GuardDecision::Render
    } else {
        GuardDecision::Redirect(login_redirect(location))
    }
}

/// Gate for login/register pages. Authenticated users go to `redirect` when
/// it is a local path, otherwise to the dashboard.
#[must_use]
pub fn guest_route(session: &Session, location: &str, redirect: Option<&str>) -> GuardDecision {
    if !session.is_initialized {
        return GuardDecision::Pending;
    }
    if !session.is_authenticated {
        return GuardDecision::Render;
    }
    let target = redirect
        .filter(|r| is_local_path(r))
        .map_or_else(|| dashboard_path(location), str::to_owned);
    GuardDecision::Redirect(target)
}

/// Only same-origin absolute paths are honored as post-login targets.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains("://")
}

/// Wait until startup reconciliation has completed and return that session.
///
/// Returns the last observed session if the store is dropped first.
pub async fn wait_until_initialized(mut rx: watch::Receiver<Session>) -> Session {
    let ready = rx
        .wait_for(|s| s.is_initialized)
        .await
        .map(|session| session.clone());
    match ready {
        Ok(session) => session,
        Err(_) => rx.borrow().clone(),
    }
}

//! Client-side session and authenticated HTTP layer for the translation
//! web app.
//!
//! SYSTEM CONTEXT
//! ==============
//! `net::client::ApiClient` is the only way to reach the backend. It reads
//! and updates a shared `state::store::SessionStore`, which persists the
//! non-secret part of the session. `startup::reconcile_session` runs once per
//! load to verify a persisted login before guards in `util::auth` let
//! protected pages render.

pub mod config;
pub mod error;
pub mod net;
pub mod startup;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::ClientConfig;
pub use error::ApiError;
pub use net::client::ApiClient;
pub use state::store::SessionStore;

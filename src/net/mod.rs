//! Backend access: the authenticated client and thin endpoint wrappers.
//!
//! ARCHITECTURE
//! ============
//! `client` owns transport, 401 handling and replay; `refresh` owns the
//! single-flight coordination it uses. The endpoint modules (`auth`,
//! `account`, `jobs`, `billing`) are free functions over `&ApiClient` so
//! they stay free of session logic apart from login/logout.

pub mod account;
pub mod auth;
pub mod billing;
pub mod client;
pub mod jobs;
pub mod query;
mod refresh;
pub mod types;

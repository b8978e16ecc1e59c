//! Route helpers shared by the client and page guards.

pub mod auth;
pub mod locale;
pub mod navigation;

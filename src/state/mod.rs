//! Session state: the in-memory model, its persisted subset, and the
//! observable store that ties them together.

pub mod cookies;
pub mod session;
pub mod storage;
pub mod store;

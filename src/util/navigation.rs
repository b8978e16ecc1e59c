//! Navigation context seen by the HTTP client and route guards.
//!
//! SYSTEM CONTEXT
//! ==============
//! In a browser the client reads the current location for the locale header
//! and performs a hard redirect to the login page when a silent refresh
//! fails. Headless callers (CLI, background jobs) have no location, so they
//! get the default locale and never navigate.

#[cfg(test)]
#[path = "navigation_test.rs"]
mod navigation_test;

use std::sync::Mutex;

pub trait Navigator: Send + Sync {
    /// Current location (path plus query), or `None` outside a browser context.
    fn current_location(&self) -> Option<String>;

    /// Replace the current location.
    fn navigate(&self, location: &str);
}

/// No navigation context.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Navigator for Headless {
    fn current_location(&self) -> Option<String> {
        None
    }

    fn navigate(&self, location: &str) {
        tracing::debug!(location, "navigation ignored without a browser context");
    }
}

/// In-memory location with a history of every navigation.
#[derive(Debug)]
pub struct MemoryNavigator {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    location: String,
    history: Vec<String>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self { inner: Mutex::new(MemoryInner { location: location.into(), history: Vec::new() }) }
    }

    /// Locations navigated to, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Navigator for MemoryNavigator {
    fn current_location(&self) -> Option<String> {
        Some(self.lock().location.clone())
    }

    fn navigate(&self, location: &str) {
        let mut inner = self.lock();
        inner.location = location.to_owned();
        inner.history.push(location.to_owned());
    }
}

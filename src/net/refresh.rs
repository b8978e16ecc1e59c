//! Single-flight coordination of access-token refreshes.
//!
//! DESIGN
//! ======
//! The first request that needs a refresh starts a flight: a boxed future
//! made `Shared` so every later caller awaits the same outcome instead of
//! issuing its own `/auth/refresh`. The flight settles under the mutex: it
//! applies its session side effects, clears its own slot and records the
//! outcome before any waiter resumes, so the next expiry event starts a fresh
//! flight.
//!
//! Flights triggered by an expired token remember which token that was. A
//! straggler whose 401 for the same token arrives after the flight settled
//! reuses that outcome rather than refreshing a second time.
//!
//! Every login or logout bumps the session epoch. A flight that settles in a
//! later epoch applies nothing and reports the session as ended, so a refresh
//! racing a logout can never put a token back into a cleared session.
//!
//! The mutex is only held for slot bookkeeping and the synchronous settle
//! step, never across an await.

#[cfg(test)]
#[path = "refresh_test.rs"]
mod refresh_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use super::types::AuthResponse;
use crate::error::ApiError;

pub(crate) type RefreshOutcome = Result<AuthResponse, ApiError>;

type Flight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// What caused a refresh request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Trigger<'a> {
    /// A protected request got 401 while sent with this token.
    Expired(Option<&'a str>),
    /// A caller asked for a refresh directly (startup reconciliation).
    Explicit,
}

#[derive(Clone, Default)]
pub(crate) struct RefreshCoordinator {
    state: Arc<Mutex<FlightState>>,
}

#[derive(Default)]
struct FlightState {
    inflight: Option<Flight>,
    /// Set when an expired-token caller started or joined the current flight.
    redirect_owed: bool,
    /// Bumped whenever a session begins or ends.
    epoch: u64,
    /// Expired token that triggered the last settled flight, with its outcome.
    settled: Option<(Option<String>, RefreshOutcome)>,
}

impl RefreshCoordinator {
    /// Join the in-flight refresh, reuse the outcome for an already-handled
    /// expiry, or start a new flight from `start`.
    ///
    /// `settle` applies the session side effects of a new flight. It runs
    /// once, under the coordinator lock, and only if the flight settles in the
    /// epoch it started in. Its flag is true when a failed protected request
    /// started or joined the flight, which owes the user a login redirect.
    pub(crate) async fn run<F, S>(&self, trigger: Trigger<'_>, start: F, settle: S) -> RefreshOutcome
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
        S: FnOnce(&RefreshOutcome, bool) + Send + 'static,
    {
        let expired = matches!(trigger, Trigger::Expired(_));
        let flight = {
            let mut state = lock(&self.state);
            if let Some(flight) = &state.inflight {
                tracing::debug!("joining in-flight token refresh");
                let flight = flight.clone();
                state.redirect_owed |= expired;
                flight
            } else {
                if let Trigger::Expired(token) = trigger {
                    if let Some((prev, outcome)) = &state.settled {
                        if prev.as_deref() == token {
                            tracing::debug!("reusing settled refresh for the same expired token");
                            return outcome.clone();
                        }
                    }
                }
                let flight = self.launch(trigger, state.epoch, start(), settle);
                state.inflight = Some(flight.clone());
                state.redirect_owed = expired;
                flight
            }
        };
        flight.await
    }

    /// Start a new session epoch: forget the in-flight and settled refreshes.
    /// Called whenever a session begins or ends.
    pub(crate) fn reset(&self) {
        let mut state = lock(&self.state);
        state.epoch = state.epoch.wrapping_add(1);
        state.inflight = None;
        state.redirect_owed = false;
        state.settled = None;
    }

    #[cfg(test)]
    pub(crate) fn is_refreshing(&self) -> bool {
        lock(&self.state).inflight.is_some()
    }

    fn launch<S>(
        &self,
        trigger: Trigger<'_>,
        epoch: u64,
        refresh: BoxFuture<'static, RefreshOutcome>,
        settle: S,
    ) -> Flight
    where
        S: FnOnce(&RefreshOutcome, bool) + Send + 'static,
    {
        let record = Arc::clone(&self.state);
        let expired = match trigger {
            Trigger::Expired(token) => Some(token.map(str::to_owned)),
            Trigger::Explicit => None,
        };
        async move {
            let outcome = refresh.await;
            let mut state = lock(&record);
            if state.epoch != epoch {
                tracing::info!("session changed during token refresh; discarding result");
                return Err(ApiError::session_ended());
            }
            settle(&outcome, state.redirect_owed);
            state.inflight = None;
            state.redirect_owed = false;
            state.settled = expired.map(|token| (token, outcome.clone()));
            outcome
        }
        .boxed()
        .shared()
    }
}

fn lock(state: &Mutex<FlightState>) -> MutexGuard<'_, FlightState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

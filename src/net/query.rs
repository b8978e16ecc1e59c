//! Retry policy for data-fetching callers.
//!
//! `ApiClient` never retries on its own beyond the single refresh-and-replay.
//! Views that poll or load data wrap their fetch in [`fetch_with_retry`],
//! which retries transient failures with capped exponential backoff and
//! gives up immediately on auth and not-found errors.

#[cfg(test)]
#[path = "query_test.rs"]
mod query_test;

use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

/// Retry budget and backoff bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failures tolerated before the error is surfaced.
    pub max_failures: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_failures: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(30) }
    }
}

impl RetryPolicy {
    /// Whether to run the fetch again after `error`, given `failure_count`
    /// earlier failures.
    #[must_use]
    pub fn should_retry(&self, failure_count: u32, error: &ApiError) -> bool {
        if matches!(error.status, 401 | 403 | 404) {
            return false;
        }
        failure_count < self.max_failures
    }

    /// Backoff before retry number `attempt` (0-based): `base * 2^attempt`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Run `fetch` until it succeeds or `policy` says to stop.
///
/// # Errors
///
/// Returns the last error once retries are exhausted or the error is not
/// retryable.
pub async fn fetch_with_retry<T, F, Fut>(policy: &RetryPolicy, mut fetch: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut failures = 0;
    loop {
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(e) if policy.should_retry(failures, &e) => {
                let delay = policy.retry_delay(failures);
                failures += 1;
                tracing::warn!(
                    status = e.status,
                    error = %e,
                    attempt = failures,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "fetch failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

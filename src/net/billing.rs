//! Subscription and invoice lookups.

#[cfg(test)]
#[path = "billing_test.rs"]
mod billing_test;

use super::client::ApiClient;
use super::types::{Invoice, Subscription};
use crate::error::ApiError;

/// # Errors
///
/// Returns the normalized backend error.
pub async fn subscription(client: &ApiClient) -> Result<Subscription, ApiError> {
    client.get("/billing/subscription").await
}

/// # Errors
///
/// Returns the normalized backend error.
pub async fn invoices(client: &ApiClient) -> Result<Vec<Invoice>, ApiError> {
    client.get("/billing/invoices").await
}

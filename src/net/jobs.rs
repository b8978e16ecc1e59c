//! Dashboard statistics and translation job management.

#[cfg(test)]
#[path = "jobs_test.rs"]
mod jobs_test;

use reqwest::Method;

use super::client::{ApiClient, ApiRequest};
use super::types::{DashboardStats, Job, JobQuery, Page};
use crate::error::ApiError;

/// # Errors
///
/// Returns the normalized backend error.
pub async fn dashboard_stats(client: &ApiClient) -> Result<DashboardStats, ApiError> {
    client.get("/dashboard/stats").await
}

/// # Errors
///
/// Returns the normalized backend error.
pub async fn list_jobs(client: &ApiClient, query: &JobQuery) -> Result<Page<Job>, ApiError> {
    client
        .send(ApiRequest::new(Method::GET, "/jobs").with_query(query.to_query()))
        .await
}

/// # Errors
///
/// Returns a `NotFound` error for unknown ids.
pub async fn get_job(client: &ApiClient, id: &str) -> Result<Job, ApiError> {
    client.get(&job_path(id)).await
}

/// Cancel a pending or running job and return its updated state.
///
/// # Errors
///
/// Returns the normalized backend error.
pub async fn cancel_job(client: &ApiClient, id: &str) -> Result<Job, ApiError> {
    client
        .send(ApiRequest::new(Method::POST, format!("{}/cancel", job_path(id))))
        .await
}

/// # Errors
///
/// Returns the normalized backend error.
pub async fn delete_job(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client.delete(&job_path(id)).await
}

fn job_path(id: &str) -> String {
    let encoded: String = reqwest::Url::parse("http://localhost/")
        .ok()
        .and_then(|mut url| {
            url.path_segments_mut().ok()?.push(id);
            Some(url.path().trim_start_matches('/').to_owned())
        })
        .unwrap_or_else(|| id.to_owned());
    format!("/jobs/{encoded}")
}

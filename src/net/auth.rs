//! Auth endpoints: login, logout, registration and account recovery.
//!
//! Login and logout are the only calls here that touch the session store.
//! Everything else is a plain request whose failures surface as `ApiError`
//! for form rendering.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use reqwest::Method;
use serde_json::json;

use super::client::{ApiClient, ApiRequest, LOGIN_PATH, LOGOUT_PATH};
use super::types::{
    AuthResponse, LoginRequest, MessageResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest, User,
};
use crate::error::ApiError;

/// Log in and adopt the returned session.
///
/// # Errors
///
/// Returns the backend rejection (401 for bad credentials) without touching
/// any existing session.
pub async fn login(client: &ApiClient, request: &LoginRequest) -> Result<User, ApiError> {
    let auth: AuthResponse = client.post(LOGIN_PATH, request).await?;
    let user = auth.user.clone();
    client.establish_session(auth);
    tracing::info!(user_id = %user.id, "logged in");
    Ok(user)
}

/// End the session. The local session is cleared even when the backend
/// call fails.
pub async fn logout(client: &ApiClient) {
    let outcome = client
        .send::<serde_json::Value>(ApiRequest::new(Method::POST, LOGOUT_PATH))
        .await;
    if let Err(e) = outcome {
        tracing::warn!(status = e.status, error = %e, "logout request failed");
    }
    client.end_session();
    tracing::info!("logged out");
}

/// # Errors
///
/// Returns validation errors (e.g. email already registered) as `ApiError`.
pub async fn register(client: &ApiClient, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
    client.post("/auth/register", request).await
}

/// # Errors
///
/// Returns the normalized backend error.
pub async fn forgot_password(client: &ApiClient, email: &str) -> Result<MessageResponse, ApiError> {
    client.post("/auth/forgot-password", &json!({ "email": email })).await
}

/// # Errors
///
/// Returns the normalized backend error; an expired link carries code
/// `token_expired`.
pub async fn reset_password(client: &ApiClient, request: &ResetPasswordRequest) -> Result<MessageResponse, ApiError> {
    client.post("/auth/reset-password", request).await
}

/// # Errors
///
/// Returns the normalized backend error.
pub async fn verify_email(client: &ApiClient, token: &str) -> Result<MessageResponse, ApiError> {
    client.post("/auth/verify-email", &json!({ "token": token })).await
}

/// # Errors
///
/// Returns the normalized backend error.
pub async fn resend_verification(client: &ApiClient, email: &str) -> Result<MessageResponse, ApiError> {
    client
        .post("/auth/resend-verification", &json!({ "email": email }))
        .await
}

/// Fetch the current user and store it.
///
/// # Errors
///
/// Returns the normalized backend error.
pub async fn me(client: &ApiClient) -> Result<User, ApiError> {
    let user: User = client.get("/auth/me").await?;
    client.store().set_user(user.clone());
    Ok(user)
}

//! Profile and password management for the signed-in user.

#[cfg(test)]
#[path = "account_test.rs"]
mod account_test;

use super::client::ApiClient;
use super::types::{ChangePasswordRequest, MessageResponse, User, UserPatch};
use crate::error::ApiError;

/// Apply `patch` on the backend and store the user it returns.
///
/// # Errors
///
/// Returns the normalized backend error; the stored user is left unchanged.
pub async fn update_profile(client: &ApiClient, patch: &UserPatch) -> Result<User, ApiError> {
    let user: User = client.patch("/users/me", patch).await?;
    client.store().set_user(user.clone());
    tracing::info!(user_id = %user.id, "profile updated");
    Ok(user)
}

/// # Errors
///
/// Returns validation errors keyed by `currentPassword` or `newPassword`.
pub async fn change_password(client: &ApiClient, request: &ChangePasswordRequest) -> Result<MessageResponse, ApiError> {
    client.post("/users/me/password", request).await
}

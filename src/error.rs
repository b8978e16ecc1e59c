//! Normalized API error shared by every backend call.
//!
//! DESIGN
//! ======
//! Callers only ever see `ApiError`: a message, a numeric status, an optional
//! machine code, and optional field-level validation errors. Transport
//! failures (`reqwest::Error`) are flattened into the same shape with status 0
//! so forms and banners can render any failure without matching on transport
//! types. `ApiError` is `Clone` because a single refresh failure is handed to
//! every request that was waiting on it.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde::{Deserialize, Serialize};

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
pub const SERVER_ERROR_MESSAGE: &str = "Something went wrong. Please try again later.";
pub const DECODE_ERROR_MESSAGE: &str = "Unexpected response from server.";
pub const SESSION_ENDED_MESSAGE: &str = "Your session has ended. Please sign in again.";

// =============================================================================
// FIELD ERRORS
// =============================================================================

/// A single per-field validation message, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

// =============================================================================
// ERROR KIND
// =============================================================================

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call did not complete (connect failure, timeout, dropped body).
    Transport,
    /// 401 from the backend.
    Unauthorized,
    /// 403 from the backend.
    Forbidden,
    /// 404 from the backend.
    NotFound,
    /// 4xx carrying field errors, or 422.
    Validation,
    /// Any other 4xx.
    Client,
    /// 5xx.
    Server,
    /// 2xx whose body did not match the expected type.
    Decode,
}

// =============================================================================
// API ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    /// HTTP status, or 0 when the request never produced a response.
    pub status: u16,
    pub code: Option<String>,
    pub errors: Option<Vec<FieldError>>,
}

/// Error body shape accepted from the backend. Every field is optional; the
/// message may arrive under `message`, `error`, or `detail`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    detail: Option<String>,
    code: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ApiError {
    /// Build an error from a non-success HTTP response body.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.error)
            .or(parsed.detail)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback_message(status));
        let errors = parsed.errors.filter(|e| !e.is_empty());
        Self { message, status, code: parsed.code, errors }
    }

    /// Flatten a transport failure. Timeouts get their own message.
    #[must_use]
    pub fn transport(err: &reqwest::Error) -> Self {
        let (message, code) = if err.is_timeout() {
            (TIMEOUT_MESSAGE, "timeout")
        } else {
            (NETWORK_ERROR_MESSAGE, "network_error")
        };
        tracing::debug!(error = %err, "transport failure");
        Self { message: message.to_owned(), status: 0, code: Some(code.to_owned()), errors: None }
    }

    /// A 2xx response whose body could not be deserialized.
    #[must_use]
    pub fn decode(status: u16, err: &serde_json::Error) -> Self {
        tracing::debug!(status, error = %err, "response decode failed");
        Self {
            message: DECODE_ERROR_MESSAGE.to_owned(),
            status,
            code: Some("decode_error".to_owned()),
            errors: None,
        }
    }

    /// The session was ended or replaced while a token refresh was in flight.
    #[must_use]
    pub fn session_ended() -> Self {
        Self {
            message: SESSION_ENDED_MESSAGE.to_owned(),
            status: 401,
            code: Some("session_ended".to_owned()),
            errors: None,
        }
    }

    /// A request body that could not be serialized.
    #[must_use]
    pub fn encode(err: &serde_json::Error) -> Self {
        Self {
            message: format!("Request could not be encoded: {err}"),
            status: 0,
            code: Some("encode_error".to_owned()),
            errors: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        if self.code.as_deref() == Some("decode_error") {
            return ErrorKind::Decode;
        }
        match self.status {
            0 => ErrorKind::Transport,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            422 => ErrorKind::Validation,
            400..=499 if self.errors.is_some() => ErrorKind::Validation,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Client,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Message for a single form field, if the backend reported one.
    #[must_use]
    pub fn field_message(&self, field: &str) -> Option<&str> {
        self.errors
            .as_deref()?
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

fn fallback_message(status: u16) -> String {
    if (500..=599).contains(&status) {
        SERVER_ERROR_MESSAGE.to_owned()
    } else {
        format!("Request failed with status {status}")
    }
}

//! Error taxonomy for backend and Bitrix24 calls.
//!
//! Validation happens before any network call and never reaches this type.
//! Everything the pipeline or a client surfaces to a caller is an [`ApiError`].

use thiserror::Error;

/// Failure of an API call, as seen by the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP status with the backend-provided message if present.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Token refresh failed; the credential store has been cleared.
    ///
    /// Wraps an authorization failure (401) on the original request, so the
    /// caller still observes the original failure class.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// Network/transport-level failure (connect, TLS, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered 2xx but the body was not what we expected.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The credential store could not be read or written.
    #[error("credential store: {0}")]
    Store(String),
}

impl ApiError {
    /// Builds a status error from a response body, extracting the
    /// backend-provided message when one exists.
    ///
    /// Django-style bodies use `message`, `error` or `detail`; Bitrix24 uses
    /// `error_description`. An unrecognized body yields an empty message that
    /// callers fill in with [`ApiError::or_generic`].
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_default();
        ApiError::Status { status, message }
    }

    /// Replaces an empty status message with a stage-specific generic one.
    #[must_use]
    pub fn or_generic(self, fallback: &str) -> Self {
        match self {
            ApiError::Status { status, message } if message.is_empty() => ApiError::Status {
                status,
                message: fallback.to_string(),
            },
            other => other,
        }
    }

    /// Returns the HTTP status when this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(401),
            _ => None,
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["message", "error_description", "error", "detail"] {
        if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

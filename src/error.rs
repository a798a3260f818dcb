//! Error taxonomy for API calls and session handling.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is local to the action that triggered it. Callers convert
//! an [`ApiError`] into a notification with [`ApiError::user_message`];
//! nothing here is fatal to the process.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

/// Longest slice of a raw response body shown to a user.
const MAX_BODY_CHARS: usize = 500;

const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Statuses that trigger a refresh-and-retry: unauthorized, forbidden, and
/// the non-standard "session expired" status some frameworks use.
pub const AUTH_FAILURE_STATUSES: [u16; 3] = [401, 403, 419];

/// Returns true when `status` signals a stale or rejected session.
#[must_use]
pub fn is_auth_failure(status: u16) -> bool {
    AUTH_FAILURE_STATUSES.contains(&status)
}

/// Errors produced by the MissionLink client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure: no HTTP response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// Authorization still failing after one refresh-and-retry.
    #[error("session expired ({status})")]
    SessionExpired { status: u16, body: String },

    /// Any other non-2xx response.
    #[error("{status} {status_text}")]
    Http { status: u16, status_text: String, body: String },

    /// The response body did not match the expected shape.
    #[error("invalid response payload: {0}")]
    Decode(String),

    /// Durable session storage could not be read or written.
    #[error("session storage failed: {0}")]
    Storage(String),

    /// Client-side validation rejected the input before any request was sent.
    #[error("{0}")]
    Invalid(String),

    /// An authenticated-only flow ran without a session.
    #[error("not signed in")]
    NotAuthenticated,
}

impl ApiError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors that should surface as "please sign in again".
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. } | Self::NotAuthenticated)
    }

    /// Render the notification text shown to a user.
    ///
    /// HTTP failures prefer the server's structured message, then the raw
    /// body text, then a generic status line. An expired session appends the
    /// server's reason when the body carries one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Network/CORS error. Check your connection, the API base URL, and the server's CORS policy.".to_owned()
            }
            Self::SessionExpired { body, .. } => match server_message(body) {
                Some(reason) => format!("{SESSION_EXPIRED_MESSAGE} ({reason})"),
                None => SESSION_EXPIRED_MESSAGE.to_owned(),
            },
            Self::NotAuthenticated => SESSION_EXPIRED_MESSAGE.to_owned(),
            Self::Http { status, status_text, body } => server_message(body)
                .or_else(|| raw_body_excerpt(body))
                .unwrap_or_else(|| status_line(*status, status_text)),
            Self::Decode(detail) => format!("Unexpected response from server: {detail}"),
            Self::Storage(detail) => format!("Could not save your session locally: {detail}"),
            Self::Invalid(message) => message.clone(),
        }
    }
}

/// Pull a human-readable message out of a structured error body.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    ["error", "message", "msg", "detail"]
        .iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_owned)
}

fn raw_body_excerpt(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_BODY_CHARS).collect())
}

fn status_line(status: u16, status_text: &str) -> String {
    if status_text.is_empty() {
        format!("Request failed with status {status}")
    } else {
        format!("{status} {status_text}")
    }
}

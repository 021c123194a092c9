//! Error types for the Slack client.

use thiserror::Error;

/// Slack API error codes that cannot succeed on retry.
const FATAL_API_ERRORS: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
    "invalid_app_id",
];

/// Errors that can occur talking to Slack.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack returned `ok: false` with an error code.
    #[error("Slack API error: {0}")]
    Api(String),

    /// WebSocket-level failure on the Socket Mode connection.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Response missing an expected field.
    #[error("malformed Slack response: {0}")]
    Malformed(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SlackError {
    /// Whether this failure is an authorization/configuration error that
    /// retrying can never fix.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Api(code) => FATAL_API_ERRORS.contains(&code.as_str()),
            _ => false,
        }
    }
}

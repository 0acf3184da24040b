//! Error types for Discord REST calls.

use thiserror::Error;

/// Errors that can occur during Discord operations.
#[derive(Error, Debug)]
pub enum DiscordError {
    /// Token rejected (401) or missing.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Discord answered with a non-success status.
    #[error("Discord API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the raw body.
        message: String,
    },

    /// Too many requests.
    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: f64,
    },

    /// Network/HTTP transport error.
    #[error("Network error: {0}")]
    Network(String),

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(String),

    /// The HTTP client could not be constructed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DiscordError {
    /// Whether the failure is about credentials rather than this one request.
    pub fn is_auth(&self) -> bool {
        matches!(self, DiscordError::Auth(_))
    }
}

impl From<reqwest::Error> for DiscordError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DiscordError::Timeout(err.to_string())
        } else if err.is_connect() {
            DiscordError::Network(format!("Connection failed: {err}"))
        } else {
            DiscordError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DiscordError {
    fn from(err: serde_json::Error) -> Self {
        DiscordError::Json(err.to_string())
    }
}

/// Result type for Discord operations.
pub type DiscordResult<T> = std::result::Result<T, DiscordError>;

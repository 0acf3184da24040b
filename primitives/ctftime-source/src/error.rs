//! Error types for CTFtime API calls.

use thiserror::Error;

/// Errors that can occur while talking to the CTFtime API.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure (connect, TLS, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the client timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The API answered with a non-success status.
    #[error("CTFtime API returned status {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The payload was not the JSON shape we expect.
    #[error("Malformed payload: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("Client setup failed: {0}")]
    Client(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_connect() {
            SourceError::Network(format!("Connection failed: {err}"))
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}

/// Result type for CTFtime operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

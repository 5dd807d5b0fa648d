//! BMM client errors

use thiserror::Error;

/// Errors that can occur when interacting with the BMM API
#[derive(Debug, Error)]
pub enum BmmError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// BMM API returned an error
    #[error("BMM API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid or expired token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., malformed endpoint)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl BmmError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BmmError::NotFound(_))
    }
}

//! Error types for the provider document and provider ID codecs

use thiserror::Error;

/// Errors raised while reading or writing provider data on a Machine document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A required path is absent from the document
    #[error("Missing field {0} in Machine document")]
    MissingField(String),

    /// The subtree exists but does not match the expected shape
    #[error("Invalid {path}: {source}")]
    Invalid {
        /// Document path that failed to decode
        path: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// The document root is not a JSON object
    #[error("Machine document is not an object")]
    NotAnObject,
}

/// Errors raised while decoding a provider ID string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderIdError {
    /// Missing the `nvidia-bmm://` prefix
    #[error("invalid provider ID prefix, expected {expected:?}: {value}")]
    MalformedIdentifier {
        /// Required prefix
        expected: &'static str,
        /// Rejected input
        value: String,
    },

    /// Neither three nor four path segments
    #[error("invalid provider ID format, expected 3 or 4 segments: {0}")]
    InvalidSegmentCount(String),

    /// Last segment is not a UUID
    #[error("invalid instance ID {value:?}: {reason}")]
    InvalidInstanceId {
        /// Rejected segment
        value: String,
        /// UUID parser message
        reason: String,
    },
}

//! Domain error types.

use thiserror::Error;

/// Errors raised when a request or event payload fails validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required string field was missing or blank.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// A numeric field that must be positive was zero or negative.
    #[error("Invalid {field}: {value} (must be greater than 0)")]
    NonPositive { field: &'static str, value: i64 },

    /// The caller asked for a status that is not a terminal payment status.
    #[error("Invalid status: '{status}' is not a terminal payment status")]
    ReservedStatus { status: String },

    /// A payload could not be decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Result type for validation.
pub type Result<T> = std::result::Result<T, ValidationError>;

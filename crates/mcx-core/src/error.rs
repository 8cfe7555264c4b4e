//! Error types for the mcx-core crate.

use thiserror::Error;

/// Errors that can occur while validating core inputs.
#[derive(Debug, Error)]
pub enum CoreError {
    /// MC number does not match the expected format.
    #[error("invalid MC number: {0}")]
    InvalidMcNumber(String),

    /// DOT number does not match the expected format.
    #[error("invalid DOT number: {0}")]
    InvalidDotNumber(String),

    /// Identifier string is not a valid UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

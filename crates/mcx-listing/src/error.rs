//! Error types for the mcx-listing crate.

use thiserror::Error;

/// Errors that can occur during listing operations.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Requested transition is not valid from the current state.
    #[error("invalid listing transition: {from} -> {to}")]
    InvalidTransition {
        /// The current status.
        from: String,
        /// The attempted target status.
        to: String,
    },

    /// Rejection requires a non-empty reason surfaced to the seller.
    #[error("rejection requires a reason")]
    MissingRejectionReason,

    /// Asking price must be non-zero.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// A draft field failed format validation.
    #[error("invalid listing field: {0}")]
    InvalidField(#[from] mcx_core::CoreError),
}

/// Result type for listing operations.
pub type Result<T> = std::result::Result<T, ListingError>;

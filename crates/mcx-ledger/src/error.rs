//! Error types for the mcx-ledger crate.

use thiserror::Error;

/// Errors that can occur in ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Not enough credits for the requested debit.
    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits {
        /// Credits required for the operation.
        required: i64,
        /// Credits currently available.
        available: i64,
    },

    /// Ledger entries must move a non-zero amount.
    #[error("entry amount must be non-zero")]
    ZeroAmount,

    /// The entry kind does not allow the given sign.
    #[error("{kind} entries must be {expected}")]
    WrongEntrySign {
        /// The entry kind.
        kind: String,
        /// The sign the kind requires.
        expected: &'static str,
    },
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

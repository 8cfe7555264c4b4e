//! Error types for the mcx-offer crate.

use thiserror::Error;

/// Errors that can occur during offer operations.
#[derive(Debug, Error)]
pub enum OfferError {
    /// Requested transition is not valid from the current state.
    #[error("invalid offer transition: {from} -> {to}")]
    InvalidTransition {
        /// The current status.
        from: String,
        /// The attempted target status.
        to: String,
    },

    /// The offer has passed its expiry deadline.
    #[error("offer expired")]
    Expired,

    /// Buy-Now offers skip the counter path entirely.
    #[error("buy-now offers are not negotiable")]
    NotNegotiable,

    /// A Buy-Now offer can only be accepted by admin approval.
    #[error("buy-now offers require admin approval")]
    BuyNowRequiresAdmin,

    /// Admin approval applies to Buy-Now offers only.
    #[error("only buy-now offers go through admin approval")]
    NotBuyNow,

    /// Offer and counter amounts must be non-zero.
    #[error("amount must be non-zero")]
    ZeroAmount,

    /// A countered offer is missing its counter amount.
    #[error("countered offer has no counter amount")]
    CounterAmountMissing,
}

/// Result type for offer operations.
pub type Result<T> = std::result::Result<T, OfferError>;

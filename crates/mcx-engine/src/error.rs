//! Unified error type and failure taxonomy for engine operations.

use thiserror::Error;

use mcx_core::{ActorRole, ListingId, OfferId, RoomId};
use mcx_ledger::LedgerError;
use mcx_listing::ListingError;
use mcx_offer::OfferError;
use mcx_room::RoomError;

/// The caller-facing failure taxonomy.
///
/// Every engine failure falls into exactly one category, so callers can
/// decide mechanically whether to fix their input, refetch state, or stop
/// retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any state read. Recoverable.
    Validation,
    /// The requested transition is invalid from the current state
    /// (including reservation races). Refetch and retry deliberately.
    StateConflict,
    /// Unknown identifier.
    NotFound,
    /// The acting role is not permitted this operation.
    Authorization,
    /// The buyer's credit balance cannot cover the operation.
    ResourceExhausted,
}

/// Errors returned by marketplace operations.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Malformed request input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Listing was not found.
    #[error("listing not found: {0}")]
    ListingNotFound(ListingId),

    /// Offer was not found.
    #[error("offer not found: {0}")]
    OfferNotFound(OfferId),

    /// Transaction room was not found.
    #[error("transaction room not found: {0}")]
    RoomNotFound(RoomId),

    /// The listing is not open for this operation (reserved, sold, ...).
    #[error("listing {listing_id} is not active (status: {status})")]
    ListingNotActive {
        /// The listing.
        listing_id: ListingId,
        /// Its current status.
        status: String,
    },

    /// The buyer already has an open offer on this listing.
    #[error("buyer {buyer_id} already has an open offer on listing {listing_id}")]
    DuplicateOpenOffer {
        /// The listing.
        listing_id: ListingId,
        /// The buyer.
        buyer_id: mcx_core::BuyerId,
    },

    /// Premium listings are not credit-unlockable; a contact request was
    /// recorded and the caller should redirect to the contact flow.
    #[error("listing {0} is premium; credit unlock is not eligible")]
    PremiumNotEligible(ListingId),

    /// The acting role may not perform this operation.
    #[error("role {role} may not {operation}")]
    Unauthorized {
        /// The acting role.
        role: ActorRole,
        /// The operation attempted.
        operation: String,
    },

    /// A listing state machine rejection.
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// An offer state machine rejection.
    #[error(transparent)]
    Offer(#[from] OfferError),

    /// A transaction room rejection.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A credit ledger rejection.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl MarketError {
    /// Classify this failure per the caller-facing taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::PremiumNotEligible(_) => ErrorKind::Validation,
            Self::ListingNotFound(_) | Self::OfferNotFound(_) | Self::RoomNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::ListingNotActive { .. } | Self::DuplicateOpenOffer { .. } => {
                ErrorKind::StateConflict
            }
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::Listing(e) => match e {
                ListingError::InvalidTransition { .. } => ErrorKind::StateConflict,
                ListingError::MissingRejectionReason
                | ListingError::InvalidPrice(_)
                | ListingError::InvalidField(_) => ErrorKind::Validation,
            },
            Self::Offer(e) => match e {
                OfferError::ZeroAmount => ErrorKind::Validation,
                _ => ErrorKind::StateConflict,
            },
            Self::Room(e) => match e {
                RoomError::UnauthorizedActor { .. } => ErrorKind::Authorization,
                _ => ErrorKind::StateConflict,
            },
            Self::Ledger(e) => match e {
                LedgerError::InsufficientCredits { .. } => ErrorKind::ResourceExhausted,
                _ => ErrorKind::Validation,
            },
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_kinds() {
        assert_eq!(
            MarketError::ListingNotFound(ListingId::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MarketError::RoomNotFound(RoomId::new()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_conflict_kinds() {
        let err = MarketError::ListingNotActive {
            listing_id: ListingId::new(),
            status: "reserved".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::StateConflict);

        let err: MarketError = OfferError::Expired.into();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn test_authorization_kinds() {
        let err: MarketError = RoomError::UnauthorizedActor {
            role: ActorRole::Buyer,
            action: "complete".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_resource_exhausted_kind() {
        let err: MarketError = LedgerError::InsufficientCredits {
            required: 1,
            available: 0,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn test_validation_kinds() {
        assert_eq!(
            MarketError::Validation("bad input".to_string()).kind(),
            ErrorKind::Validation
        );
        let err: MarketError = ListingError::MissingRejectionReason.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

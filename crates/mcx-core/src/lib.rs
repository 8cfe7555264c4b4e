//! # mcx-core
//!
//! Shared building blocks for the MCX motor-carrier-authority marketplace:
//!
//! - **Identifiers**: UUID newtypes for buyers, sellers, listings, offers,
//!   and transaction rooms
//! - **Actor roles**: the three parties every operation is authorized
//!   against (buyer, seller, admin)
//! - **Trust scoring**: the single authoritative score-to-tier mapping
//! - **Validation**: MC/DOT number format checks and masking helpers
//!
//! Every other MCX crate depends on this one; it depends on nothing
//! domain-specific itself.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod actor;
mod error;
mod id;
mod trust;
mod validate;

pub use actor::ActorRole;
pub use error::{CoreError, Result};
pub use id::{BuyerId, ListingId, OfferId, RoomId, SellerId};
pub use trust::{TrustTier, HIGH_TRUST_MIN, MEDIUM_TRUST_MIN};
pub use validate::{
    mask_dot_number, mask_mc_number, validate_dot_number, validate_mc_number,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # mcx-listing
//!
//! The listing entity for the MCX marketplace: one sellable motor-carrier
//! authority, anchored by a lifecycle state machine:
//!
//! ```text
//! draft -> pending_verification -> active -> reserved -> sold
//!                  |                  |          |
//!                  v                  v          v
//!              suspended          suspended    active (room cancelled)
//! ```
//!
//! Offers and transaction rooms reference listings but never advance this
//! state machine directly; the engine crate coordinates the cross-entity
//! side effects.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod listing;

pub use error::{ListingError, Result};
pub use listing::{Listing, ListingCard, ListingDraft, ListingStatus, Visibility};

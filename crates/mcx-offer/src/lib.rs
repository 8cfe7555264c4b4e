//! # mcx-offer
//!
//! The offer entity for the MCX marketplace: a single buyer's priced
//! proposal against one listing, with counter-negotiation, a Buy-Now
//! variant, and lazy expiry.
//!
//! ```text
//! pending -> countered -> countered (re-counter)
//!    |           |
//!    +-----------+--> accepted | rejected | expired | withdrawn
//! ```
//!
//! Expiry is never scheduled: every read or write first checks wall-clock
//! time against `expires_at` and transitions the offer lazily if due.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod offer;

pub use error::{OfferError, Result};
pub use offer::{AcceptedVia, ExpiryCause, Offer, OfferStatus, ReviewParty};

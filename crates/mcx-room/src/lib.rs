//! # mcx-room
//!
//! The transaction room: the stateful workflow created when an offer is
//! accepted, coordinating deposit, three-party approval, and final payment
//! through to completion or dispute.
//!
//! ```text
//! awaiting_deposit -> deposit_received -> in_review
//!       -> {buyer_approved, seller_approved} -> both_approved
//!       -> admin_final_review -> payment_pending -> payment_received
//!       -> completed
//! ```
//!
//! `cancelled` and `disputed` are reachable from every non-terminal state.
//! Once created, the room is the sole authority for the transaction's
//! financial state; the listing and offer read it but never advance it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod room;

pub use error::{Result, RoomError};
pub use room::{RoomAction, RoomMessage, RoomStatus, TransactionRoom};

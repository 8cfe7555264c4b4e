//! # mcx-ledger
//!
//! The credit side of the MCX marketplace:
//!
//! - **Credit ledger**: an append-only log of signed entries per buyer;
//!   a buyer's balance is always the sum of their entries and never goes
//!   negative
//! - **Unlock records**: the permanent join of buyer and listing marking
//!   that sensitive fields have been disclosed
//! - **Unlock gate**: the pure decision combining ledger state and listing
//!   visibility rules; the engine executes the decision atomically
//!
//! The ledger never mutates or deletes an entry; corrections are new
//! entries (`refund`, `bonus`).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod ledger;
mod unlock;

pub use error::{LedgerError, Result};
pub use ledger::{CreditEntry, CreditLedger, EntryKind};
pub use unlock::{evaluate_unlock, UnlockDecision, UnlockRecord, UnlockRegistry, UnlockSource};

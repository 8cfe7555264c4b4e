//! The append-only credit ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mcx_core::{BuyerId, ListingId};

use crate::error::{LedgerError, Result};

/// The kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Buyer bought credits. Positive.
    Purchase,
    /// Credits spent on an unlock. Negative.
    Usage,
    /// Credits returned to the buyer by the admin. Positive.
    Refund,
    /// Promotional credits granted by the platform. Positive.
    Bonus,
}

impl EntryKind {
    /// Returns the string representation of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Usage => "usage",
            Self::Refund => "refund",
            Self::Bonus => "bonus",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// The buyer whose balance this entry moves.
    pub buyer_id: BuyerId,
    /// Signed credit amount.
    pub amount: i64,
    /// Entry kind.
    pub kind: EntryKind,
    /// The listing an unlock debit refers to, if any.
    pub listing_id: Option<ListingId>,
    /// Free-form note (e.g. the admin's reason for a refund).
    pub note: Option<String>,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Append-only ledger of credit movements across all buyers.
///
/// A buyer's available balance is the sum of their entries; the append
/// methods enforce that no debit ever takes a balance below zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditLedger {
    entries: Vec<CreditEntry>,
}

impl CreditLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A buyer's available balance: the sum of their entries.
    #[must_use]
    pub fn balance(&self, buyer_id: BuyerId) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.buyer_id == buyer_id)
            .map(|e| e.amount)
            .sum()
    }

    /// Append a positive entry (`purchase`, `refund`, or `bonus`).
    ///
    /// # Errors
    ///
    /// Returns an error for zero amounts or the `usage` kind (use
    /// [`Self::debit_usage`] for debits).
    pub fn credit(
        &mut self,
        buyer_id: BuyerId,
        kind: EntryKind,
        amount: i64,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&CreditEntry> {
        if kind == EntryKind::Usage {
            return Err(LedgerError::WrongEntrySign {
                kind: kind.to_string(),
                expected: "negative",
            });
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount < 0 {
            return Err(LedgerError::WrongEntrySign {
                kind: kind.to_string(),
                expected: "positive",
            });
        }

        self.entries.push(CreditEntry {
            id: Uuid::new_v4(),
            buyer_id,
            amount,
            kind,
            listing_id: None,
            note,
            recorded_at: now,
        });
        // Just pushed, so last() is present
        self.entries.last().ok_or(LedgerError::ZeroAmount)
    }

    /// Append a `usage` debit for unlocking a listing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientCredits`] if the buyer's balance
    /// cannot cover the cost; the ledger is untouched in that case.
    pub fn debit_usage(
        &mut self,
        buyer_id: BuyerId,
        listing_id: ListingId,
        cost: i64,
        now: DateTime<Utc>,
    ) -> Result<&CreditEntry> {
        if cost <= 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.balance(buyer_id);
        if available < cost {
            return Err(LedgerError::InsufficientCredits {
                required: cost,
                available,
            });
        }

        self.entries.push(CreditEntry {
            id: Uuid::new_v4(),
            buyer_id,
            amount: -cost,
            kind: EntryKind::Usage,
            listing_id: Some(listing_id),
            note: None,
            recorded_at: now,
        });
        self.entries.last().ok_or(LedgerError::ZeroAmount)
    }

    /// All entries for a buyer, in append order.
    #[must_use]
    pub fn entries_for(&self, buyer_id: BuyerId) -> Vec<&CreditEntry> {
        self.entries
            .iter()
            .filter(|e| e.buyer_id == buyer_id)
            .collect()
    }

    /// Total number of entries across all buyers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ledger has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

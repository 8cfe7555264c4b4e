//! Unlock records and the unlock gate decision.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mcx_core::{BuyerId, ListingId};

/// How a buyer gained disclosure of a listing's sensitive fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockSource {
    /// One credit was debited through the unlock gate.
    CreditDebit,
    /// Granted permanently when the buyer's transaction room completed.
    CompletedTransaction,
}

/// A permanent record that a listing's details were revealed to a buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockRecord {
    /// The buyer the details were revealed to.
    pub buyer_id: BuyerId,
    /// The listing whose details were revealed.
    pub listing_id: ListingId,
    /// How disclosure was obtained.
    pub source: UnlockSource,
    /// When disclosure was granted.
    pub granted_at: DateTime<Utc>,
}

/// All unlock records, keyed by (buyer, listing).
///
/// Inserts are idempotent: the first record for a pair wins, so a buyer who
/// unlocked via credits and later completed a purchase keeps one record.
#[derive(Debug, Clone, Default)]
pub struct UnlockRegistry {
    records: HashMap<(BuyerId, ListingId), UnlockRecord>,
}

impl UnlockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pair is already unlocked.
    #[must_use]
    pub fn is_unlocked(&self, buyer_id: BuyerId, listing_id: ListingId) -> bool {
        self.records.contains_key(&(buyer_id, listing_id))
    }

    /// Look up the record for a pair.
    #[must_use]
    pub fn get(&self, buyer_id: BuyerId, listing_id: ListingId) -> Option<&UnlockRecord> {
        self.records.get(&(buyer_id, listing_id))
    }

    /// Record an unlock. Returns the stored record; an existing record for
    /// the pair is kept unchanged (idempotent).
    pub fn grant(
        &mut self,
        buyer_id: BuyerId,
        listing_id: ListingId,
        source: UnlockSource,
        granted_at: DateTime<Utc>,
    ) -> &UnlockRecord {
        self.records
            .entry((buyer_id, listing_id))
            .or_insert(UnlockRecord {
                buyer_id,
                listing_id,
                source,
                granted_at,
            })
    }

    /// All records for a buyer.
    #[must_use]
    pub fn records_for(&self, buyer_id: BuyerId) -> Vec<&UnlockRecord> {
        self.records
            .values()
            .filter(|r| r.buyer_id == buyer_id)
            .collect()
    }

    /// Total number of unlock records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no unlocks have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The outcome of evaluating an unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockDecision {
    /// Already unlocked; succeed without touching the ledger.
    AlreadyUnlocked,
    /// Debit one unit and write the record (atomically).
    Debit,
    /// Premium listing: credit unlock is not eligible, route the buyer to
    /// the admin-mediated contact flow.
    PremiumContactRequired,
    /// The buyer cannot cover the unlock cost.
    InsufficientCredits {
        /// The buyer's current balance.
        available: i64,
    },
}

/// Decide what an unlock request should do.
///
/// Pure: the caller supplies the already-unlocked flag, the premium flag,
/// and the buyer's balance, and atomically executes whatever this returns.
/// The idempotency check comes first so re-requests succeed even on premium
/// listings the buyer earned access to through a completed transaction.
#[must_use]
pub fn evaluate_unlock(
    already_unlocked: bool,
    is_premium: bool,
    balance: i64,
    cost: i64,
) -> UnlockDecision {
    if already_unlocked {
        UnlockDecision::AlreadyUnlocked
    } else if is_premium {
        UnlockDecision::PremiumContactRequired
    } else if balance < cost {
        UnlockDecision::InsufficientCredits { available: balance }
    } else {
        UnlockDecision::Debit
    }
}

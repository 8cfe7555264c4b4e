//! Engine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default offer time-to-live in hours.
const DEFAULT_OFFER_TTL_HOURS: i64 = 72;

/// Default price threshold above which a submitted listing defaults to
/// premium.
const DEFAULT_PREMIUM_THRESHOLD: u64 = 150_000;

/// Default unlock cost in credits.
const DEFAULT_UNLOCK_COST: i64 = 1;

/// Default deposit as a percentage of the agreed price.
const DEFAULT_DEPOSIT_PERCENT: u64 = 10;

/// Tunable parameters for the marketplace engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a new offer stays open, in hours.
    pub offer_ttl_hours: i64,
    /// Asking prices at or above this default a submission to premium.
    /// Applied once at submission, never re-derived from price changes.
    pub premium_price_threshold: u64,
    /// Credits debited per unlock.
    pub unlock_cost: i64,
    /// Deposit requirement as a percentage of the agreed price.
    pub deposit_percent: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            offer_ttl_hours: DEFAULT_OFFER_TTL_HOURS,
            premium_price_threshold: DEFAULT_PREMIUM_THRESHOLD,
            unlock_cost: DEFAULT_UNLOCK_COST,
            deposit_percent: DEFAULT_DEPOSIT_PERCENT,
        }
    }
}

impl EngineConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the offer time-to-live in hours.
    #[must_use]
    pub const fn with_offer_ttl_hours(mut self, hours: i64) -> Self {
        self.offer_ttl_hours = hours;
        self
    }

    /// Set the premium price threshold.
    #[must_use]
    pub const fn with_premium_threshold(mut self, threshold: u64) -> Self {
        self.premium_price_threshold = threshold;
        self
    }

    /// Set the unlock cost in credits.
    #[must_use]
    pub const fn with_unlock_cost(mut self, cost: i64) -> Self {
        self.unlock_cost = cost;
        self
    }

    /// Set the deposit percentage.
    #[must_use]
    pub const fn with_deposit_percent(mut self, percent: u64) -> Self {
        self.deposit_percent = percent;
        self
    }

    /// The offer time-to-live as a duration.
    #[must_use]
    pub fn offer_ttl(&self) -> Duration {
        Duration::hours(self.offer_ttl_hours)
    }

    /// The deposit required for an agreed price.
    ///
    /// Ceiling division so a non-zero price never rounds to a zero deposit.
    #[must_use]
    pub const fn deposit_for(&self, agreed_price: u64) -> u64 {
        if agreed_price == 0 || self.deposit_percent == 0 {
            return 0;
        }
        let numerator = agreed_price as u128 * self.deposit_percent as u128;
        let deposit = (numerator + 99) / 100;
        if deposit > u64::MAX as u128 {
            u64::MAX
        } else {
            deposit as u64
        }
    }
}

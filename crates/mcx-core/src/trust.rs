//! Trust score tiering.
//!
//! The marketplace stores a raw 0-100 trust score per seller and derives a
//! display tier from it on every read. There is exactly one threshold set;
//! no component is allowed to carry its own copy of these cutoffs. The tier
//! never gates a state transition by itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum score for the `High` trust tier.
pub const HIGH_TRUST_MIN: u8 = 80;

/// Minimum score for the `Medium` trust tier.
pub const MEDIUM_TRUST_MIN: u8 = 50;

/// Trust tier derived from a numeric trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustTier {
    /// Score 80 and above.
    High,
    /// Score 50 to 79.
    Medium,
    /// Score below 50.
    Low,
}

impl TrustTier {
    /// Maps a trust score to its tier.
    ///
    /// Pure and stateless: no hysteresis, no smoothing. Scores above 100 are
    /// treated as 100 (the storage layer should never produce them).
    ///
    /// # Examples
    /// ```
    /// use mcx_core::TrustTier;
    ///
    /// assert_eq!(TrustTier::from_score(95), TrustTier::High);
    /// assert_eq!(TrustTier::from_score(80), TrustTier::High);
    /// assert_eq!(TrustTier::from_score(79), TrustTier::Medium);
    /// assert_eq!(TrustTier::from_score(49), TrustTier::Low);
    /// ```
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= HIGH_TRUST_MIN {
            Self::High
        } else if score >= MEDIUM_TRUST_MIN {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Returns the string representation of this tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(100, TrustTier::High; "maximum score")]
    #[test_case(80, TrustTier::High; "high boundary")]
    #[test_case(79, TrustTier::Medium; "just below high")]
    #[test_case(50, TrustTier::Medium; "medium boundary")]
    #[test_case(49, TrustTier::Low; "just below medium")]
    #[test_case(0, TrustTier::Low; "minimum score")]
    fn test_score_to_tier(score: u8, expected: TrustTier) {
        assert_eq!(TrustTier::from_score(score), expected);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(TrustTier::High.to_string(), "high");
        assert_eq!(TrustTier::Medium.to_string(), "medium");
        assert_eq!(TrustTier::Low.to_string(), "low");
    }

    #[test]
    fn test_tier_serde_lowercase() {
        let json = serde_json::to_string(&TrustTier::Medium).expect("serialize");
        assert_eq!(json, "\"medium\"");
        let back: TrustTier = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, TrustTier::Medium);
    }

    #[test]
    fn test_mapping_is_stable_across_reads() {
        // Recomputing from the same stored score always yields the same tier.
        for score in 0..=100u8 {
            assert_eq!(TrustTier::from_score(score), TrustTier::from_score(score));
        }
    }
}

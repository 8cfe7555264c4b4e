//! Actor roles for authorization checks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The role an actor plays in a marketplace operation.
///
/// Identity management is external; the engine receives the caller's role
/// alongside every request and authorizes transitions against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// A buyer browsing listings and making offers.
    Buyer,
    /// A seller who owns listings.
    Seller,
    /// The platform administrator.
    Admin,
}

impl ActorRole {
    /// Returns the string representation of this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

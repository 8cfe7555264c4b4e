//! The offer entity and its negotiation state machine.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use mcx_core::{BuyerId, ListingId, OfferId, SellerId};

use crate::error::{OfferError, Result};

/// The lifecycle state of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Awaiting review (by the seller, or by the admin for Buy-Now).
    Pending,
    /// Seller countered; awaiting the buyer's response.
    Countered,
    /// Terminal success: accepted by the seller or admin-approved Buy-Now.
    Accepted,
    /// Declined by the seller or admin. Terminal.
    Rejected,
    /// Deadline passed or the listing was reserved by another offer. Terminal.
    Expired,
    /// Withdrawn by the buyer. Terminal.
    Withdrawn,
}

impl OfferStatus {
    /// Checks if a transition to the target state is valid.
    ///
    /// `Countered -> Countered` is the seller re-countering.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        use OfferStatus::{Accepted, Countered, Expired, Pending, Rejected, Withdrawn};

        matches!(
            (self, target),
            (Pending | Countered, Countered | Accepted | Rejected | Expired | Withdrawn)
        )
    }

    /// Returns true if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Rejected | Self::Expired | Self::Withdrawn
        )
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Countered => "countered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Withdrawn => "withdrawn",
        };
        write!(f, "{s}")
    }
}

/// How an offer reached its accepted terminal state.
///
/// Both paths land in the same [`OfferStatus::Accepted`] state; this field
/// keeps the paths distinguishable for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptedVia {
    /// Seller accepted the offer (or the buyer accepted a counter).
    SellerAcceptance,
    /// Admin approved a Buy-Now offer.
    AdminApproval,
}

/// Why an offer expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryCause {
    /// The `expires_at` deadline passed.
    DeadlinePassed,
    /// The listing was reserved by a competing offer.
    ListingReserved,
}

/// Which party a pending offer is waiting on.
///
/// A Buy-Now offer's `pending` state means "awaiting admin review" rather
/// than "awaiting seller review"; this is a presentation distinction over
/// the same status, not a separate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewParty {
    /// The seller reviews ordinary offers.
    Seller,
    /// The admin reviews Buy-Now offers.
    Admin,
}

/// A buyer's priced proposal against exactly one listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Unique identifier.
    pub id: OfferId,
    /// The listing this offer targets.
    pub listing_id: ListingId,
    /// The proposing buyer.
    pub buyer_id: BuyerId,
    /// The listing's seller, denormalized at creation.
    pub seller_id: SellerId,
    /// Offered amount in whole dollars.
    pub amount: u64,
    /// Optional message to the seller.
    pub message: Option<String>,
    /// Buy-Now variant: full listing price, admin pre-approval required.
    pub is_buy_now: bool,
    /// Current lifecycle state.
    pub status: OfferStatus,
    /// Seller's counter amount; only meaningful while `Countered`.
    pub counter_amount: Option<u64>,
    /// Seller's counter message.
    pub counter_message: Option<String>,
    /// How the offer was accepted, once terminal-success.
    pub accepted_via: Option<AcceptedVia>,
    /// The price both sides settled on, recorded at acceptance.
    pub agreed_price: Option<u64>,
    /// Advisory deadline; checked lazily on every read and write.
    pub expires_at: DateTime<Utc>,
    /// Why the offer expired, once expired.
    pub expiry_cause: Option<ExpiryCause>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// Create a new pending offer expiring `ttl` after `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OfferId,
        listing_id: ListingId,
        buyer_id: BuyerId,
        seller_id: SellerId,
        amount: u64,
        message: Option<String>,
        is_buy_now: bool,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self> {
        if amount == 0 {
            return Err(OfferError::ZeroAmount);
        }

        Ok(Self {
            id,
            listing_id,
            buyer_id,
            seller_id,
            amount,
            message,
            is_buy_now,
            status: OfferStatus::Pending,
            counter_amount: None,
            counter_message: None,
            accepted_via: None,
            agreed_price: None,
            expires_at: now + ttl,
            expiry_cause: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Lazily expire the offer if its deadline has passed.
    ///
    /// Called by the engine before every operation that reads or writes the
    /// offer. Returns true if the offer transitioned to `Expired` here.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.is_terminal() && now >= self.expires_at {
            self.status = OfferStatus::Expired;
            self.expiry_cause = Some(ExpiryCause::DeadlinePassed);
            self.updated_at = now;
            true
        } else {
            false
        }
    }

    /// The status as of `now`, without mutating.
    ///
    /// An offer past its deadline reports `Expired` even if no write has
    /// materialized that transition yet.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> OfferStatus {
        if !self.status.is_terminal() && now >= self.expires_at {
            OfferStatus::Expired
        } else {
            self.status
        }
    }

    fn transition_to(&mut self, target: OfferStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status == OfferStatus::Expired {
            return Err(OfferError::Expired);
        }
        if self.status.can_transition_to(&target) {
            self.status = target;
            self.updated_at = now;
            Ok(())
        } else {
            Err(OfferError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Seller counters (or re-counters) with a new amount.
    ///
    /// # Errors
    ///
    /// Fails for Buy-Now offers, zero amounts, and terminal states.
    pub fn counter(
        &mut self,
        amount: u64,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.is_buy_now {
            return Err(OfferError::NotNegotiable);
        }
        if amount == 0 {
            return Err(OfferError::ZeroAmount);
        }
        self.transition_to(OfferStatus::Countered, now)?;
        self.counter_amount = Some(amount);
        self.counter_message = message;
        Ok(())
    }

    /// Accept the offer, recording the path taken and the agreed price.
    ///
    /// From `Pending` the agreed price is the offer amount; from `Countered`
    /// it is the counter amount (the buyer accepting the seller's counter).
    /// Returns the agreed price so the caller can open the transaction room.
    ///
    /// # Errors
    ///
    /// Fails if the acceptance path does not match the offer variant or the
    /// state does not allow acceptance.
    pub fn accept(&mut self, via: AcceptedVia, now: DateTime<Utc>) -> Result<u64> {
        match (self.is_buy_now, via) {
            (true, AcceptedVia::SellerAcceptance) => return Err(OfferError::BuyNowRequiresAdmin),
            (false, AcceptedVia::AdminApproval) => return Err(OfferError::NotBuyNow),
            _ => {}
        }

        let agreed = if self.status == OfferStatus::Countered {
            self.counter_amount.ok_or(OfferError::CounterAmountMissing)?
        } else {
            self.amount
        };

        self.transition_to(OfferStatus::Accepted, now)?;
        self.accepted_via = Some(via);
        self.agreed_price = Some(agreed);
        Ok(agreed)
    }

    /// Seller (or admin, for Buy-Now) declines the offer.
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(OfferStatus::Rejected, now)
    }

    /// Buyer withdraws the offer. Permitted from `Pending` or `Countered`.
    pub fn withdraw(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(OfferStatus::Withdrawn, now)
    }

    /// Expire the offer because its listing was reserved by a competing
    /// offer. Distinct from deadline expiry so the cause survives.
    pub fn expire_for_reservation(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(OfferStatus::Expired, now)?;
        self.expiry_cause = Some(ExpiryCause::ListingReserved);
        Ok(())
    }

    /// Returns true if the offer is still open (non-terminal).
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Which party a pending offer is waiting on, for display.
    #[must_use]
    pub fn pending_review(&self) -> Option<ReviewParty> {
        match self.status {
            OfferStatus::Pending if self.is_buy_now => Some(ReviewParty::Admin),
            OfferStatus::Pending => Some(ReviewParty::Seller),
            _ => None,
        }
    }
}

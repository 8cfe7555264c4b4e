//! The listing entity and its lifecycle state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mcx_core::{ListingId, RoomId, SellerId, TrustTier};

use crate::error::{ListingError, Result};

/// The lifecycle state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Created by the seller but not yet submitted.
    Draft,
    /// Submitted, awaiting admin verification.
    PendingVerification,
    /// Verified and visible to buyers.
    Active,
    /// A transaction room holds this listing; no new offers.
    Reserved,
    /// Sold through a completed transaction. Terminal.
    Sold,
    /// Rejected or taken down by the admin. Terminal.
    Suspended,
}

impl ListingStatus {
    /// Checks if a transition to the target state is valid.
    ///
    /// `Active -> Reserved` happens only when a transaction room is created;
    /// `Reserved -> Active` only when that room is cancelled. Nothing ever
    /// leaves `Sold`.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        use ListingStatus::{Active, Draft, PendingVerification, Reserved, Sold, Suspended};

        matches!(
            (self, target),
            (Draft, PendingVerification)
                | (PendingVerification, Active | Suspended)
                | (Active, Reserved | Suspended)
                | (Reserved, Sold | Active)
        )
    }

    /// Returns true if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Sold | Self::Suspended)
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::PendingVerification => "pending_verification",
            Self::Active => "active",
            Self::Reserved => "reserved",
            Self::Sold => "sold",
            Self::Suspended => "suspended",
        };
        write!(f, "{s}")
    }
}

/// Who can see a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible to all buyers.
    #[default]
    Public,
    /// Visible only to buyers the seller shares it with.
    Private,
    /// Reachable by direct link only.
    Unlisted,
}

/// The fields a seller supplies when submitting a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDraft {
    /// The seller submitting the listing.
    pub seller_id: SellerId,
    /// Full MC number (sensitive until unlocked).
    pub mc_number: String,
    /// Full DOT number (sensitive until unlocked).
    pub dot_number: String,
    /// Registered legal name of the carrier (sensitive until unlocked).
    pub legal_name: String,
    /// Seller contact email (sensitive until unlocked).
    pub contact_email: String,
    /// Seller-set asking price in whole dollars.
    pub asking_price: u64,
    /// Visibility of the listing to buyers.
    pub visibility: Visibility,
    /// Premium flag; when absent the engine derives a default from its
    /// configured price threshold, once, at submission.
    pub is_premium: Option<bool>,
    /// Trust score of the seller (0-100), supplied by the external data
    /// collaborator.
    pub trust_score: u8,
}

/// A sellable motor-carrier authority.
///
/// Prices: `asking_price` is seller-set; `listing_price` is admin-set during
/// approval and, when present, is authoritative for everything buyer-facing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Unique identifier.
    pub id: ListingId,
    /// The owning seller.
    pub seller_id: SellerId,
    /// Full MC number. Only disclosed through the unlock gate.
    pub mc_number: String,
    /// Full DOT number. Only disclosed through the unlock gate.
    pub dot_number: String,
    /// Carrier legal name. Only disclosed through the unlock gate.
    pub legal_name: String,
    /// Seller contact email. Only disclosed through the unlock gate.
    pub contact_email: String,
    /// Seller-set asking price in whole dollars.
    pub asking_price: u64,
    /// Admin-set price; authoritative for buyers when present.
    pub listing_price: Option<u64>,
    /// Premium listings bypass credit unlock and go through the
    /// admin-mediated contact flow.
    pub is_premium: bool,
    /// Seller trust score (0-100); the tier is derived on read.
    pub trust_score: u8,
    /// Current lifecycle state.
    pub status: ListingStatus,
    /// Buyer visibility.
    pub visibility: Visibility,
    /// The non-terminal transaction room holding this listing, if any.
    pub active_room: Option<RoomId>,
    /// Admin notes recorded at approval.
    pub admin_notes: Option<String>,
    /// Reason recorded at rejection, surfaced to the seller.
    pub rejection_reason: Option<String>,
    /// Display-only view counter.
    pub view_count: u64,
    /// Display-only save counter.
    pub save_count: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Create a listing from a draft, in the `Draft` state.
    ///
    /// Validates the MC/DOT number formats and the asking price. The
    /// `is_premium` default (when the draft leaves it unset) is the caller's
    /// concern; pass the resolved flag in `is_premium`.
    ///
    /// # Errors
    ///
    /// Returns an error if any identifying number is malformed or the asking
    /// price is zero.
    pub fn from_draft(
        id: ListingId,
        draft: &ListingDraft,
        is_premium: bool,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        mcx_core::validate_mc_number(&draft.mc_number)?;
        mcx_core::validate_dot_number(&draft.dot_number)?;
        if draft.asking_price == 0 {
            return Err(ListingError::InvalidPrice(
                "asking price must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            id,
            seller_id: draft.seller_id,
            mc_number: draft.mc_number.clone(),
            dot_number: draft.dot_number.clone(),
            legal_name: draft.legal_name.clone(),
            contact_email: draft.contact_email.clone(),
            asking_price: draft.asking_price,
            listing_price: None,
            is_premium,
            trust_score: draft.trust_score.min(100),
            status: ListingStatus::Draft,
            visibility: draft.visibility,
            active_room: None,
            admin_notes: None,
            rejection_reason: None,
            view_count: 0,
            save_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition_to(&mut self, target: ListingStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status.can_transition_to(&target) {
            self.status = target;
            self.updated_at = now;
            Ok(())
        } else {
            Err(ListingError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Submit the draft for admin verification.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(ListingStatus::PendingVerification, now)
    }

    /// Admin approval: activates the listing, optionally setting the
    /// authoritative listing price.
    pub fn approve(
        &mut self,
        price_override: Option<u64>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(price) = price_override {
            if price == 0 {
                return Err(ListingError::InvalidPrice(
                    "listing price must be non-zero".to_string(),
                ));
            }
        }
        self.transition_to(ListingStatus::Active, now)?;
        if price_override.is_some() {
            self.listing_price = price_override;
        }
        self.admin_notes = notes;
        Ok(())
    }

    /// Admin rejection: suspends the listing with a mandatory reason.
    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(ListingError::MissingRejectionReason);
        }
        self.transition_to(ListingStatus::Suspended, now)?;
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }

    /// Reserve the listing for a newly created transaction room.
    pub fn reserve(&mut self, room_id: RoomId, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(ListingStatus::Reserved, now)?;
        self.active_room = Some(room_id);
        Ok(())
    }

    /// Release the reservation after the room was cancelled.
    pub fn release(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(ListingStatus::Active, now)?;
        self.active_room = None;
        Ok(())
    }

    /// Mark the listing sold after the room completed. Terminal.
    pub fn mark_sold(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(ListingStatus::Sold, now)?;
        self.active_room = None;
        Ok(())
    }

    /// Admin takedown of an active listing.
    pub fn suspend(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(ListingError::MissingRejectionReason);
        }
        self.transition_to(ListingStatus::Suspended, now)?;
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }

    /// The price buyers see: the admin-set listing price when present,
    /// otherwise the seller's asking price.
    #[must_use]
    pub fn buyer_price(&self) -> u64 {
        self.listing_price.unwrap_or(self.asking_price)
    }

    /// Derive the seller's trust tier from the stored score.
    #[must_use]
    pub fn trust_tier(&self) -> TrustTier {
        TrustTier::from_score(self.trust_score)
    }

    /// Record a buyer viewing the listing. Display-only.
    pub fn record_view(&mut self) {
        self.view_count = self.view_count.saturating_add(1);
    }

    /// Record a buyer saving the listing. Display-only.
    pub fn record_save(&mut self) {
        self.save_count = self.save_count.saturating_add(1);
    }

    /// The masked, buyer-safe card for this listing.
    #[must_use]
    pub fn card(&self) -> ListingCard {
        ListingCard {
            id: self.id,
            masked_mc_number: mcx_core::mask_mc_number(&self.mc_number),
            masked_dot_number: mcx_core::mask_dot_number(&self.dot_number),
            price: self.buyer_price(),
            is_premium: self.is_premium,
            trust_tier: self.trust_tier(),
            status: self.status,
            visibility: self.visibility,
            view_count: self.view_count,
            save_count: self.save_count,
        }
    }
}

/// Masked buyer-facing view of a listing.
///
/// Contains nothing from the sensitive field set (full MC/DOT numbers, legal
/// name, contact info); disclosure of those goes through the unlock gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCard {
    /// Listing identifier.
    pub id: ListingId,
    /// Masked MC number, e.g. `MC-12••••`.
    pub masked_mc_number: String,
    /// Masked DOT number.
    pub masked_dot_number: String,
    /// Buyer-facing price (listing price when set, otherwise asking price).
    pub price: u64,
    /// Premium flag.
    pub is_premium: bool,
    /// Seller trust tier.
    pub trust_tier: TrustTier,
    /// Current lifecycle state.
    pub status: ListingStatus,
    /// Buyer visibility.
    pub visibility: Visibility,
    /// Display-only view counter.
    pub view_count: u64,
    /// Display-only save counter.
    pub save_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        // Fixed timestamp keeps bookkeeping assertions deterministic
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn draft() -> ListingDraft {
        ListingDraft {
            seller_id: SellerId::new(),
            mc_number: "MC-123456".to_string(),
            dot_number: "7654321".to_string(),
            legal_name: "Acme Hauling LLC".to_string(),
            contact_email: "ops@acmehauling.example".to_string(),
            asking_price: 42_000,
            visibility: Visibility::Public,
            is_premium: None,
            trust_score: 85,
        }
    }

    fn pending_listing() -> Listing {
        let mut listing =
            Listing::from_draft(ListingId::new(), &draft(), false, now()).expect("valid draft");
        listing.submit(now()).expect("submit");
        listing
    }

    fn active_listing() -> Listing {
        let mut listing = pending_listing();
        listing.approve(None, None, now()).expect("approve");
        listing
    }

    #[test_case(ListingStatus::Draft, ListingStatus::PendingVerification, true)]
    #[test_case(ListingStatus::PendingVerification, ListingStatus::Active, true)]
    #[test_case(ListingStatus::PendingVerification, ListingStatus::Suspended, true)]
    #[test_case(ListingStatus::Active, ListingStatus::Reserved, true)]
    #[test_case(ListingStatus::Active, ListingStatus::Suspended, true)]
    #[test_case(ListingStatus::Reserved, ListingStatus::Sold, true)]
    #[test_case(ListingStatus::Reserved, ListingStatus::Active, true)]
    #[test_case(ListingStatus::Draft, ListingStatus::Active, false)]
    #[test_case(ListingStatus::Active, ListingStatus::Sold, false; "sold only via reserved")]
    #[test_case(ListingStatus::Sold, ListingStatus::Active, false; "nothing leaves sold")]
    #[test_case(ListingStatus::Sold, ListingStatus::Reserved, false)]
    #[test_case(ListingStatus::Suspended, ListingStatus::Active, false)]
    fn test_transition_table(from: ListingStatus, to: ListingStatus, valid: bool) {
        assert_eq!(from.can_transition_to(&to), valid);
    }

    #[test]
    fn test_from_draft_validates_numbers() {
        let mut bad = draft();
        bad.mc_number = "123456".to_string();
        assert!(Listing::from_draft(ListingId::new(), &bad, false, now()).is_err());

        let mut bad = draft();
        bad.dot_number = "12".to_string();
        assert!(Listing::from_draft(ListingId::new(), &bad, false, now()).is_err());
    }

    #[test]
    fn test_from_draft_rejects_zero_price() {
        let mut bad = draft();
        bad.asking_price = 0;
        assert!(Listing::from_draft(ListingId::new(), &bad, false, now()).is_err());
    }

    #[test]
    fn test_approve_sets_authoritative_price() {
        let mut listing = pending_listing();
        listing
            .approve(Some(45_000), Some("verified docket".to_string()), now())
            .expect("approve");

        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.listing_price, Some(45_000));
        // Listing price takes precedence over the asking price
        assert_eq!(listing.buyer_price(), 45_000);
        assert_eq!(listing.asking_price, 42_000);
    }

    #[test]
    fn test_buyer_price_falls_back_to_asking() {
        let listing = active_listing();
        assert_eq!(listing.buyer_price(), 42_000);
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut listing = pending_listing();
        assert!(matches!(
            listing.reject("  ", now()),
            Err(ListingError::MissingRejectionReason)
        ));
        assert_eq!(listing.status, ListingStatus::PendingVerification);

        listing
            .reject("docket does not match FMCSA record", now())
            .expect("reject");
        assert_eq!(listing.status, ListingStatus::Suspended);
        assert_eq!(
            listing.rejection_reason.as_deref(),
            Some("docket does not match FMCSA record")
        );
    }

    #[test]
    fn test_reserve_and_release() {
        let mut listing = active_listing();
        let room = RoomId::new();

        listing.reserve(room, now()).expect("reserve");
        assert_eq!(listing.status, ListingStatus::Reserved);
        assert_eq!(listing.active_room, Some(room));

        listing.release(now()).expect("release");
        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.active_room, None);
    }

    #[test]
    fn test_reserve_requires_active() {
        let mut listing = pending_listing();
        assert!(listing.reserve(RoomId::new(), now()).is_err());
    }

    #[test]
    fn test_mark_sold_is_terminal() {
        let mut listing = active_listing();
        listing.reserve(RoomId::new(), now()).expect("reserve");
        listing.mark_sold(now()).expect("sold");

        assert_eq!(listing.status, ListingStatus::Sold);
        assert!(listing.status.is_terminal());
        assert!(listing.release(now()).is_err());
        assert!(listing.reserve(RoomId::new(), now()).is_err());
    }

    #[test]
    fn test_trust_tier_derived_from_score() {
        let mut listing = active_listing();
        assert_eq!(listing.trust_tier(), TrustTier::High);
        listing.trust_score = 60;
        assert_eq!(listing.trust_tier(), TrustTier::Medium);
    }

    #[test]
    fn test_card_masks_sensitive_fields() {
        let listing = active_listing();
        let card = listing.card();

        assert_eq!(card.masked_mc_number, "MC-12••••");
        assert_eq!(card.masked_dot_number, "76•••••");
        let json = serde_json::to_string(&card).expect("serialize");
        assert!(!json.contains("123456"));
        assert!(!json.contains("Acme Hauling"));
        assert!(!json.contains("acmehauling.example"));
    }

    #[test]
    fn test_counters_saturate() {
        let mut listing = active_listing();
        listing.view_count = u64::MAX;
        listing.record_view();
        assert_eq!(listing.view_count, u64::MAX);
        listing.record_save();
        assert_eq!(listing.save_count, 1);
    }

    #[test]
    fn test_timestamps_use_supplied_instant() {
        let mut listing =
            Listing::from_draft(ListingId::new(), &draft(), false, now()).expect("valid draft");
        assert_eq!(listing.created_at, now());

        let later = now() + chrono::Duration::hours(2);
        listing.submit(later).expect("submit");
        assert_eq!(listing.updated_at, later);
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json =
            serde_json::to_string(&ListingStatus::PendingVerification).expect("serialize");
        assert_eq!(json, "\"pending_verification\"");
    }
}

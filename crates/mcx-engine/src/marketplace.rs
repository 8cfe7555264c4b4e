//! The marketplace engine: the operation surface over all aggregates.
//!
//! All aggregate stores live behind their own `RwLock`. Operations that
//! touch several aggregates take every guard they need up front and hold
//! them together, so cross-aggregate effects (reserve a listing + expire
//! competing offers + open a room) are atomic to every other caller.
//!
//! Lock order, always: listings, then offers, then rooms, then ledger,
//! then unlocks. Events are collected under the guards and emitted after
//! they drop.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use mcx_core::{ActorRole, BuyerId, ListingId, OfferId, RoomId, SellerId};
use mcx_ledger::{
    evaluate_unlock, CreditEntry, CreditLedger, EntryKind, UnlockDecision, UnlockRecord,
    UnlockRegistry, UnlockSource,
};
use mcx_listing::{Listing, ListingCard, ListingDraft, ListingStatus};
use mcx_offer::{AcceptedVia, Offer, OfferStatus};
use mcx_room::{RoomAction, RoomStatus, TransactionRoom};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{MarketError, Result};
use crate::event::{ContactRequest, EventSink, MarketEvent, TracingEventSink};

/// The identity an offer operation is performed as.
///
/// Buyer and seller carry their id, checked against the offer's own
/// buyer/seller references; the admin carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferActor {
    /// The buyer who placed the offer.
    Buyer(BuyerId),
    /// The seller of the listing the offer targets.
    Seller(SellerId),
    /// The platform admin.
    Admin,
}

impl OfferActor {
    /// The plain role, for error reporting.
    #[must_use]
    pub const fn role(&self) -> ActorRole {
        match self {
            Self::Buyer(_) => ActorRole::Buyer,
            Self::Seller(_) => ActorRole::Seller,
            Self::Admin => ActorRole::Admin,
        }
    }
}

/// The sensitive fields of a listing, revealed through the unlock gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disclosure {
    /// Full MC number.
    pub mc_number: String,
    /// Full DOT number.
    pub dot_number: String,
    /// Carrier legal name.
    pub legal_name: String,
    /// Seller contact email.
    pub contact_email: String,
}

/// A buyer's view of a listing: the masked card, plus the sensitive
/// fields when the buyer holds an unlock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingView {
    /// The masked, always-safe card.
    pub card: ListingCard,
    /// Present only when this buyer has unlocked the listing.
    pub disclosure: Option<Disclosure>,
}

/// Aggregate counts for operational visibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketStats {
    /// Total listings in the store.
    pub listings: usize,
    /// Total offers in the store.
    pub offers: usize,
    /// Total transaction rooms.
    pub rooms: usize,
    /// Total ledger entries.
    pub ledger_entries: usize,
    /// Total unlock records.
    pub unlocks: usize,
}

/// The marketplace engine.
pub struct Marketplace {
    listings: RwLock<HashMap<ListingId, Listing>>,
    offers: RwLock<HashMap<OfferId, Offer>>,
    rooms: RwLock<HashMap<RoomId, TransactionRoom>>,
    ledger: RwLock<CreditLedger>,
    unlocks: RwLock<UnlockRegistry>,
    contact_requests: RwLock<Vec<ContactRequest>>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl Marketplace {
    /// Create an engine with the given configuration, clock, and sink.
    #[must_use]
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
            offers: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
            ledger: RwLock::new(CreditLedger::new()),
            unlocks: RwLock::new(UnlockRegistry::new()),
            contact_requests: RwLock::new(Vec::new()),
            config,
            clock,
            sink,
        }
    }

    /// Create an engine with the default configuration, the system clock,
    /// and the tracing event sink.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            EngineConfig::default(),
            Arc::new(SystemClock::new()),
            Arc::new(TracingEventSink::new()),
        )
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn emit_all(&self, events: Vec<MarketEvent>) {
        for event in &events {
            self.sink.emit(event);
        }
    }

    fn require_admin(role: ActorRole, operation: &str) -> Result<()> {
        if role == ActorRole::Admin {
            Ok(())
        } else {
            Err(MarketError::Unauthorized {
                role,
                operation: operation.to_string(),
            })
        }
    }

    // ---- Listings ----------------------------------------------------

    /// Submit a new listing for admin verification.
    ///
    /// When the draft leaves `is_premium` unset, it defaults to whether the
    /// asking price reaches the configured premium threshold. The flag is
    /// fixed here and never re-derived from later price changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft fails validation.
    pub fn submit_listing(&self, draft: &ListingDraft) -> Result<ListingId> {
        let now = self.now();
        let is_premium = draft
            .is_premium
            .unwrap_or(draft.asking_price >= self.config.premium_price_threshold);

        let id = ListingId::new();
        let mut listing = Listing::from_draft(id, draft, is_premium, now)?;
        listing.submit(now)?;
        let seller_id = listing.seller_id;

        self.listings.write().insert(id, listing);

        tracing::info!(listing_id = %id, seller_id = %seller_id, is_premium, "listing submitted");
        self.emit_all(vec![MarketEvent::ListingSubmitted {
            listing_id: id,
            seller_id,
        }]);
        Ok(id)
    }

    /// Admin approval: activate a pending listing, optionally overriding
    /// the buyer-facing price.
    ///
    /// # Errors
    ///
    /// Fails if the caller is not the admin, the listing is unknown, the
    /// price override is zero, or the listing is not pending verification.
    pub fn approve_listing(
        &self,
        role: ActorRole,
        listing_id: ListingId,
        price_override: Option<u64>,
        notes: Option<String>,
    ) -> Result<()> {
        Self::require_admin(role, "approve listings")?;
        let now = self.now();

        let price = {
            let mut listings = self.listings.write();
            let listing = listings
                .get_mut(&listing_id)
                .ok_or(MarketError::ListingNotFound(listing_id))?;
            listing.approve(price_override, notes, now)?;
            listing.buyer_price()
        };

        tracing::info!(listing_id = %listing_id, price, "listing approved");
        self.emit_all(vec![MarketEvent::ListingApproved { listing_id, price }]);
        Ok(())
    }

    /// Admin rejection: suspend a pending listing with a mandatory reason.
    ///
    /// # Errors
    ///
    /// Fails if the caller is not the admin, the listing is unknown, the
    /// reason is blank, or the listing is not pending verification.
    pub fn reject_listing(
        &self,
        role: ActorRole,
        listing_id: ListingId,
        reason: &str,
    ) -> Result<()> {
        Self::require_admin(role, "reject listings")?;
        let now = self.now();

        {
            let mut listings = self.listings.write();
            let listing = listings
                .get_mut(&listing_id)
                .ok_or(MarketError::ListingNotFound(listing_id))?;
            listing.reject(reason, now)?;
        }

        tracing::info!(listing_id = %listing_id, reason, "listing rejected");
        self.emit_all(vec![MarketEvent::ListingRejected {
            listing_id,
            reason: reason.to_string(),
        }]);
        Ok(())
    }

    /// Admin takedown of an active listing.
    ///
    /// # Errors
    ///
    /// Fails if the caller is not the admin, the listing is unknown, the
    /// reason is blank, or the listing is not active.
    pub fn suspend_listing(
        &self,
        role: ActorRole,
        listing_id: ListingId,
        reason: &str,
    ) -> Result<()> {
        Self::require_admin(role, "suspend listings")?;
        let now = self.now();

        {
            let mut listings = self.listings.write();
            let listing = listings
                .get_mut(&listing_id)
                .ok_or(MarketError::ListingNotFound(listing_id))?;
            listing.suspend(reason, now)?;
        }

        tracing::info!(listing_id = %listing_id, reason, "listing suspended");
        self.emit_all(vec![MarketEvent::ListingRejected {
            listing_id,
            reason: reason.to_string(),
        }]);
        Ok(())
    }

    /// A buyer's view of a listing, recording the view.
    ///
    /// The sensitive fields are included only when this buyer holds an
    /// unlock record for the listing.
    ///
    /// # Errors
    ///
    /// Fails if the listing is unknown.
    pub fn view_listing(&self, buyer_id: BuyerId, listing_id: ListingId) -> Result<ListingView> {
        let unlocked = self.unlocks.read().is_unlocked(buyer_id, listing_id);

        let mut listings = self.listings.write();
        let listing = listings
            .get_mut(&listing_id)
            .ok_or(MarketError::ListingNotFound(listing_id))?;
        listing.record_view();

        Ok(ListingView {
            card: listing.card(),
            disclosure: unlocked.then(|| Disclosure {
                mc_number: listing.mc_number.clone(),
                dot_number: listing.dot_number.clone(),
                legal_name: listing.legal_name.clone(),
                contact_email: listing.contact_email.clone(),
            }),
        })
    }

    /// Record a buyer saving a listing. Display-only.
    ///
    /// # Errors
    ///
    /// Fails if the listing is unknown.
    pub fn save_listing(&self, listing_id: ListingId) -> Result<()> {
        let mut listings = self.listings.write();
        listings
            .get_mut(&listing_id)
            .ok_or(MarketError::ListingNotFound(listing_id))?
            .record_save();
        Ok(())
    }

    /// A snapshot of a listing.
    ///
    /// # Errors
    ///
    /// Fails if the listing is unknown.
    pub fn get_listing(&self, listing_id: ListingId) -> Result<Listing> {
        self.listings
            .read()
            .get(&listing_id)
            .cloned()
            .ok_or(MarketError::ListingNotFound(listing_id))
    }

    /// Masked cards for every active public listing.
    #[must_use]
    pub fn browse_listings(&self) -> Vec<ListingCard> {
        self.listings
            .read()
            .values()
            .filter(|l| {
                l.status == ListingStatus::Active && l.visibility == mcx_listing::Visibility::Public
            })
            .map(Listing::card)
            .collect()
    }

    // ---- Offers ------------------------------------------------------

    /// A buyer creates an offer against an active listing.
    ///
    /// Buy-Now offers must match the buyer-facing price exactly. A buyer
    /// can hold at most one open offer per listing; offers whose deadline
    /// has passed are expired here before that check, so a stale offer
    /// never blocks a fresh one.
    ///
    /// # Errors
    ///
    /// Fails if the listing is unknown or not active, the amount is zero,
    /// a Buy-Now amount mismatches the price, or the buyer already has an
    /// open offer on the listing.
    pub fn create_offer(
        &self,
        listing_id: ListingId,
        buyer_id: BuyerId,
        amount: u64,
        message: Option<String>,
        is_buy_now: bool,
    ) -> Result<OfferId> {
        let now = self.now();
        let mut events = Vec::new();

        let id = {
            let listings = self.listings.read();
            let mut offers = self.offers.write();

            let listing = listings
                .get(&listing_id)
                .ok_or(MarketError::ListingNotFound(listing_id))?;
            if listing.status != ListingStatus::Active {
                return Err(MarketError::ListingNotActive {
                    listing_id,
                    status: listing.status.to_string(),
                });
            }
            if is_buy_now && amount != listing.buyer_price() {
                return Err(MarketError::Validation(format!(
                    "buy-now amount {amount} must equal the listing price {}",
                    listing.buyer_price()
                )));
            }

            // Materialize any overdue expiries first, so a dead offer does
            // not count as open below.
            for offer in offers
                .values_mut()
                .filter(|o| o.listing_id == listing_id && o.buyer_id == buyer_id)
            {
                if offer.expire_if_due(now) {
                    events.push(MarketEvent::OfferExpired {
                        offer_id: offer.id,
                        cause: mcx_offer::ExpiryCause::DeadlinePassed,
                    });
                }
            }
            if offers
                .values()
                .any(|o| o.listing_id == listing_id && o.buyer_id == buyer_id && o.is_open())
            {
                return Err(MarketError::DuplicateOpenOffer {
                    listing_id,
                    buyer_id,
                });
            }

            let id = OfferId::new();
            let offer = Offer::new(
                id,
                listing_id,
                buyer_id,
                listing.seller_id,
                amount,
                message,
                is_buy_now,
                now,
                self.config.offer_ttl(),
            )?;
            offers.insert(id, offer);
            id
        };

        tracing::info!(offer_id = %id, listing_id = %listing_id, amount, is_buy_now, "offer created");
        events.push(MarketEvent::OfferCreated {
            offer_id: id,
            listing_id,
            buyer_id,
            amount,
            is_buy_now,
        });
        self.emit_all(events);
        Ok(id)
    }

    /// The seller counters (or re-counters) an offer.
    ///
    /// # Errors
    ///
    /// Fails when the actor is not the listing's seller, and for unknown,
    /// expired, terminal, or Buy-Now offers, and for a zero counter amount.
    pub fn counter_offer(
        &self,
        offer_id: OfferId,
        actor: OfferActor,
        amount: u64,
        message: Option<String>,
    ) -> Result<()> {
        let now = self.now();
        let mut events = Vec::new();

        let result = {
            let mut offers = self.offers.write();
            match offers.get_mut(&offer_id) {
                None => Err(MarketError::OfferNotFound(offer_id)),
                Some(offer) => {
                    if offer.expire_if_due(now) {
                        events.push(MarketEvent::OfferExpired {
                            offer_id,
                            cause: mcx_offer::ExpiryCause::DeadlinePassed,
                        });
                    }
                    if matches!(actor, OfferActor::Seller(id) if id == offer.seller_id) {
                        offer.counter(amount, message, now).map_err(Into::into)
                    } else {
                        Err(MarketError::Unauthorized {
                            role: actor.role(),
                            operation: "counter this offer".to_string(),
                        })
                    }
                }
            }
        };

        if result.is_ok() {
            events.push(MarketEvent::OfferCountered {
                offer_id,
                counter_amount: amount,
            });
            tracing::info!(offer_id = %offer_id, counter_amount = amount, "offer countered");
        }
        self.emit_all(events);
        result
    }

    /// Accept an offer and open its transaction room.
    ///
    /// Who may accept depends on where the negotiation stands: the seller
    /// accepts a pending offer, the buyer accepts a counter, and the admin
    /// approves Buy-Now. On success, atomically: the offer is accepted at
    /// the agreed price, the listing is reserved, every competing open
    /// offer on the listing is expired, and a room opens in
    /// `AwaitingDeposit` with the deposit set from the configured
    /// percentage.
    ///
    /// The listing's status is checked before the offer is touched, so
    /// when two acceptances race, the loser fails with a state conflict
    /// and its offer is left unchanged.
    ///
    /// # Errors
    ///
    /// Fails for unknown or expired offers, a non-active listing, an actor
    /// that is not the accepting party for the offer's current state, or
    /// an acceptance path that does not match the offer variant.
    pub fn accept_offer(&self, offer_id: OfferId, actor: OfferActor) -> Result<RoomId> {
        let now = self.now();
        let mut events = Vec::new();

        let result = self.accept_offer_locked(offer_id, actor, now, &mut events);
        if let Ok((room_id, agreed)) = &result {
            tracing::info!(offer_id = %offer_id, room_id = %room_id, agreed_price = agreed, "offer accepted");
        }
        self.emit_all(events);
        result.map(|(room_id, _)| room_id)
    }

    /// The guarded body of [`Self::accept_offer`]. Every guard it takes is
    /// dropped before the caller emits `events`.
    fn accept_offer_locked(
        &self,
        offer_id: OfferId,
        actor: OfferActor,
        now: DateTime<Utc>,
        events: &mut Vec<MarketEvent>,
    ) -> Result<(RoomId, u64)> {
        let mut listings = self.listings.write();
        let mut offers = self.offers.write();
        let mut rooms = self.rooms.write();

        let (listing_id, buyer_id, seller_id, countered) = {
            let offer = offers
                .get_mut(&offer_id)
                .ok_or(MarketError::OfferNotFound(offer_id))?;
            if offer.expire_if_due(now) {
                events.push(MarketEvent::OfferExpired {
                    offer_id,
                    cause: mcx_offer::ExpiryCause::DeadlinePassed,
                });
                return Err(mcx_offer::OfferError::Expired.into());
            }
            (
                offer.listing_id,
                offer.buyer_id,
                offer.seller_id,
                offer.status == OfferStatus::Countered,
            )
        };

        let listing = listings
            .get_mut(&listing_id)
            .ok_or(MarketError::ListingNotFound(listing_id))?;
        // Checked before the offer mutates: a losing racer's offer
        // keeps its state.
        if listing.status != ListingStatus::Active {
            return Err(MarketError::ListingNotActive {
                listing_id,
                status: listing.status.to_string(),
            });
        }

        let via = match actor {
            OfferActor::Admin => AcceptedVia::AdminApproval,
            OfferActor::Buyer(id) if countered && id == buyer_id => AcceptedVia::SellerAcceptance,
            OfferActor::Seller(id) if !countered && id == seller_id => {
                AcceptedVia::SellerAcceptance
            }
            _ => {
                return Err(MarketError::Unauthorized {
                    role: actor.role(),
                    operation: "accept this offer".to_string(),
                })
            }
        };

        let agreed = {
            let offer = offers
                .get_mut(&offer_id)
                .ok_or(MarketError::OfferNotFound(offer_id))?;
            offer.accept(via, now)?
        };

        let room_id = RoomId::new();
        listing.reserve(room_id, now)?;

        for other in offers
            .values_mut()
            .filter(|o| o.listing_id == listing_id && o.id != offer_id && o.is_open())
        {
            other.expire_for_reservation(now)?;
            events.push(MarketEvent::OfferExpired {
                offer_id: other.id,
                cause: mcx_offer::ExpiryCause::ListingReserved,
            });
        }

        let deposit = self.config.deposit_for(agreed);
        rooms.insert(
            room_id,
            TransactionRoom::new(
                room_id, offer_id, listing_id, buyer_id, seller_id, agreed, deposit, now,
            ),
        );

        events.push(MarketEvent::OfferAccepted {
            offer_id,
            via,
            agreed_price: agreed,
            room_id,
        });
        events.push(MarketEvent::ListingReserved {
            listing_id,
            room_id,
        });
        Ok((room_id, agreed))
    }

    /// The seller (or the admin, for Buy-Now) declines an offer.
    ///
    /// # Errors
    ///
    /// Fails when the actor is not the declining party for the offer's
    /// variant, and for unknown, expired, or terminal offers.
    pub fn reject_offer(&self, offer_id: OfferId, actor: OfferActor) -> Result<()> {
        let now = self.now();
        let mut events = Vec::new();

        let result = {
            let mut offers = self.offers.write();
            match offers.get_mut(&offer_id) {
                None => Err(MarketError::OfferNotFound(offer_id)),
                Some(offer) => {
                    if offer.expire_if_due(now) {
                        events.push(MarketEvent::OfferExpired {
                            offer_id,
                            cause: mcx_offer::ExpiryCause::DeadlinePassed,
                        });
                    }
                    let permitted = match actor {
                        OfferActor::Admin => offer.is_buy_now,
                        OfferActor::Seller(id) => !offer.is_buy_now && id == offer.seller_id,
                        OfferActor::Buyer(_) => false,
                    };
                    if permitted {
                        offer.reject(now).map_err(Into::into)
                    } else {
                        Err(MarketError::Unauthorized {
                            role: actor.role(),
                            operation: "decline this offer".to_string(),
                        })
                    }
                }
            }
        };

        if result.is_ok() {
            events.push(MarketEvent::OfferRejected { offer_id });
            tracing::info!(offer_id = %offer_id, "offer rejected");
        }
        self.emit_all(events);
        result
    }

    /// The buyer withdraws their own offer.
    ///
    /// # Errors
    ///
    /// Fails when the actor is not the offer's buyer, and for unknown,
    /// expired, or terminal offers.
    pub fn withdraw_offer(&self, offer_id: OfferId, actor: OfferActor) -> Result<()> {
        let now = self.now();
        let mut events = Vec::new();

        let result = {
            let mut offers = self.offers.write();
            match offers.get_mut(&offer_id) {
                None => Err(MarketError::OfferNotFound(offer_id)),
                Some(offer) => {
                    if offer.expire_if_due(now) {
                        events.push(MarketEvent::OfferExpired {
                            offer_id,
                            cause: mcx_offer::ExpiryCause::DeadlinePassed,
                        });
                    }
                    if matches!(actor, OfferActor::Buyer(id) if id == offer.buyer_id) {
                        offer.withdraw(now).map_err(Into::into)
                    } else {
                        Err(MarketError::Unauthorized {
                            role: actor.role(),
                            operation: "withdraw this offer".to_string(),
                        })
                    }
                }
            }
        };

        if result.is_ok() {
            events.push(MarketEvent::OfferWithdrawn { offer_id });
            tracing::info!(offer_id = %offer_id, "offer withdrawn");
        }
        self.emit_all(events);
        result
    }

    /// A snapshot of an offer as of now.
    ///
    /// The snapshot's status reflects an overdue deadline the same way
    /// [`Self::offer_status`] does, even before any write materializes the
    /// expiry on the stored offer.
    ///
    /// # Errors
    ///
    /// Fails if the offer is unknown.
    pub fn get_offer(&self, offer_id: OfferId) -> Result<Offer> {
        let now = self.now();
        self.offers
            .read()
            .get(&offer_id)
            .map(|o| {
                let mut snapshot = o.clone();
                snapshot.status = o.effective_status(now);
                snapshot
            })
            .ok_or(MarketError::OfferNotFound(offer_id))
    }

    /// An offer's status as of now, reporting `Expired` for overdue
    /// offers even before any write materializes the transition.
    ///
    /// # Errors
    ///
    /// Fails if the offer is unknown.
    pub fn offer_status(&self, offer_id: OfferId) -> Result<OfferStatus> {
        let now = self.now();
        self.offers
            .read()
            .get(&offer_id)
            .map(|o| o.effective_status(now))
            .ok_or(MarketError::OfferNotFound(offer_id))
    }

    // ---- Transaction rooms -------------------------------------------

    /// Advance a transaction room by one action.
    ///
    /// Completion and cancellation carry cross-aggregate effects, applied
    /// under the same guards as the room transition:
    /// - `Completed`: the listing is marked sold and the buyer receives a
    ///   permanent unlock record for it.
    /// - `Cancelled`: the listing's reservation is released, and still-open
    ///   offers on it are re-checked against their deadlines.
    ///
    /// # Errors
    ///
    /// Fails if the room is unknown, the role may not take the action, or
    /// the room's state does not allow it. The room is unchanged on error.
    pub fn advance_transaction(
        &self,
        room_id: RoomId,
        action: RoomAction,
        role: ActorRole,
    ) -> Result<RoomStatus> {
        let now = self.now();
        let mut events = Vec::new();

        let status = {
            let mut listings = self.listings.write();
            let mut offers = self.offers.write();
            let mut rooms = self.rooms.write();
            let mut unlocks = self.unlocks.write();

            let room = rooms
                .get_mut(&room_id)
                .ok_or(MarketError::RoomNotFound(room_id))?;
            let status = room.advance(action, role, now)?;
            events.push(MarketEvent::RoomAdvanced {
                room_id,
                action,
                role,
                status,
            });

            match status {
                RoomStatus::Completed => {
                    let listing = listings
                        .get_mut(&room.listing_id)
                        .ok_or(MarketError::ListingNotFound(room.listing_id))?;
                    listing.mark_sold(now)?;
                    unlocks.grant(
                        room.buyer_id,
                        room.listing_id,
                        UnlockSource::CompletedTransaction,
                        now,
                    );
                    events.push(MarketEvent::RoomCompleted {
                        room_id,
                        listing_id: room.listing_id,
                        buyer_id: room.buyer_id,
                        agreed_price: room.agreed_price,
                    });
                    events.push(MarketEvent::ListingSold {
                        listing_id: room.listing_id,
                        room_id,
                    });
                    events.push(MarketEvent::ListingUnlocked {
                        buyer_id: room.buyer_id,
                        listing_id: room.listing_id,
                        source: UnlockSource::CompletedTransaction,
                    });
                }
                RoomStatus::Cancelled => {
                    let listing = listings
                        .get_mut(&room.listing_id)
                        .ok_or(MarketError::ListingNotFound(room.listing_id))?;
                    listing.release(now)?;
                    events.push(MarketEvent::RoomCancelled {
                        room_id,
                        listing_id: room.listing_id,
                    });
                    events.push(MarketEvent::ListingReleased {
                        listing_id: room.listing_id,
                    });
                    // Offers already expired by the reservation stay
                    // expired; only still-open ones get their deadlines
                    // re-checked.
                    for offer in offers
                        .values_mut()
                        .filter(|o| o.listing_id == room.listing_id && o.is_open())
                    {
                        if offer.expire_if_due(now) {
                            events.push(MarketEvent::OfferExpired {
                                offer_id: offer.id,
                                cause: mcx_offer::ExpiryCause::DeadlinePassed,
                            });
                        }
                    }
                }
                RoomStatus::Disputed => {
                    events.push(MarketEvent::RoomDisputed { room_id });
                }
                _ => {}
            }
            status
        };

        tracing::info!(room_id = %room_id, action = %action, role = %role, status = %status, "room advanced");
        self.emit_all(events);
        Ok(status)
    }

    /// Post a message to a room's ordered log.
    ///
    /// # Errors
    ///
    /// Fails if the room is unknown or closed.
    pub fn post_room_message(
        &self,
        room_id: RoomId,
        author_role: ActorRole,
        body: impl Into<String>,
    ) -> Result<()> {
        let now = self.now();
        let mut rooms = self.rooms.write();
        rooms
            .get_mut(&room_id)
            .ok_or(MarketError::RoomNotFound(room_id))?
            .post_message(author_role, body, now)?;
        Ok(())
    }

    /// Attach an externally stored document to a room.
    ///
    /// # Errors
    ///
    /// Fails if the room is unknown or closed.
    pub fn attach_room_document(
        &self,
        room_id: RoomId,
        document_id: impl Into<String>,
    ) -> Result<()> {
        let now = self.now();
        let mut rooms = self.rooms.write();
        rooms
            .get_mut(&room_id)
            .ok_or(MarketError::RoomNotFound(room_id))?
            .attach_document(document_id, now)?;
        Ok(())
    }

    /// A snapshot of a transaction room.
    ///
    /// # Errors
    ///
    /// Fails if the room is unknown.
    pub fn get_room(&self, room_id: RoomId) -> Result<TransactionRoom> {
        self.rooms
            .read()
            .get(&room_id)
            .cloned()
            .ok_or(MarketError::RoomNotFound(room_id))
    }

    // ---- Credits and unlocks -----------------------------------------

    /// A buyer purchases credits.
    ///
    /// # Errors
    ///
    /// Fails for non-positive amounts.
    pub fn purchase_credits(&self, buyer_id: BuyerId, amount: i64) -> Result<()> {
        let now = self.now();
        self.ledger
            .write()
            .credit(buyer_id, EntryKind::Purchase, amount, None, now)?;
        tracing::info!(buyer_id = %buyer_id, amount, "credits purchased");
        self.emit_all(vec![MarketEvent::CreditsPurchased { buyer_id, amount }]);
        Ok(())
    }

    /// The platform grants promotional credits.
    ///
    /// # Errors
    ///
    /// Fails if the caller is not the admin or the amount is non-positive.
    pub fn grant_bonus_credits(
        &self,
        role: ActorRole,
        buyer_id: BuyerId,
        amount: i64,
        note: Option<String>,
    ) -> Result<()> {
        Self::require_admin(role, "grant bonus credits")?;
        let now = self.now();
        self.ledger
            .write()
            .credit(buyer_id, EntryKind::Bonus, amount, note, now)?;
        tracing::info!(buyer_id = %buyer_id, amount, "bonus credits granted");
        self.emit_all(vec![MarketEvent::CreditsGranted { buyer_id, amount }]);
        Ok(())
    }

    /// An admin returns credits to a buyer.
    ///
    /// # Errors
    ///
    /// Fails if the caller is not the admin or the amount is non-positive.
    pub fn refund_credits(
        &self,
        role: ActorRole,
        buyer_id: BuyerId,
        amount: i64,
        note: Option<String>,
    ) -> Result<()> {
        Self::require_admin(role, "refund credits")?;
        let now = self.now();
        self.ledger
            .write()
            .credit(buyer_id, EntryKind::Refund, amount, note, now)?;
        tracing::info!(buyer_id = %buyer_id, amount, "credits refunded");
        self.emit_all(vec![MarketEvent::CreditsRefunded { buyer_id, amount }]);
        Ok(())
    }

    /// A buyer's available credit balance.
    #[must_use]
    pub fn get_credit_balance(&self, buyer_id: BuyerId) -> i64 {
        self.ledger.read().balance(buyer_id)
    }

    /// A buyer's ledger history, in append order.
    #[must_use]
    pub fn credit_history(&self, buyer_id: BuyerId) -> Vec<CreditEntry> {
        self.ledger
            .read()
            .entries_for(buyer_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Unlock a listing's sensitive fields for a buyer.
    ///
    /// Idempotent: a buyer who already holds an unlock record gets it back
    /// with no charge, even for premium listings. Otherwise one credit
    /// (per configuration) is debited and the record written, atomically.
    /// Premium listings are never credit-unlockable; a contact request is
    /// recorded for admin mediation and a distinct error returned.
    ///
    /// # Errors
    ///
    /// Fails if the listing is unknown, the listing is premium, or the
    /// buyer's balance cannot cover the cost. No charge and no record on
    /// any failure.
    pub fn unlock_listing(&self, buyer_id: BuyerId, listing_id: ListingId) -> Result<UnlockRecord> {
        let now = self.now();

        let is_premium = {
            let listings = self.listings.read();
            listings
                .get(&listing_id)
                .ok_or(MarketError::ListingNotFound(listing_id))?
                .is_premium
        };

        // Debit and record commit or fail together under these guards.
        let mut ledger = self.ledger.write();
        let mut unlocks = self.unlocks.write();

        let cost = self.config.unlock_cost;
        let decision = evaluate_unlock(
            unlocks.is_unlocked(buyer_id, listing_id),
            is_premium,
            ledger.balance(buyer_id),
            cost,
        );

        match decision {
            UnlockDecision::AlreadyUnlocked => {
                let record = unlocks
                    .get(buyer_id, listing_id)
                    .cloned()
                    .ok_or(MarketError::ListingNotFound(listing_id))?;
                Ok(record)
            }
            UnlockDecision::Debit => {
                ledger.debit_usage(buyer_id, listing_id, cost, now)?;
                let record = unlocks
                    .grant(buyer_id, listing_id, UnlockSource::CreditDebit, now)
                    .clone();
                drop(unlocks);
                drop(ledger);

                tracing::info!(buyer_id = %buyer_id, listing_id = %listing_id, cost, "listing unlocked");
                self.emit_all(vec![
                    MarketEvent::CreditsDebited {
                        buyer_id,
                        listing_id,
                        amount: cost,
                    },
                    MarketEvent::ListingUnlocked {
                        buyer_id,
                        listing_id,
                        source: UnlockSource::CreditDebit,
                    },
                ]);
                Ok(record)
            }
            UnlockDecision::PremiumContactRequired => {
                drop(unlocks);
                drop(ledger);
                self.contact_requests.write().push(ContactRequest {
                    buyer_id,
                    listing_id,
                    requested_at: now,
                });
                tracing::info!(buyer_id = %buyer_id, listing_id = %listing_id, "premium contact requested");
                self.emit_all(vec![MarketEvent::ContactRequested {
                    buyer_id,
                    listing_id,
                }]);
                Err(MarketError::PremiumNotEligible(listing_id))
            }
            UnlockDecision::InsufficientCredits { available } => {
                Err(mcx_ledger::LedgerError::InsufficientCredits {
                    required: cost,
                    available,
                }
                .into())
            }
        }
    }

    /// Pending contact requests for premium listings, in arrival order.
    #[must_use]
    pub fn contact_requests(&self) -> Vec<ContactRequest> {
        self.contact_requests.read().clone()
    }

    /// Aggregate counts across all stores.
    #[must_use]
    pub fn stats(&self) -> MarketStats {
        MarketStats {
            listings: self.listings.read().len(),
            offers: self.offers.read().len(),
            rooms: self.rooms.read().len(),
            ledger_entries: self.ledger.read().len(),
            unlocks: self.unlocks.read().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::RecordingEventSink;
    use chrono::Duration;
    use mcx_core::SellerId;
    use mcx_listing::Visibility;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn market() -> (Marketplace, Arc<ManualClock>, Arc<RecordingEventSink>) {
        let clock = Arc::new(ManualClock::new(start()));
        let sink = Arc::new(RecordingEventSink::new());
        let market = Marketplace::new(EngineConfig::default(), clock.clone(), sink.clone());
        (market, clock, sink)
    }

    fn draft(asking_price: u64) -> ListingDraft {
        ListingDraft {
            seller_id: SellerId::new(),
            mc_number: "MC-123456".to_string(),
            dot_number: "7654321".to_string(),
            legal_name: "Acme Hauling LLC".to_string(),
            contact_email: "ops@acmehauling.example".to_string(),
            asking_price,
            visibility: Visibility::Public,
            is_premium: None,
            trust_score: 85,
        }
    }

    fn active_listing(market: &Marketplace, asking_price: u64) -> ListingId {
        let id = market.submit_listing(&draft(asking_price)).expect("submit");
        market
            .approve_listing(ActorRole::Admin, id, None, None)
            .expect("approve");
        id
    }

    fn seller_of(market: &Marketplace, listing: ListingId) -> SellerId {
        market.get_listing(listing).expect("listing").seller_id
    }

    #[test]
    fn test_submit_and_approve() {
        let (market, _, sink) = market();
        let id = market.submit_listing(&draft(42_000)).expect("submit");

        let listing = market.get_listing(id).expect("listing");
        assert_eq!(listing.status, ListingStatus::PendingVerification);
        assert!(!listing.is_premium);

        market
            .approve_listing(ActorRole::Admin, id, Some(45_000), None)
            .expect("approve");
        let listing = market.get_listing(id).expect("listing");
        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.buyer_price(), 45_000);

        let events = sink.events();
        assert!(matches!(events[0], MarketEvent::ListingSubmitted { .. }));
        assert!(matches!(
            events[1],
            MarketEvent::ListingApproved { price: 45_000, .. }
        ));
    }

    #[test]
    fn test_premium_defaults_from_threshold() {
        let (market, _, _) = market();
        let cheap = market.submit_listing(&draft(42_000)).expect("submit");
        let pricey = market.submit_listing(&draft(150_000)).expect("submit");

        assert!(!market.get_listing(cheap).expect("listing").is_premium);
        assert!(market.get_listing(pricey).expect("listing").is_premium);
    }

    #[test]
    fn test_explicit_premium_flag_wins() {
        let (market, _, _) = market();
        let mut d = draft(200_000);
        d.is_premium = Some(false);
        let id = market.submit_listing(&d).expect("submit");
        assert!(!market.get_listing(id).expect("listing").is_premium);
    }

    #[test]
    fn test_approve_requires_admin() {
        let (market, _, _) = market();
        let id = market.submit_listing(&draft(42_000)).expect("submit");

        let err = market
            .approve_listing(ActorRole::Seller, id, None, None)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);
    }

    #[test]
    fn test_reject_requires_reason() {
        let (market, _, _) = market();
        let id = market.submit_listing(&draft(42_000)).expect("submit");

        assert!(market.reject_listing(ActorRole::Admin, id, "  ").is_err());
        market
            .reject_listing(ActorRole::Admin, id, "docket mismatch")
            .expect("reject");
        assert_eq!(
            market.get_listing(id).expect("listing").status,
            ListingStatus::Suspended
        );
    }

    #[test]
    fn test_offer_on_inactive_listing_is_conflict() {
        let (market, _, _) = market();
        let id = market.submit_listing(&draft(42_000)).expect("submit");

        let err = market
            .create_offer(id, BuyerId::new(), 40_000, None, false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StateConflict);
    }

    #[test]
    fn test_duplicate_open_offer_rejected() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        market
            .create_offer(listing, buyer, 40_000, None, false)
            .expect("first");
        let err = market
            .create_offer(listing, buyer, 41_000, None, false)
            .unwrap_err();
        assert!(matches!(err, MarketError::DuplicateOpenOffer { .. }));

        // A different buyer is unaffected
        market
            .create_offer(listing, BuyerId::new(), 41_000, None, false)
            .expect("other buyer");
    }

    #[test]
    fn test_stale_offer_does_not_block_fresh_one() {
        let (market, clock, _) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        let first = market
            .create_offer(listing, buyer, 40_000, None, false)
            .expect("first");
        clock.advance(Duration::hours(73));

        let second = market
            .create_offer(listing, buyer, 41_000, None, false)
            .expect("second after expiry");
        assert_ne!(first, second);
        assert_eq!(
            market.get_offer(first).expect("offer").status,
            OfferStatus::Expired
        );
    }

    #[test]
    fn test_buy_now_must_match_price() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);

        let err = market
            .create_offer(listing, BuyerId::new(), 40_000, None, true)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);

        market
            .create_offer(listing, BuyerId::new(), 42_000, None, true)
            .expect("exact price");
    }

    #[test]
    fn test_counter_then_accept_flow() {
        let (market, _, sink) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        let offer = market
            .create_offer(listing, buyer, 42_000, None, false)
            .expect("offer");
        let seller = seller_of(&market, listing);
        market
            .counter_offer(
                offer,
                OfferActor::Seller(seller),
                44_000,
                Some("firm at 44".to_string()),
            )
            .expect("counter");

        let room_id = market
            .accept_offer(offer, OfferActor::Buyer(buyer))
            .expect("accept");

        let room = market.get_room(room_id).expect("room");
        assert_eq!(room.status, RoomStatus::AwaitingDeposit);
        assert_eq!(room.agreed_price, 44_000);
        assert_eq!(room.deposit_amount, 4_400);

        let listing = market.get_listing(listing).expect("listing");
        assert_eq!(listing.status, ListingStatus::Reserved);
        assert_eq!(listing.active_room, Some(room_id));

        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, MarketEvent::OfferAccepted { agreed_price: 44_000, .. })));
    }

    #[test]
    fn test_acceptance_expires_competing_offers() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);

        let winner = market
            .create_offer(listing, BuyerId::new(), 41_000, None, false)
            .expect("winner");
        let loser = market
            .create_offer(listing, BuyerId::new(), 40_000, None, false)
            .expect("loser");

        market
            .accept_offer(winner, OfferActor::Seller(seller_of(&market, listing)))
            .expect("accept");

        let loser = market.get_offer(loser).expect("offer");
        assert_eq!(loser.status, OfferStatus::Expired);
        assert_eq!(
            loser.expiry_cause,
            Some(mcx_offer::ExpiryCause::ListingReserved)
        );
    }

    #[test]
    fn test_second_acceptance_loses_cleanly() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);

        let first = market
            .create_offer(listing, BuyerId::new(), 41_000, None, false)
            .expect("first");
        let second = market
            .create_offer(listing, BuyerId::new(), 40_000, None, false)
            .expect("second");

        let seller = seller_of(&market, listing);
        market
            .accept_offer(first, OfferActor::Seller(seller))
            .expect("accept");
        let err = market
            .accept_offer(second, OfferActor::Seller(seller))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StateConflict);

        // The loser's offer was expired by the reservation, not mangled by
        // the failed acceptance
        let second = market.get_offer(second).expect("offer");
        assert_eq!(second.status, OfferStatus::Expired);
        assert!(second.accepted_via.is_none());
    }

    #[test]
    fn test_buy_now_needs_admin_path() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);

        let offer = market
            .create_offer(listing, BuyerId::new(), 42_000, None, true)
            .expect("buy now");

        assert!(market
            .accept_offer(offer, OfferActor::Seller(seller_of(&market, listing)))
            .is_err());
        market
            .accept_offer(offer, OfferActor::Admin)
            .expect("admin approval");
    }

    #[test]
    fn test_full_transaction_to_completion() {
        let (market, _, sink) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        let offer = market
            .create_offer(listing, buyer, 42_000, None, false)
            .expect("offer");
        let room = market
            .accept_offer(offer, OfferActor::Seller(seller_of(&market, listing)))
            .expect("accept");

        for (action, role) in [
            (RoomAction::PayDeposit, ActorRole::Buyer),
            (RoomAction::Approve, ActorRole::Buyer),
            (RoomAction::Approve, ActorRole::Seller),
            (RoomAction::Approve, ActorRole::Admin),
            (RoomAction::RequestFinalPayment, ActorRole::Admin),
            (RoomAction::PayFinal, ActorRole::Buyer),
        ] {
            market.advance_transaction(room, action, role).expect("advance");
        }

        let status = market
            .advance_transaction(room, RoomAction::Complete, ActorRole::Admin)
            .expect("complete");
        assert_eq!(status, RoomStatus::Completed);

        // Listing sold, buyer permanently unlocked, all without credits
        assert_eq!(
            market.get_listing(listing).expect("listing").status,
            ListingStatus::Sold
        );
        let record = market.unlock_listing(buyer, listing).expect("unlock");
        assert_eq!(record.source, UnlockSource::CompletedTransaction);
        assert_eq!(market.get_credit_balance(buyer), 0);

        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, MarketEvent::ListingSold { .. })));
    }

    #[test]
    fn test_complete_without_admin_approval_is_conflict() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);

        let offer = market
            .create_offer(listing, BuyerId::new(), 42_000, None, false)
            .expect("offer");
        let room = market
            .accept_offer(offer, OfferActor::Seller(seller_of(&market, listing)))
            .expect("accept");

        market
            .advance_transaction(room, RoomAction::PayDeposit, ActorRole::Buyer)
            .expect("deposit");
        market
            .advance_transaction(room, RoomAction::Approve, ActorRole::Buyer)
            .expect("buyer");
        market
            .advance_transaction(room, RoomAction::Approve, ActorRole::Seller)
            .expect("seller");

        let err = market
            .advance_transaction(room, RoomAction::Complete, ActorRole::Admin)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StateConflict);
        // Room and listing are untouched by the failed completion
        assert_eq!(
            market.get_room(room).expect("room").status,
            RoomStatus::BothApproved
        );
        assert_eq!(
            market.get_listing(listing).expect("listing").status,
            ListingStatus::Reserved
        );
    }

    #[test]
    fn test_cancel_releases_listing() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);

        let offer = market
            .create_offer(listing, BuyerId::new(), 42_000, None, false)
            .expect("offer");
        let room = market
            .accept_offer(offer, OfferActor::Seller(seller_of(&market, listing)))
            .expect("accept");

        market
            .advance_transaction(room, RoomAction::Cancel, ActorRole::Seller)
            .expect("cancel");

        let listing = market.get_listing(listing).expect("listing");
        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.active_room, None);
    }

    #[test]
    fn test_cancel_does_not_revive_reservation_expired_offers() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);

        let winner = market
            .create_offer(listing, BuyerId::new(), 41_000, None, false)
            .expect("winner");
        let bystander = market
            .create_offer(listing, BuyerId::new(), 40_000, None, false)
            .expect("bystander");

        let room = market
            .accept_offer(winner, OfferActor::Seller(seller_of(&market, listing)))
            .expect("accept");
        market
            .advance_transaction(room, RoomAction::Cancel, ActorRole::Buyer)
            .expect("cancel");

        assert_eq!(
            market.get_offer(bystander).expect("offer").status,
            OfferStatus::Expired
        );
    }

    #[test]
    fn test_unlock_debits_once() {
        let (market, _, sink) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        market.purchase_credits(buyer, 1).expect("purchase");
        let record = market.unlock_listing(buyer, listing).expect("unlock");
        assert_eq!(record.source, UnlockSource::CreditDebit);
        assert_eq!(market.get_credit_balance(buyer), 0);

        // Second unlock is free and returns the same record
        let again = market.unlock_listing(buyer, listing).expect("again");
        assert_eq!(again.granted_at, record.granted_at);
        assert_eq!(market.get_credit_balance(buyer), 0);

        let debits = sink
            .events()
            .iter()
            .filter(|e| matches!(e, MarketEvent::CreditsDebited { .. }))
            .count();
        assert_eq!(debits, 1);
    }

    #[test]
    fn test_unlock_without_credits_is_exhausted() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        let err = market.unlock_listing(buyer, listing).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ResourceExhausted);
        // No record, no charge
        assert!(market.unlock_listing(buyer, listing).is_err());
        assert_eq!(market.get_credit_balance(buyer), 0);
    }

    #[test]
    fn test_premium_unlock_records_contact_request() {
        let (market, _, sink) = market();
        let listing = active_listing(&market, 200_000);
        let buyer = BuyerId::new();
        market.purchase_credits(buyer, 5).expect("purchase");

        let err = market.unlock_listing(buyer, listing).unwrap_err();
        assert!(matches!(err, MarketError::PremiumNotEligible(_)));
        // Balance untouched, request queued for the admin
        assert_eq!(market.get_credit_balance(buyer), 5);
        assert_eq!(market.contact_requests().len(), 1);
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, MarketEvent::ContactRequested { .. })));
    }

    #[test]
    fn test_view_listing_discloses_after_unlock() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        let view = market.view_listing(buyer, listing).expect("view");
        assert!(view.disclosure.is_none());
        assert_eq!(view.card.masked_mc_number, "MC-12••••");

        market.purchase_credits(buyer, 1).expect("purchase");
        market.unlock_listing(buyer, listing).expect("unlock");

        let view = market.view_listing(buyer, listing).expect("view");
        let disclosure = view.disclosure.expect("disclosure");
        assert_eq!(disclosure.mc_number, "MC-123456");
        assert_eq!(view.card.view_count, 2);
    }

    #[test]
    fn test_browse_hides_non_active() {
        let (market, _, _) = market();
        let active = active_listing(&market, 42_000);
        let pending = market.submit_listing(&draft(50_000)).expect("submit");

        let cards = market.browse_listings();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, active);
        assert_ne!(cards[0].id, pending);
    }

    #[test]
    fn test_offer_status_reports_lazy_expiry() {
        let (market, clock, _) = market();
        let listing = active_listing(&market, 42_000);

        let offer = market
            .create_offer(listing, BuyerId::new(), 40_000, None, false)
            .expect("offer");
        assert_eq!(market.offer_status(offer).expect("status"), OfferStatus::Pending);

        clock.advance(Duration::hours(73));
        // Both reads report expired before any write materializes it; the
        // snapshot carries no expiry cause because nothing was written
        assert_eq!(market.offer_status(offer).expect("status"), OfferStatus::Expired);
        let snapshot = market.get_offer(offer).expect("offer");
        assert_eq!(snapshot.status, OfferStatus::Expired);
        assert!(snapshot.expiry_cause.is_none());
    }

    #[test]
    fn test_withdraw_requires_owning_buyer() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        let offer = market
            .create_offer(listing, buyer, 40_000, None, false)
            .expect("offer");

        let err = market
            .withdraw_offer(offer, OfferActor::Buyer(BuyerId::new()))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);
        let err = market
            .withdraw_offer(offer, OfferActor::Seller(seller_of(&market, listing)))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);
        assert_eq!(
            market.get_offer(offer).expect("offer").status,
            OfferStatus::Pending
        );

        market
            .withdraw_offer(offer, OfferActor::Buyer(buyer))
            .expect("owning buyer withdraws");
    }

    #[test]
    fn test_counter_requires_listing_seller() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();

        let offer = market
            .create_offer(listing, buyer, 40_000, None, false)
            .expect("offer");

        let err = market
            .counter_offer(offer, OfferActor::Seller(SellerId::new()), 44_000, None)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);
        let err = market
            .counter_offer(offer, OfferActor::Buyer(buyer), 44_000, None)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);

        market
            .counter_offer(offer, OfferActor::Seller(seller_of(&market, listing)), 44_000, None)
            .expect("listing seller counters");
    }

    #[test]
    fn test_reject_path_depends_on_offer_variant() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);
        let seller = seller_of(&market, listing);

        // Ordinary offers are the seller's to decline, not the admin's
        let ordinary = market
            .create_offer(listing, BuyerId::new(), 40_000, None, false)
            .expect("ordinary");
        let err = market.reject_offer(ordinary, OfferActor::Admin).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);
        market
            .reject_offer(ordinary, OfferActor::Seller(seller))
            .expect("seller declines");

        // Buy-Now sits with the admin, not the seller
        let buy_now = market
            .create_offer(listing, BuyerId::new(), 42_000, None, true)
            .expect("buy now");
        let err = market
            .reject_offer(buy_now, OfferActor::Seller(seller))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);
        market
            .reject_offer(buy_now, OfferActor::Admin)
            .expect("admin declines");
    }

    #[test]
    fn test_accept_requires_matching_party() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();
        let seller = seller_of(&market, listing);

        let offer = market
            .create_offer(listing, buyer, 40_000, None, false)
            .expect("offer");

        // A pending offer is the seller's to accept
        let err = market
            .accept_offer(offer, OfferActor::Buyer(buyer))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);
        let err = market
            .accept_offer(offer, OfferActor::Seller(SellerId::new()))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);

        // Once countered, acceptance moves to the buyer
        market
            .counter_offer(offer, OfferActor::Seller(seller), 44_000, None)
            .expect("counter");
        let err = market
            .accept_offer(offer, OfferActor::Seller(seller))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);

        market
            .accept_offer(offer, OfferActor::Buyer(buyer))
            .expect("buyer accepts the counter");
    }

    #[test]
    fn test_stats() {
        let (market, _, _) = market();
        let listing = active_listing(&market, 42_000);
        let buyer = BuyerId::new();
        market.purchase_credits(buyer, 2).expect("purchase");
        market.unlock_listing(buyer, listing).expect("unlock");
        market
            .create_offer(listing, buyer, 40_000, None, false)
            .expect("offer");

        let stats = market.stats();
        assert_eq!(stats.listings, 1);
        assert_eq!(stats.offers, 1);
        assert_eq!(stats.rooms, 0);
        assert_eq!(stats.ledger_entries, 2);
        assert_eq!(stats.unlocks, 1);
    }
}

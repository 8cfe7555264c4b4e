//! MCX marketplace engine.
//!
//! Ties the aggregate crates together behind one operation surface: listing
//! verification, offer negotiation, transaction rooms, the credit ledger,
//! and the unlock gate. All state is in memory; persistence and transport
//! sit outside this crate.
//!
//! # Example
//!
//! ```
//! use mcx_engine::Marketplace;
//! use mcx_core::{ActorRole, SellerId};
//! use mcx_listing::{ListingDraft, Visibility};
//!
//! let market = Marketplace::with_defaults();
//! let draft = ListingDraft {
//!     seller_id: SellerId::new(),
//!     mc_number: "MC-123456".to_string(),
//!     dot_number: "7654321".to_string(),
//!     legal_name: "Acme Hauling LLC".to_string(),
//!     contact_email: "ops@acmehauling.example".to_string(),
//!     asking_price: 42_000,
//!     visibility: Visibility::Public,
//!     is_premium: None,
//!     trust_score: 85,
//! };
//! let listing_id = market.submit_listing(&draft).expect("valid draft");
//! market
//!     .approve_listing(ActorRole::Admin, listing_id, None, None)
//!     .expect("pending listing");
//! ```

mod clock;
mod config;
mod error;
mod event;
mod marketplace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{ErrorKind, MarketError, Result};
pub use event::{
    ContactRequest, EventSink, MarketEvent, NoopEventSink, RecordingEventSink, TracingEventSink,
};
pub use marketplace::{Disclosure, ListingView, MarketStats, Marketplace, OfferActor};

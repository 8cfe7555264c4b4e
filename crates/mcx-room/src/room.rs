//! The transaction room entity and its workflow state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mcx_core::{ActorRole, BuyerId, ListingId, OfferId, RoomId, SellerId};

use crate::error::{Result, RoomError};

/// The workflow state of a transaction room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Waiting for the buyer's deposit.
    AwaitingDeposit,
    /// Deposit confirmed; review may begin.
    DepositReceived,
    /// Review under way (admin engaged, no party approvals yet).
    InReview,
    /// Buyer has approved; waiting on the seller.
    BuyerApproved,
    /// Seller has approved; waiting on the buyer.
    SellerApproved,
    /// Both buyer and seller approved.
    BothApproved,
    /// Admin signed off; final payment can be requested.
    AdminFinalReview,
    /// Final payment requested from the buyer.
    PaymentPending,
    /// Final payment confirmed.
    PaymentReceived,
    /// Transaction done. Terminal.
    Completed,
    /// Abandoned before completion. Terminal.
    Cancelled,
    /// Under dispute; only manual administrative intervention resolves it.
    /// Terminal for this engine.
    Disputed,
}

impl RoomStatus {
    /// Checks if a transition to the target state is valid.
    ///
    /// Covers the canonical forward chain plus cancellation/dispute edges.
    /// Approval-flag bookkeeping (which of the review states the room sits
    /// in) is handled by [`TransactionRoom::approve`] on top of this table.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        use RoomStatus::{
            AdminFinalReview, AwaitingDeposit, BothApproved, BuyerApproved, Cancelled,
            Completed, DepositReceived, Disputed, InReview, PaymentPending, PaymentReceived,
            SellerApproved,
        };

        matches!(
            (self, target),
            (AwaitingDeposit, DepositReceived)
                | (DepositReceived, InReview | BuyerApproved | SellerApproved)
                | (InReview, BuyerApproved | SellerApproved)
                | (BuyerApproved | SellerApproved, BothApproved)
                | (BothApproved, AdminFinalReview)
                | (AdminFinalReview, PaymentPending)
                | (PaymentPending, PaymentReceived)
                | (PaymentReceived, Completed)
        ) || (!self.is_terminal() && matches!(target, Cancelled | Disputed))
    }

    /// Returns true if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Disputed)
    }

    /// Returns true if approvals may be recorded in this state.
    #[must_use]
    pub const fn accepts_approvals(&self) -> bool {
        matches!(
            self,
            Self::DepositReceived
                | Self::InReview
                | Self::BuyerApproved
                | Self::SellerApproved
                | Self::BothApproved
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AwaitingDeposit => "awaiting_deposit",
            Self::DepositReceived => "deposit_received",
            Self::InReview => "in_review",
            Self::BuyerApproved => "buyer_approved",
            Self::SellerApproved => "seller_approved",
            Self::BothApproved => "both_approved",
            Self::AdminFinalReview => "admin_final_review",
            Self::PaymentPending => "payment_pending",
            Self::PaymentReceived => "payment_received",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        };
        write!(f, "{s}")
    }
}

/// An action a participant can request on a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomAction {
    /// Buyer's deposit confirmed by the payment collaborator.
    PayDeposit,
    /// Record the acting role's approval.
    Approve,
    /// Admin requests the final payment.
    RequestFinalPayment,
    /// Buyer's final payment confirmed by the payment collaborator.
    PayFinal,
    /// Admin closes out a fully paid, fully approved transaction.
    Complete,
    /// Any participant raises a dispute.
    Dispute,
    /// Any participant abandons the transaction.
    Cancel,
}

impl fmt::Display for RoomAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PayDeposit => "pay_deposit",
            Self::Approve => "approve",
            Self::RequestFinalPayment => "request_final_payment",
            Self::PayFinal => "pay_final",
            Self::Complete => "complete",
            Self::Dispute => "dispute",
            Self::Cancel => "cancel",
        };
        write!(f, "{s}")
    }
}

/// A message in the room's ordered log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMessage {
    /// Role of the author.
    pub author_role: ActorRole,
    /// Message body.
    pub body: String,
    /// When the message was posted.
    pub sent_at: DateTime<Utc>,
}

/// The multi-party workflow created 1:1 from an accepted offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRoom {
    /// Unique identifier.
    pub id: RoomId,
    /// The accepted offer this room was created from.
    pub offer_id: OfferId,
    /// The listing being transferred.
    pub listing_id: ListingId,
    /// The buying party.
    pub buyer_id: BuyerId,
    /// The selling party.
    pub seller_id: SellerId,
    /// Current workflow state.
    pub status: RoomStatus,
    /// The price agreed at offer acceptance, in whole dollars.
    pub agreed_price: u64,
    /// Required deposit, in whole dollars.
    pub deposit_amount: u64,
    /// Whether the deposit has been paid. Monotonic: never reset.
    pub deposit_paid: bool,
    /// When the deposit was confirmed.
    pub deposit_paid_at: Option<DateTime<Utc>>,
    /// Final payment amount, set when the admin requests it.
    pub final_payment_amount: Option<u64>,
    /// Whether the final payment has been confirmed.
    pub final_payment_paid: bool,
    /// When the final payment was confirmed.
    pub final_paid_at: Option<DateTime<Utc>>,
    /// Buyer approval timestamp; `Some` means approved.
    pub buyer_approved_at: Option<DateTime<Utc>>,
    /// Seller approval timestamp; `Some` means approved.
    pub seller_approved_at: Option<DateTime<Utc>>,
    /// Admin approval timestamp; `Some` means approved.
    pub admin_approved_at: Option<DateTime<Utc>>,
    /// Ordered message log.
    pub messages: Vec<RoomMessage>,
    /// Attached document references (storage is external, ids only).
    pub documents: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set if and only if the room completed successfully.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransactionRoom {
    /// Create a room in `AwaitingDeposit` for an accepted offer.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RoomId,
        offer_id: OfferId,
        listing_id: ListingId,
        buyer_id: BuyerId,
        seller_id: SellerId,
        agreed_price: u64,
        deposit_amount: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            offer_id,
            listing_id,
            buyer_id,
            seller_id,
            status: RoomStatus::AwaitingDeposit,
            agreed_price,
            deposit_amount,
            deposit_paid: false,
            deposit_paid_at: None,
            final_payment_amount: None,
            final_payment_paid: false,
            final_paid_at: None,
            buyer_approved_at: None,
            seller_approved_at: None,
            admin_approved_at: None,
            messages: Vec::new(),
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn transition_to(&mut self, target: RoomStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status.can_transition_to(&target) {
            self.status = target;
            self.updated_at = now;
            Ok(())
        } else {
            Err(RoomError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Dispatch an action, checking the acting role's authorization first.
    ///
    /// Returns the status after the action. The engine layers the
    /// cross-aggregate side effects of completion/cancellation on top.
    pub fn advance(
        &mut self,
        action: RoomAction,
        role: ActorRole,
        now: DateTime<Utc>,
    ) -> Result<RoomStatus> {
        match action {
            RoomAction::PayDeposit => {
                self.require_role(role, ActorRole::Buyer, action)?;
                self.pay_deposit(now)?;
            }
            RoomAction::Approve => self.approve(role, now)?,
            RoomAction::RequestFinalPayment => {
                self.require_role(role, ActorRole::Admin, action)?;
                self.request_final_payment(None, now)?;
            }
            RoomAction::PayFinal => {
                self.require_role(role, ActorRole::Buyer, action)?;
                self.pay_final(now)?;
            }
            RoomAction::Complete => {
                self.require_role(role, ActorRole::Admin, action)?;
                self.complete(now)?;
            }
            RoomAction::Dispute => self.dispute(now)?,
            RoomAction::Cancel => self.cancel(now)?,
        }
        Ok(self.status)
    }

    fn require_role(&self, role: ActorRole, required: ActorRole, action: RoomAction) -> Result<()> {
        if role == required {
            Ok(())
        } else {
            Err(RoomError::UnauthorizedActor {
                role,
                action: action.to_string(),
            })
        }
    }

    /// Record the confirmed deposit. `deposit_paid` is monotonic.
    pub fn pay_deposit(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(RoomStatus::DepositReceived, now)?;
        self.deposit_paid = true;
        self.deposit_paid_at = Some(now);
        Ok(())
    }

    /// Record the acting role's approval.
    ///
    /// The three flags are independent and can be set in any order once the
    /// deposit is received. The status is recomputed from the flag set:
    /// buyer AND seller give `BothApproved`; with the admin flag also set
    /// the room moves on to `AdminFinalReview`.
    pub fn approve(&mut self, role: ActorRole, now: DateTime<Utc>) -> Result<()> {
        if !self.status.accepts_approvals() {
            return Err(RoomError::InvalidTransition {
                from: self.status.to_string(),
                to: "approval".to_string(),
            });
        }

        let slot = match role {
            ActorRole::Buyer => &mut self.buyer_approved_at,
            ActorRole::Seller => &mut self.seller_approved_at,
            ActorRole::Admin => &mut self.admin_approved_at,
        };
        if slot.is_some() {
            return Err(RoomError::AlreadyApproved(role));
        }
        *slot = Some(now);
        self.updated_at = now;
        self.recompute_review_status();
        Ok(())
    }

    fn recompute_review_status(&mut self) {
        let buyer = self.buyer_approved_at.is_some();
        let seller = self.seller_approved_at.is_some();
        let admin = self.admin_approved_at.is_some();

        self.status = match (buyer, seller) {
            (true, true) if admin => RoomStatus::AdminFinalReview,
            (true, true) => RoomStatus::BothApproved,
            (true, false) => RoomStatus::BuyerApproved,
            (false, true) => RoomStatus::SellerApproved,
            (false, false) if admin => RoomStatus::InReview,
            (false, false) => RoomStatus::DepositReceived,
        };
    }

    /// Admin requests the final payment, fixing its amount.
    ///
    /// Defaults to the agreed price minus the deposit when no explicit
    /// amount is given.
    pub fn request_final_payment(&mut self, amount: Option<u64>, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(RoomStatus::PaymentPending, now)?;
        self.final_payment_amount =
            Some(amount.unwrap_or_else(|| self.agreed_price.saturating_sub(self.deposit_amount)));
        Ok(())
    }

    /// Record the confirmed final payment.
    pub fn pay_final(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(RoomStatus::PaymentReceived, now)?;
        self.final_payment_paid = true;
        self.final_paid_at = Some(now);
        Ok(())
    }

    /// Close out the transaction.
    ///
    /// Requires all three approvals, the deposit, and the final payment.
    /// Sets `completed_at`; the engine propagates the listing and unlock
    /// side effects.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != RoomStatus::PaymentReceived {
            return Err(RoomError::InvalidTransition {
                from: self.status.to_string(),
                to: RoomStatus::Completed.to_string(),
            });
        }
        if self.admin_approved_at.is_none() {
            return Err(RoomError::CompletionGate("admin approval missing".to_string()));
        }
        if self.buyer_approved_at.is_none() || self.seller_approved_at.is_none() {
            return Err(RoomError::CompletionGate("party approval missing".to_string()));
        }
        if !self.deposit_paid || !self.final_payment_paid {
            return Err(RoomError::CompletionGate("payment outstanding".to_string()));
        }
        self.transition_to(RoomStatus::Completed, now)?;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Raise a dispute. Terminal for this engine; resolution is manual.
    pub fn dispute(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(RoomStatus::Disputed, now)
    }

    /// Abandon the transaction.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(RoomStatus::Cancelled, now)
    }

    /// Append a message to the ordered log. Closed rooms refuse messages.
    pub fn post_message(
        &mut self,
        author_role: ActorRole,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status.is_terminal() {
            return Err(RoomError::RoomClosed);
        }
        self.messages.push(RoomMessage {
            author_role,
            body: body.into(),
            sent_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Attach an externally stored document by id.
    pub fn attach_document(
        &mut self,
        document_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status.is_terminal() {
            return Err(RoomError::RoomClosed);
        }
        self.documents.push(document_id.into());
        self.updated_at = now;
        Ok(())
    }

    /// Returns true if the room is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

//! Error types for the mcx-room crate.

use thiserror::Error;

use mcx_core::ActorRole;

/// Errors that can occur during transaction room operations.
#[derive(Debug, Error)]
pub enum RoomError {
    /// Requested transition is not valid from the current state.
    #[error("invalid room transition: {from} -> {to}")]
    InvalidTransition {
        /// The current status.
        from: String,
        /// The attempted target status.
        to: String,
    },

    /// The acting role is not permitted to perform this action.
    #[error("role {role} may not {action}")]
    UnauthorizedActor {
        /// The role that attempted the action.
        role: ActorRole,
        /// The action attempted.
        action: String,
    },

    /// Completion requires admin approval and a settled final payment.
    #[error("completion gate not satisfied: {0}")]
    CompletionGate(String),

    /// This party has already recorded its approval.
    #[error("{0} already approved")]
    AlreadyApproved(ActorRole),

    /// Messages cannot be appended to a terminal room.
    #[error("room is closed")]
    RoomClosed,
}

/// Result type for room operations.
pub type Result<T> = std::result::Result<T, RoomError>;

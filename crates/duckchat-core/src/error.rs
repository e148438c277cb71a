//! Error types for the room synchronization core.
//!
//! One enum per layer: connection lifecycle, room session, history backlog,
//! and identity resolution. Errors never corrupt state: a failed operation
//! leaves every state machine exactly where it was, except where a variant
//! documents a forced transition (transport failure always lands in
//! `Disconnected`).

use thiserror::Error;

use crate::{connection::ConnectionState, message::RoomId, session::SessionStatus};

/// Errors from the connection state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation is not valid in the current state.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred.
        state: ConnectionState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Transport could not reach the endpoint, or gave up reconnecting.
    #[error("endpoint {endpoint} unreachable: {reason}")]
    Unreachable {
        /// Endpoint that was being contacted.
        endpoint: String,
        /// Transport-level reason.
        reason: String,
    },

    /// Send attempted while the channel is not connected.
    #[error("not connected (state {state:?})")]
    NotConnected {
        /// State at the time of the send.
        state: ConnectionState,
    },
}

impl ConnectionError {
    /// Returns true if the same operation may succeed if retried later.
    ///
    /// Reachability and connectivity are transient; state misuse is a
    /// programming error and never is.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::NotConnected { .. })
    }
}

/// Errors from the room session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation requires an active session.
    #[error("session not active (status {status:?})")]
    NotActive {
        /// Session status at the time of the call.
        status: SessionStatus,
    },

    /// Message body is empty after trimming whitespace.
    #[error("message body is empty")]
    EmptyMessage,

    /// Underlying connection refused the operation.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl SessionError {
    /// Returns true if the same operation may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_transient(),
            Self::NotActive { .. } | Self::EmptyMessage => false,
        }
    }
}

/// Errors from loading a room's message backlog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Backlog could not be fetched or parsed. Non-fatal: the room degrades
    /// to live-only.
    #[error("history unavailable for room {room_id}: {reason}")]
    Unavailable {
        /// Room whose backlog failed.
        room_id: RoomId,
        /// Network or parse failure description.
        reason: String,
    },
}

impl HistoryError {
    /// Build an [`HistoryError::Unavailable`] for `room_id`.
    pub fn unavailable(room_id: &RoomId, reason: impl Into<String>) -> Self {
        Self::Unavailable { room_id: room_id.clone(), reason: reason.into() }
    }
}

/// Errors from resolving the signed-in user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No user is signed in. Rooms must not be joined.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Profile lookup for the signed-in user failed.
    #[error("profile unavailable: {reason}")]
    ProfileUnavailable {
        /// Lookup failure description.
        reason: String,
    },
}

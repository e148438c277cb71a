//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of a room at a point in time.
//! Invariants operate on a [`Timeline`] of them rather than on live state, so
//! properties that span steps (never shrinks, never goes backwards) can be
//! checked.

use duckchat_app::ChatRoom;
use duckchat_core::{ConnectionState, Environment, Message, SessionError, SessionStatus};

/// Snapshot of one room's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Session status.
    pub status: SessionStatus,
    /// Live-channel state.
    pub connection: ConnectionState,
    /// Message ids in stream order.
    pub message_ids: Vec<String>,
    /// Whether the stream has been torn down.
    pub closed: bool,
}

impl RoomSnapshot {
    /// Capture `room`.
    pub fn of<E: Environment>(room: &ChatRoom<E>) -> Self {
        Self {
            status: room.status(),
            connection: room.connection_state(),
            message_ids: room.messages().iter().map(|m| m.id.to_string()).collect(),
            closed: room.stream().is_closed(),
        }
    }
}

/// A send and the state it was attempted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAttempt {
    /// Session status at the time of the call.
    pub status: SessionStatus,
    /// Live-channel state at the time of the call.
    pub connection: ConnectionState,
    /// Whether the send was accepted.
    pub accepted: bool,
}

/// Everything observed about one room, in order.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    /// Snapshots, one per step.
    pub snapshots: Vec<RoomSnapshot>,
    /// Every send attempted.
    pub sends: Vec<SendAttempt>,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot of `room`.
    pub fn record<E: Environment>(&mut self, room: &ChatRoom<E>) {
        self.snapshots.push(RoomSnapshot::of(room));
    }

    /// Send `body` through `room`, recording the state it was attempted in.
    pub fn send<E: Environment>(
        &mut self,
        room: &mut ChatRoom<E>,
        body: &str,
    ) -> Result<Message, SessionError> {
        let status = room.status();
        let connection = room.connection_state();
        let result = room.send(body);
        self.sends.push(SendAttempt { status, connection, accepted: result.is_ok() });
        result
    }

    /// Most recent snapshot.
    pub fn last(&self) -> Option<&RoomSnapshot> {
        self.snapshots.last()
    }
}

//! Commands into and updates out of a running room.

use duckchat_core::{SessionStatus, StateChange, StreamEvent};

/// Command from the UI to a running room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCommand {
    /// Publish a message.
    Send(String),
    /// Reload the backlog. Already merged messages dedup.
    RefreshHistory,
    /// Leave the room and stop the runtime.
    Leave,
}

/// Notification from a running room to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomUpdate {
    /// Message stream changed.
    Stream(StreamEvent),
    /// Live channel changed state.
    Connection(StateChange),
    /// Session status changed.
    Status(SessionStatus),
    /// A send was rejected. The room keeps running.
    SendFailed {
        /// Rejection reason.
        reason: String,
    },
}

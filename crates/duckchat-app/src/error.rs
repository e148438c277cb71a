//! Runtime error types.

use duckchat_core::{ConnectionError, IdentityError};
use thiserror::Error;

/// Errors that end a room runtime.
///
/// Anything non-fatal (a rejected send, an unavailable backlog) is reported
/// as a [`crate::RoomUpdate`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The live channel could not be reached or gave up reconnecting.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The signed-in user could not be resolved.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The room directory refused the join.
    #[error("room directory: {reason}")]
    Directory {
        /// Directory failure description.
        reason: String,
    },
}

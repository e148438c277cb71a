//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding live-channel packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Text frame was empty.
    #[error("empty packet")]
    Empty,

    /// Text frame exceeds the negotiated maximum payload.
    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge {
        /// Actual size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// Leading Engine.IO packet type is not one we understand.
    #[error("unknown engine.io packet type {0:?}")]
    UnknownPacketType(char),

    /// Socket.IO packet type inside an Engine.IO message is not supported.
    #[error("unsupported socket.io packet type {0:?}")]
    UnsupportedSocketPacket(char),

    /// Packet addressed a namespace other than the default `/`.
    #[error("unsupported namespace {0:?}")]
    UnsupportedNamespace(String),

    /// Event name is not part of the chat protocol.
    #[error("unknown event {0:?}")]
    UnknownEvent(String),

    /// Event arguments did not match the expected shape.
    #[error("malformed {event} event: {reason}")]
    MalformedEvent {
        /// Event name.
        event: String,
        /// What was wrong with the arguments.
        reason: String,
    },

    /// JSON body failed to parse or serialize.
    #[error("json error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

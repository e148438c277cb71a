//! Canonical message shape shared by the history and live paths.

use std::fmt;

use duckchat_proto::IncomingMessage;

use crate::env::Environment;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Wrap a server-assigned identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Message identifier, unique within a room.
    MessageId
);

string_id!(
    /// Server-assigned room identifier.
    RoomId
);

string_id!(
    /// Server-assigned user identifier.
    UserId
);

impl MessageId {
    /// Generate a fresh client-side id: 128 random bits as 32 hex digits.
    pub fn generate<E: Environment>(env: &E) -> Self {
        Self(format!("{:032x}", env.random_u128()))
    }
}

/// Path a message took into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrivedVia {
    /// Fetched with the room backlog.
    History,
    /// Pushed over the live channel (or sent by this client).
    Live,
}

/// A chat message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identity of the message within its room.
    pub id: MessageId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Author's user id.
    pub author_id: UserId,
    /// Author's display name at send time.
    pub author_name: String,
    /// Author's avatar URL. Empty when absent.
    pub author_avatar_url: String,
    /// Message text.
    pub body: String,
    /// Whether the message came from the backlog or the live channel.
    pub arrived_via: ArrivedVia,
    /// Position within the history batch. `None` for live messages.
    pub sequence_hint: Option<u64>,
}

impl Message {
    /// Build a message from a live `messageReceived` payload.
    pub fn from_live(payload: IncomingMessage) -> Self {
        Self {
            id: MessageId(payload.id),
            room_id: RoomId(payload.room_id),
            author_id: UserId(payload.author_id),
            author_name: payload.author_name,
            author_avatar_url: payload.author_avatar_url,
            body: payload.body,
            arrived_via: ArrivedVia::Live,
            sequence_hint: None,
        }
    }

    /// True when `user` wrote this message. The UI aligns own messages
    /// differently.
    pub fn is_from(&self, user: &UserId) -> bool {
        &self.author_id == user
    }
}

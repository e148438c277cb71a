//! Typed chat events carried inside Socket.IO event packets.
//!
//! On the wire an event is a JSON array whose first element is the event name
//! and whose remaining elements are positional arguments:
//!
//! ```text
//! ["joinGroup", "alice", "general"]
//! ["leaveGroup", "general"]
//! ["sendMessage", {"id": "...", "roomId": "...", ...}]
//! ["messageReceived", {"id": "...", "roomId": "...", ...}]
//! ```
//!
//! The event name is the variant tag, so serde's externally tagged enum
//! representation is not used. [`Event::to_args`] and [`Event::from_args`]
//! convert between the enum and the positional argument list.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Message the client publishes to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Client-generated message id. The server echoes it back so the
    /// sender's own message deduplicates against the live copy.
    pub id: String,
    /// Target room id.
    pub room_id: String,
    /// Author's user id.
    pub author_id: String,
    /// Author's display name.
    pub author_name: String,
    /// Author's avatar URL.
    #[serde(default)]
    pub author_avatar_url: String,
    /// Message text.
    pub body: String,
}

/// Message pushed by the server to every member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    /// Server or client assigned message id, unique within the room.
    pub id: String,
    /// Room the message belongs to.
    pub room_id: String,
    /// Author's user id.
    pub author_id: String,
    /// Author's display name.
    pub author_name: String,
    /// Author's avatar URL. Empty when the author has none.
    #[serde(default)]
    pub author_avatar_url: String,
    /// Message text.
    pub body: String,
}

impl From<OutgoingMessage> for IncomingMessage {
    fn from(msg: OutgoingMessage) -> Self {
        Self {
            id: msg.id,
            room_id: msg.room_id,
            author_id: msg.author_id,
            author_name: msg.author_name,
            author_avatar_url: msg.author_avatar_url,
            body: msg.body,
        }
    }
}

/// Chat event exchanged over the live channel.
///
/// # Invariants
///
/// - Each variant maps to exactly one event name ([`Event::name`]), enforced
///   by exhaustive matching in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Announce presence in a room (client → server).
    JoinGroup {
        /// Display name of the joining user.
        user_name: String,
        /// Room name the server keys membership on.
        room_name: String,
    },

    /// Announce departure from a room (client → server).
    LeaveGroup {
        /// Room name the server keys membership on.
        room_name: String,
    },

    /// Publish a message (client → server).
    SendMessage(OutgoingMessage),

    /// Message delivered to a room member (server → client).
    MessageReceived(IncomingMessage),
}

impl Event {
    /// Wire name of [`Event::JoinGroup`].
    pub const JOIN_GROUP: &'static str = "joinGroup";
    /// Wire name of [`Event::LeaveGroup`].
    pub const LEAVE_GROUP: &'static str = "leaveGroup";
    /// Wire name of [`Event::SendMessage`].
    pub const SEND_MESSAGE: &'static str = "sendMessage";
    /// Wire name of [`Event::MessageReceived`].
    pub const MESSAGE_RECEIVED: &'static str = "messageReceived";

    /// Event name as it appears on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JoinGroup { .. } => Self::JOIN_GROUP,
            Self::LeaveGroup { .. } => Self::LEAVE_GROUP,
            Self::SendMessage(_) => Self::SEND_MESSAGE,
            Self::MessageReceived(_) => Self::MESSAGE_RECEIVED,
        }
    }

    /// Positional arguments following the event name.
    pub fn to_args(&self) -> Result<Vec<Value>> {
        let args = match self {
            Self::JoinGroup { user_name, room_name } => {
                vec![Value::String(user_name.clone()), Value::String(room_name.clone())]
            },
            Self::LeaveGroup { room_name } => vec![Value::String(room_name.clone())],
            Self::SendMessage(msg) => vec![serde_json::to_value(msg)?],
            Self::MessageReceived(msg) => vec![serde_json::to_value(msg)?],
        };
        Ok(args)
    }

    /// Rebuild an event from its wire name and positional arguments.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownEvent` if `name` is not a chat event
    /// - `ProtocolError::MalformedEvent` if the arguments have the wrong shape
    pub fn from_args(name: &str, args: Vec<Value>) -> Result<Self> {
        match name {
            Self::JOIN_GROUP => Ok(Self::JoinGroup {
                user_name: string_arg(name, &args, 0)?,
                room_name: string_arg(name, &args, 1)?,
            }),
            Self::LEAVE_GROUP => Ok(Self::LeaveGroup { room_name: string_arg(name, &args, 0)? }),
            Self::SEND_MESSAGE => Ok(Self::SendMessage(object_arg(name, args)?)),
            Self::MESSAGE_RECEIVED => Ok(Self::MessageReceived(object_arg(name, args)?)),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

fn string_arg(event: &str, args: &[Value], index: usize) -> Result<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ProtocolError::MalformedEvent {
            event: event.to_string(),
            reason: format!("argument {index} should be a string, got {other}"),
        }),
        None => Err(ProtocolError::MalformedEvent {
            event: event.to_string(),
            reason: format!("missing argument {index}"),
        }),
    }
}

fn object_arg<T: DeserializeOwned>(event: &str, args: Vec<Value>) -> Result<T> {
    let Some(first) = args.into_iter().next() else {
        return Err(ProtocolError::MalformedEvent {
            event: event.to_string(),
            reason: "missing payload object".to_string(),
        });
    };

    serde_json::from_value(first).map_err(|e| ProtocolError::MalformedEvent {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn incoming() -> IncomingMessage {
        IncomingMessage {
            id: "m1".into(),
            room_id: "r1".into(),
            author_id: "u1".into(),
            author_name: "alice".into(),
            author_avatar_url: "https://img/alice.png".into(),
            body: "hi".into(),
        }
    }

    #[test]
    fn join_group_uses_positional_strings() {
        let event = Event::JoinGroup { user_name: "alice".into(), room_name: "general".into() };
        assert_eq!(event.to_args().unwrap(), vec![json!("alice"), json!("general")]);
    }

    #[test]
    fn message_payload_is_camel_case() {
        let args = Event::MessageReceived(incoming()).to_args().unwrap();
        assert_eq!(args[0]["roomId"], json!("r1"));
        assert_eq!(args[0]["authorAvatarUrl"], json!("https://img/alice.png"));
    }

    #[test]
    fn missing_avatar_defaults_to_empty() {
        let args = vec![json!({
            "id": "m1",
            "roomId": "r1",
            "authorId": "u1",
            "authorName": "alice",
            "body": "hi"
        })];
        let Event::MessageReceived(msg) = Event::from_args(Event::MESSAGE_RECEIVED, args).unwrap()
        else {
            panic!("expected MessageReceived");
        };
        assert!(msg.author_avatar_url.is_empty());
    }

    #[test]
    fn unknown_event_rejected() {
        let err = Event::from_args("typing", vec![]).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownEvent("typing".into()));
    }

    #[test]
    fn join_group_with_missing_room_rejected() {
        let err = Event::from_args(Event::JOIN_GROUP, vec![json!("alice")]).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEvent { .. }));
    }

    #[test]
    fn leave_group_with_non_string_rejected() {
        let err = Event::from_args(Event::LEAVE_GROUP, vec![json!(42)]).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEvent { .. }));
    }
}

//! Engine.IO v4 / Socket.IO v5 text packets.
//!
//! Every WebSocket text frame is one Engine.IO packet: a single ASCII digit
//! naming the packet type followed by an optional body. Engine.IO `message`
//! packets (`4`) wrap a Socket.IO packet with its own type digit.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2 / 3                                                     ping / pong
//! 40                                                        socket.io connect
//! 42["messageReceived",{...}]                               socket.io event
//! ```
//!
//! Only the default namespace `/` and plain-text events are supported. The
//! chat backend never sends binary attachments over the live channel.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    errors::{ProtocolError, Result},
    event::Event,
};

/// Engine.IO open handshake sent by the server as the first packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transport upgrades offered by the server.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Interval in milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong before closing.
    pub ping_timeout: u64,
    /// Maximum packet size accepted by the server, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// A single live-channel text frame.
///
/// # Invariants
///
/// - Decoding a frame produced by [`Packet::encode`] yields an equal packet.
/// - [`Packet::decode`] never panics on arbitrary input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Engine.IO open (`0`).
    Open(Handshake),
    /// Engine.IO close (`1`).
    Close,
    /// Engine.IO heartbeat ping (`2`). Servers ping, clients answer.
    Ping,
    /// Engine.IO heartbeat pong (`3`).
    Pong,
    /// Engine.IO no-op (`6`).
    Noop,
    /// Socket.IO connect to the default namespace (`40`).
    ///
    /// The client sends it without a sid. The server acknowledges with the
    /// Socket.IO session id.
    Connect {
        /// Socket.IO session id assigned by the server.
        sid: Option<String>,
    },
    /// Socket.IO disconnect from the default namespace (`41`).
    Disconnect,
    /// Socket.IO connection refused by the server (`44`).
    ConnectError {
        /// Reason given by the server.
        message: String,
    },
    /// Socket.IO event (`42`).
    Event(Event),
}

impl Packet {
    /// Largest text frame accepted by [`Packet::decode`].
    ///
    /// Matches the Engine.IO default `maxHttpBufferSize` of 1 MB.
    pub const MAX_PACKET_SIZE: usize = 1_000_000;

    /// Encode this packet as a WebSocket text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if an event payload fails to serialize
    pub fn encode(&self) -> Result<String> {
        let text = match self {
            Self::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Noop => "6".to_string(),
            Self::Connect { sid: None } => "40".to_string(),
            Self::Connect { sid: Some(sid) } => format!("40{}", json!({ "sid": sid })),
            Self::Disconnect => "41".to_string(),
            Self::ConnectError { message } => format!("44{}", json!({ "message": message })),
            Self::Event(event) => {
                let mut array = Vec::with_capacity(3);
                array.push(Value::String(event.name().to_string()));
                array.extend(event.to_args()?);
                format!("42{}", serde_json::to_string(&array)?)
            },
        };
        Ok(text)
    }

    /// Decode a WebSocket text frame.
    ///
    /// # Security
    ///
    /// - Size Validation First: oversized frames are rejected before any JSON
    ///   parsing happens.
    /// - Fail on Unknown Types: unknown packet types, namespaces, and event
    ///   names are errors, never silently ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PacketTooLarge` if `text` exceeds
    ///   [`Packet::MAX_PACKET_SIZE`]
    /// - `ProtocolError::Empty` for an empty frame
    /// - `ProtocolError::UnknownPacketType` / `UnsupportedSocketPacket` /
    ///   `UnsupportedNamespace` for framing the client does not speak
    /// - `ProtocolError::Json`, `UnknownEvent`, `MalformedEvent` for bad bodies
    pub fn decode(text: &str) -> Result<Self> {
        if text.len() > Self::MAX_PACKET_SIZE {
            return Err(ProtocolError::PacketTooLarge {
                size: text.len(),
                max: Self::MAX_PACKET_SIZE,
            });
        }

        let mut chars = text.chars();
        let Some(kind) = chars.next() else {
            return Err(ProtocolError::Empty);
        };
        let body = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(body)?)),
            '1' => Ok(Self::Close),
            // Probe pings ("2probe") only occur during transport upgrades
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Self::decode_socket(body),
            '6' => Ok(Self::Noop),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }

    fn decode_socket(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let Some(kind) = chars.next() else {
            return Err(ProtocolError::Empty);
        };
        let mut body = chars.as_str();

        if body.starts_with('/') {
            let (namespace, rest) = body.split_once(',').unwrap_or((body, ""));
            if namespace != "/" {
                return Err(ProtocolError::UnsupportedNamespace(namespace.to_string()));
            }
            body = rest;
        }

        match kind {
            '0' => {
                if body.is_empty() {
                    return Ok(Self::Connect { sid: None });
                }
                let value: Value = serde_json::from_str(body)?;
                let sid = value.get("sid").and_then(Value::as_str).map(str::to_string);
                Ok(Self::Connect { sid })
            },
            '1' => Ok(Self::Disconnect),
            '2' => decode_event(body).map(Self::Event),
            '4' => {
                let value: Value = serde_json::from_str(body)?;
                let message = match value {
                    Value::String(s) => s,
                    Value::Object(ref map) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .map_or_else(|| value.to_string(), str::to_string),
                    other => other.to_string(),
                };
                Ok(Self::ConnectError { message })
            },
            other => Err(ProtocolError::UnsupportedSocketPacket(other)),
        }
    }
}

/// Parse `[name, args...]`, skipping an optional leading ack id.
fn decode_event(body: &str) -> Result<Event> {
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let array: Vec<Value> = serde_json::from_str(body)?;

    let mut items = array.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(ProtocolError::MalformedEvent {
                event: other.to_string(),
                reason: "event name must be a string".to_string(),
            });
        },
        None => {
            return Err(ProtocolError::MalformedEvent {
                event: String::new(),
                reason: "empty event array".to_string(),
            });
        },
    };

    Event::from_args(&name, items.collect())
}

//! Wire protocol for the DuckChat live channel.
//!
//! The chat backend speaks Socket.IO v5 over Engine.IO v4 text frames carried
//! on a WebSocket. This crate owns both layers of that framing plus the typed
//! chat events exchanged on top of it, and the JSON record shapes returned by
//! the REST API.
//!
//! # Layers
//!
//! - [`Packet`]: one WebSocket text frame. Engine.IO control packets (open,
//!   ping, pong, close) and Socket.IO packets (connect, disconnect, event).
//! - [`Event`]: typed chat event carried by a Socket.IO event packet.
//! - [`rest`]: request/response record shapes (history, users, rooms).
//!
//! Encoding is infallible for well-formed values. Decoding rejects anything
//! it does not understand with a [`ProtocolError`]; it never panics.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod event;
pub mod packet;
pub mod rest;

pub use errors::{ProtocolError, Result};
pub use event::{Event, IncomingMessage, OutgoingMessage};
pub use packet::{Handshake, Packet};

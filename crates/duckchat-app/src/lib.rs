//! Application layer for DuckChat
//!
//! Glues the pure core state machines of one chat room together and drives
//! them with a generic async runtime, so the same orchestration runs against
//! a real WebSocket and against the deterministic simulation harness.
//!
//! # Components
//!
//! - [`ChatRoom`]: one open room (connection, session, and message stream)
//! - [`Driver`]: trait for live-channel I/O
//! - [`RoomDirectory`]: trait for the room list and membership REST calls
//! - [`Runtime`]: async event loop racing history, transport, and UI commands

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod directory;
mod driver;
mod error;
mod event;
mod room;
mod runtime;

pub use directory::{RoomDirectory, open_room};
pub use driver::Driver;
pub use error::RuntimeError;
pub use event::{RoomCommand, RoomUpdate};
pub use room::{ChatRoom, HistoryTicket};
pub use runtime::Runtime;

//! Core room synchronization logic for DuckChat.
//!
//! Pure state machines with no I/O: every operation takes its inputs as
//! arguments and returns the actions a driver must perform. The same code runs
//! under the production WebSocket driver and the deterministic simulation
//! harness.
//!
//! # Components
//!
//! - [`ConnectionManager`]: lifecycle of one live-channel connection
//! - [`RoomSession`]: one user's membership in one room (join, send, leave)
//! - [`HistoryBatch`] / [`HistoryLoader`]: the one-shot message backlog
//! - [`MessageStream`]: merges backlog and live events into one ordered,
//!   duplicate-free sequence
//! - [`UserIdentity`]: read-only snapshot of the signed-in user
//!
//! # Data flow
//!
//! ```text
//!   IdentityProvider ──resolve──> UserIdentity
//!                                     │
//!   ConnectionManager <──join/send── RoomSession
//!          │ inbound events                │
//!          └──────────> MessageStream <────┘ teardown
//!                            ▲
//!   HistoryLoader ──batch────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;
pub mod history;
pub mod identity;
pub mod message;
pub mod session;
pub mod stream;

pub use connection::{
    ConnectionAction, ConnectionManager, ConnectionState, StateChange, TransportEvent,
};
pub use env::Environment;
pub use error::{ConnectionError, HistoryError, IdentityError, SessionError};
pub use history::{HistoryBatch, HistoryLoader};
pub use identity::{IdentityProvider, Profile, UserIdentity, resolve_identity};
pub use message::{ArrivedVia, Message, MessageId, RoomId, UserId};
pub use session::{Room, RoomSession, SessionStatus};
pub use stream::{HistoryState, MessageStream, StreamEvent, SubscriptionId};

//! Deterministic simulation harness for DuckChat room testing.
//!
//! In-memory implementations of the Environment, Driver, and HistoryLoader
//! traits so the production [`duckchat_app::Runtime`] can run without a
//! network, with a seeded RNG and scripted transport behavior.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks over a [`Timeline`] of room snapshots. Use
//! [`InvariantRegistry::standard()`] for the room invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_history;

pub use invariants::{
    BufferNeverShrinks, Invariant, InvariantRegistry, InvariantResult, LeftIsQuiescent,
    RoomSnapshot, SendAttempt, SendGating, StatusMonotonicity, Timeline, UniqueMessageIds,
    Violation,
};
pub use sim_driver::{ConnectBehavior, SimController, SimDriver, SimDriverError, Wire};
pub use sim_env::SimEnv;
pub use sim_history::{HistoryGate, PendingLoad, SimHistory};

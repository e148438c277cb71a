//! Production I/O for DuckChat.
//!
//! Everything that touches the network or the filesystem lives here, behind
//! the traits the core and app crates define:
//!
//! - [`transport`]: Socket.IO over WebSocket, implementing
//!   [`duckchat_app::Driver`]
//! - [`rest`]: the REST API, implementing [`duckchat_core::HistoryLoader`],
//!   [`duckchat_core::IdentityProvider`], and [`duckchat_app::RoomDirectory`]
//! - [`config`]: TOML configuration
//! - [`system_env`]: wall clock and OS randomness

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod rest;
pub mod system_env;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use rest::{RestClient, RestError};
pub use system_env::SystemEnv;
pub use transport::{ConnectionHandle, ReconnectPolicy, SocketIoDriver, TransportError};

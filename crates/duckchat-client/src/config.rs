//! Client configuration.
//!
//! Loaded from a TOML file. Every field has a default, so an empty file (or
//! no file at all) yields a configuration for a local development backend.
//!
//! ```toml
//! api_url = "http://localhost:2201"
//! socket_url = "http://localhost:2301"
//! request_timeout_secs = 10
//!
//! [endpoints]
//! history = "messages/history"
//!
//! [reconnect]
//! max_attempts = 5
//! delay_ms = 1000
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::transport::ReconnectPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`ClientConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A configured URL is malformed or uses an unsupported scheme.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// REST paths, relative to `api_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// User profile lookup: `GET {get_user}/{userId}`.
    pub get_user: String,
    /// Rooms of a user: `GET {rooms_by_user}/{userId}`.
    pub rooms_by_user: String,
    /// Room membership: `PUT {join_room}/{roomId}/{userId}`.
    pub join_room: String,
    /// Room backlog: `GET {history}/{roomId}`.
    pub history: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            get_user: "users/find".into(),
            rooms_by_user: "chat/users".into(),
            join_room: "chat/join".into(),
            history: "messages/history".into(),
        }
    }
}

/// Live-channel reconnection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Attempts after a drop before giving up.
    pub max_attempts: u32,
    /// Delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self { max_attempts: 5, delay_ms: 1000 }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    pub api_url: String,
    /// Base URL of the live channel server.
    pub socket_url: String,
    /// Per-request timeout for REST calls, in seconds.
    pub request_timeout_secs: u64,
    /// Signed-in user id. `None` means not authenticated.
    pub user: Option<String>,
    /// REST paths.
    pub endpoints: Endpoints,
    /// Reconnection settings.
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:2201".into(),
            socket_url: "http://localhost:2301".into(),
            request_timeout_secs: 10,
            user: None,
            endpoints: Endpoints::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Read and parse a TOML config file.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Read` if the file cannot be read
    /// - `ConfigError::Parse` if it is not valid configuration
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Parse` if it is not valid configuration
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// REST base URL, with a trailing slash so relative paths append.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidUrl` if `api_url` is not an http(s) URL
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let mut url = parse(&self.api_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(&self.api_url, "expected http or https"));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// WebSocket URL of the live channel.
    ///
    /// `http`/`https` become `ws`/`wss`; the path is the Socket.IO endpoint
    /// with the Engine.IO v4 WebSocket query.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidUrl` if `socket_url` is malformed or not
    ///   http(s)/ws(s)
    pub fn socket_endpoint(&self) -> Result<Url, ConfigError> {
        let mut url = parse(&self.socket_url)?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            _ => return Err(invalid(&self.socket_url, "expected http(s) or ws(s)")),
        };
        url.set_scheme(scheme).map_err(|()| invalid(&self.socket_url, "cannot set scheme"))?;
        url.set_path("/socket.io/");
        url.set_query(Some("EIO=4&transport=websocket"));

        Ok(url)
    }

    /// REST request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reconnection policy for the live channel.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect.max_attempts,
            delay: Duration::from_millis(self.reconnect.delay_ms),
        }
    }
}

fn parse(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|e| invalid(url, e.to_string()))
}

fn invalid(url: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidUrl { url: url.to_string(), reason: reason.into() }
}

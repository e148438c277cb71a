//! REST API client.
//!
//! One [`RestClient`] serves as the history loader, the identity provider,
//! and the room directory. It is cheap to clone: the underlying connection
//! pool is shared.

use duckchat_app::RoomDirectory;
use duckchat_core::{
    HistoryBatch, HistoryError, HistoryLoader, IdentityProvider, Profile, RoomId, UserId,
};
use duckchat_proto::rest::{HistoryRecord, RoomSummary, UserProfile};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::{ClientConfig, ConfigError, Endpoints};

/// REST errors.
#[derive(Debug, Error)]
pub enum RestError {
    /// Configured base URL is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request URL could not be built.
    #[error("cannot build request url from {base}")]
    InvalidUrl {
        /// Base the path was joined onto.
        base: String,
    },

    /// Request failed, timed out, returned an error status, or the body did
    /// not parse.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client for the chat REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    endpoints: Endpoints,
    user: Option<UserId>,
}

impl RestClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// - `RestError::Config` if `api_url` is invalid
    /// - `RestError::Http` if the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self, RestError> {
        let http = reqwest::Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            http,
            base: config.api_base()?,
            endpoints: config.endpoints.clone(),
            user: config.user.clone().map(UserId::new),
        })
    }

    /// Profile of user `id`.
    pub async fn user_profile(&self, id: &UserId) -> Result<UserProfile, RestError> {
        let url = self.url(&self.endpoints.get_user, &[id.as_str()])?;
        self.get_json(url).await
    }

    /// Rooms `user` belongs to.
    pub async fn rooms(&self, user: &UserId) -> Result<Vec<RoomSummary>, RestError> {
        let url = self.url(&self.endpoints.rooms_by_user, &[user.as_str()])?;
        self.get_json(url).await
    }

    /// Register `user` as a member of `room`.
    pub async fn join(&self, room: &RoomId, user: &UserId) -> Result<(), RestError> {
        let url = self.url(&self.endpoints.join_room, &[room.as_str(), user.as_str()])?;
        tracing::debug!(%url, "PUT");
        self.http.put(url).send().await?.error_for_status()?;
        Ok(())
    }

    /// Stored messages of `room`, oldest first.
    pub async fn history(&self, room: &RoomId) -> Result<Vec<HistoryRecord>, RestError> {
        let url = self.url(&self.endpoints.history, &[room.as_str()])?;
        self.get_json(url).await
    }

    fn url(&self, path: &str, segments: &[&str]) -> Result<Url, RestError> {
        let invalid = || RestError::InvalidUrl { base: self.base.to_string() };

        let mut url = self.base.join(path.trim_matches('/')).map_err(|_| invalid())?;
        url.path_segments_mut().map_err(|()| invalid())?.pop_if_empty().extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RestError> {
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

impl HistoryLoader for RestClient {
    async fn load(&self, room_id: &RoomId) -> Result<HistoryBatch, HistoryError> {
        match self.history(room_id).await {
            Ok(records) => Ok(HistoryBatch::new(room_id.clone(), records)),
            Err(e) => Err(HistoryError::unavailable(room_id, e.to_string())),
        }
    }
}

impl IdentityProvider for RestClient {
    type Error = RestError;

    async fn current_user_id(&self) -> Option<UserId> {
        self.user.clone()
    }

    async fn current_user_profile(&self, id: &UserId) -> Result<Profile, RestError> {
        let profile = self.user_profile(id).await?;
        Ok(Profile { name: profile.name, avatar_url: profile.img_url })
    }
}

impl RoomDirectory for RestClient {
    type Error = RestError;

    async fn list_rooms(&self, user: &UserId) -> Result<Vec<RoomSummary>, RestError> {
        self.rooms(user).await
    }

    async fn join_room(&self, room: &RoomId, user: &UserId) -> Result<(), RestError> {
        self.join(room, user).await
    }
}

//! JSON record shapes returned by the chat REST API.
//!
//! Field names follow the backend (Mongo-style `_id`, `imgUrl`). These are
//! transport records only; the core normalizes them into its own types.

use serde::{Deserialize, Serialize};

/// One stored message as returned by `GET {history}/{roomId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Stored message id. Live echoes of the same message carry this id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Message text.
    pub message: String,
    /// Author's user id.
    pub user_id: String,
    /// Author's display name.
    pub user_name: String,
    /// Author's avatar URL.
    #[serde(default)]
    pub user_img_url: String,
}

/// User profile as returned by `GET {get_user}/{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    #[serde(default)]
    pub img_url: String,
}

/// Room list entry as returned by `GET {rooms_by_user}/{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Room id, used for history and message payloads.
    pub id: String,
    /// Room name, used for live-channel membership.
    pub name: String,
    /// Room picture URL.
    #[serde(default)]
    pub img_url: String,
}

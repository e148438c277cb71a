//! Room directory collaborator.

use std::future::Future;

use duckchat_core::{IdentityProvider, Room, RoomId, UserId, UserIdentity, resolve_identity};
use duckchat_proto::rest::RoomSummary;

use crate::RuntimeError;

/// Room list and membership, consulted before a room is opened.
pub trait RoomDirectory: Send + Sync {
    /// Directory failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Rooms `user` belongs to.
    fn list_rooms(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<RoomSummary>, Self::Error>> + Send;

    /// Register `user` as a member of `room`.
    fn join_room(
        &self,
        room: &RoomId,
        user: &UserId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Resolve the signed-in user and register them with `room`.
///
/// Returns the identity to open the room with. No live-channel join is
/// attempted for an unauthenticated user.
///
/// # Errors
///
/// - `RuntimeError::Identity` if nobody is signed in or the profile lookup
///   fails
/// - `RuntimeError::Directory` if the directory refuses the join
pub async fn open_room<P, R>(
    identity: &P,
    directory: &R,
    room: &Room,
) -> Result<UserIdentity, RuntimeError>
where
    P: IdentityProvider,
    R: RoomDirectory,
{
    let user = resolve_identity(identity).await?;

    directory
        .join_room(&room.id, user.id())
        .await
        .map_err(|e| RuntimeError::Directory { reason: e.to_string() })?;

    tracing::info!(room = %room.id, user = %user.id(), "registered with room");
    Ok(user)
}

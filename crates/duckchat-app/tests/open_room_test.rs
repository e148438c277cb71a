//! Opening a room through the identity provider and the directory.

use std::sync::atomic::{AtomicUsize, Ordering};

use duckchat_app::{RoomDirectory, RuntimeError, open_room};
use duckchat_core::{IdentityError, IdentityProvider, Profile, Room, RoomId, UserId};
use duckchat_proto::rest::RoomSummary;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FakeError(String);

struct FakeIdentity {
    user: Option<&'static str>,
    profile_fails: bool,
}

impl IdentityProvider for FakeIdentity {
    type Error = FakeError;

    async fn current_user_id(&self) -> Option<UserId> {
        self.user.map(UserId::new)
    }

    async fn current_user_profile(&self, _id: &UserId) -> Result<Profile, FakeError> {
        if self.profile_fails {
            return Err(FakeError("404".into()));
        }
        Ok(Profile { name: "alice".into(), avatar_url: "https://img/a.png".into() })
    }
}

#[derive(Default)]
struct FakeDirectory {
    refuse: bool,
    joins: AtomicUsize,
}

impl RoomDirectory for FakeDirectory {
    type Error = FakeError;

    async fn list_rooms(&self, _user: &UserId) -> Result<Vec<RoomSummary>, FakeError> {
        Ok(Vec::new())
    }

    async fn join_room(&self, _room: &RoomId, _user: &UserId) -> Result<(), FakeError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(FakeError("room is full".into()));
        }
        Ok(())
    }
}

fn lobby() -> Room {
    Room::new("r1", "lobby")
}

#[tokio::test]
async fn signed_in_user_is_registered() {
    let identity = FakeIdentity { user: Some("u1"), profile_fails: false };
    let directory = FakeDirectory::default();

    let user = open_room(&identity, &directory, &lobby()).await.unwrap();
    assert_eq!(user.id(), &UserId::new("u1"));
    assert_eq!(user.display_name(), "alice");
    assert_eq!(directory.joins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthenticated_user_never_joins() {
    let identity = FakeIdentity { user: None, profile_fails: false };
    let directory = FakeDirectory::default();

    let result = open_room(&identity, &directory, &lobby()).await;
    assert_eq!(result, Err(RuntimeError::Identity(IdentityError::NotAuthenticated)));
    assert_eq!(directory.joins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn profile_failure_never_joins() {
    let identity = FakeIdentity { user: Some("u1"), profile_fails: true };
    let directory = FakeDirectory::default();

    let result = open_room(&identity, &directory, &lobby()).await;
    assert!(matches!(result, Err(RuntimeError::Identity(IdentityError::ProfileUnavailable { .. }))));
    assert_eq!(directory.joins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn directory_refusal_is_reported() {
    let identity = FakeIdentity { user: Some("u1"), profile_fails: false };
    let directory = FakeDirectory { refuse: true, ..FakeDirectory::default() };

    let result = open_room(&identity, &directory, &lobby()).await;
    assert_eq!(result, Err(RuntimeError::Directory { reason: "room is full".into() }));
}

//! The signed-in user.
//!
//! Identity is resolved once, when a room is opened, and passed into the
//! [`crate::RoomSession`] as a value. Nothing re-reads credential storage per
//! call.

use std::future::Future;

use crate::{error::IdentityError, message::UserId};

/// Display profile of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Display name.
    pub name: String,
    /// Avatar URL. Empty when the user has none.
    pub avatar_url: String,
}

/// Read-only snapshot of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    id: UserId,
    display_name: String,
    avatar_url: String,
}

impl UserIdentity {
    /// Create an identity snapshot.
    pub fn new(id: UserId, display_name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self { id, display_name: display_name.into(), avatar_url: avatar_url.into() }
    }

    /// User id.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Display name shown to other room members.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Avatar URL.
    pub fn avatar_url(&self) -> &str {
        &self.avatar_url
    }
}

/// Auth/profile collaborator.
///
/// Implementations typically read a stored session token and call the user
/// endpoint of the REST API.
pub trait IdentityProvider: Send + Sync {
    /// Profile lookup error.
    type Error: std::fmt::Display;

    /// Id of the signed-in user. `None` means not authenticated.
    fn current_user_id(&self) -> impl Future<Output = Option<UserId>> + Send;

    /// Display profile for `id`.
    fn current_user_profile(
        &self,
        id: &UserId,
    ) -> impl Future<Output = Result<Profile, Self::Error>> + Send;
}

/// Resolve the signed-in user into an identity snapshot.
///
/// # Errors
///
/// - `IdentityError::NotAuthenticated` if no user is signed in
/// - `IdentityError::ProfileUnavailable` if the profile lookup fails
pub async fn resolve_identity<P: IdentityProvider>(
    provider: &P,
) -> Result<UserIdentity, IdentityError> {
    let Some(id) = provider.current_user_id().await else {
        return Err(IdentityError::NotAuthenticated);
    };

    let profile = provider
        .current_user_profile(&id)
        .await
        .map_err(|e| IdentityError::ProfileUnavailable { reason: e.to_string() })?;

    tracing::debug!(user = %id, name = %profile.name, "resolved identity");
    Ok(UserIdentity::new(id, profile.name, profile.avatar_url))
}

#[cfg(test)]
mod tests {
    use std::{
        pin::pin,
        task::{Context, Poll, Waker},
    };

    use super::*;

    struct StaticProvider {
        user: Option<&'static str>,
        profile: Result<Profile, String>,
    }

    impl IdentityProvider for StaticProvider {
        type Error = String;

        async fn current_user_id(&self) -> Option<UserId> {
            self.user.map(UserId::new)
        }

        async fn current_user_profile(&self, _id: &UserId) -> Result<Profile, String> {
            self.profile.clone()
        }
    }

    fn ready<F: Future>(fut: F) -> F::Output {
        let mut fut = pin!(fut);
        let mut cx = Context::from_waker(Waker::noop());
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(out) => out,
            Poll::Pending => panic!("future should resolve immediately"),
        }
    }

    fn alice() -> Profile {
        Profile { name: "alice".into(), avatar_url: "https://img/a.png".into() }
    }

    #[test]
    fn absent_user_is_not_authenticated() {
        let provider = StaticProvider { user: None, profile: Ok(alice()) };
        assert_eq!(ready(resolve_identity(&provider)), Err(IdentityError::NotAuthenticated));
    }

    #[test]
    fn resolves_profile_into_identity() {
        let provider = StaticProvider { user: Some("u1"), profile: Ok(alice()) };
        let identity = ready(resolve_identity(&provider)).unwrap();

        assert_eq!(identity.id().as_str(), "u1");
        assert_eq!(identity.display_name(), "alice");
        assert_eq!(identity.avatar_url(), "https://img/a.png");
    }

    #[test]
    fn profile_failure_is_reported() {
        let provider = StaticProvider { user: Some("u1"), profile: Err("404".into()) };
        assert_eq!(
            ready(resolve_identity(&provider)),
            Err(IdentityError::ProfileUnavailable { reason: "404".into() })
        );
    }
}

//! One user's membership in one room.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐  join   ┌────────┐  leave   ┌─────────┐        ┌──────┐
//! │ Joining │────────>│ Active │─────────>│ Leaving │───────>│ Left │
//! └─────────┘         └────────┘          └─────────┘        └──────┘
//!      │                                       ▲
//!      └─────────────── leave ─────────────────┘
//! ```
//!
//! Status only ever advances. `leave()` always reaches `Left`, whatever the
//! connection is doing.

use duckchat_proto::{Event, OutgoingMessage};

use crate::{
    connection::{ConnectionAction, ConnectionManager},
    env::Environment,
    error::SessionError,
    identity::UserIdentity,
    message::{ArrivedVia, Message, MessageId, RoomId},
};

/// Lifecycle of a [`RoomSession`]. Ordered by progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionStatus {
    /// Created, presence not yet announced.
    Joining,
    /// Presence announced. Sends permitted.
    Active,
    /// Departure in progress.
    Leaving,
    /// Terminal.
    Left,
}

/// A chat room as the session addresses it.
///
/// History and message payloads key on `id`. The live channel keys membership
/// on `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Room {
    /// Server-assigned room id.
    pub id: RoomId,
    /// Room display name.
    pub name: String,
}

impl Room {
    /// Create a room reference.
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// One user's membership in one room.
///
/// Owned exclusively by whoever opened the room. Borrows the room's
/// [`ConnectionManager`] per call rather than holding it, so per-room leave
/// and channel disconnect stay separate operations.
#[derive(Debug, Clone)]
pub struct RoomSession {
    room: Room,
    identity: UserIdentity,
    status: SessionStatus,
}

impl RoomSession {
    /// Create a session in [`SessionStatus::Joining`].
    pub fn new(room: Room, identity: UserIdentity) -> Self {
        Self { room, identity, status: SessionStatus::Joining }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Room this session belongs to.
    #[must_use]
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Identity the session was opened with.
    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Announce presence with `joinGroup(userName, roomName)`.
    ///
    /// Moves to `Active` once the event is handed to the connection. No
    /// server acknowledgement is awaited. Joining an already active session
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotActive` if leaving or left
    /// - `SessionError::Connection` if the channel is not connected; the
    ///   session stays `Joining` and the join can be retried
    pub fn join(
        &mut self,
        conn: &mut ConnectionManager,
    ) -> Result<Vec<ConnectionAction>, SessionError> {
        match self.status {
            SessionStatus::Joining => {},
            SessionStatus::Active => return Ok(vec![]),
            status @ (SessionStatus::Leaving | SessionStatus::Left) => {
                return Err(SessionError::NotActive { status });
            },
        }

        let actions = conn.send(self.join_event())?;
        self.advance(SessionStatus::Active);
        tracing::info!(room = %self.room.id, name = %self.room.name, user = %self.identity.id(), "joined room");

        Ok(actions)
    }

    /// Re-announce presence after the transport reconnected.
    ///
    /// The server forgets socket membership across reconnects. Status does
    /// not change.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotActive` unless `Active`
    /// - `SessionError::Connection` if the channel is not connected
    pub fn rejoin(
        &mut self,
        conn: &mut ConnectionManager,
    ) -> Result<Vec<ConnectionAction>, SessionError> {
        if self.status != SessionStatus::Active {
            return Err(SessionError::NotActive { status: self.status });
        }

        tracing::debug!(room = %self.room.id, "re-announcing presence");
        Ok(conn.send(self.join_event())?)
    }

    /// Publish a message.
    ///
    /// Builds a [`Message`] with a fresh client-generated id and hands a
    /// `sendMessage` event to the connection. The returned message is not
    /// appended anywhere: the server echoes it back over the live channel and
    /// it dedups by id from there.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotActive` unless `Active`
    /// - `SessionError::EmptyMessage` if `body` is blank
    /// - `SessionError::Connection` if the channel is not connected
    pub fn send<E: Environment>(
        &self,
        body: &str,
        env: &E,
        conn: &mut ConnectionManager,
    ) -> Result<(Message, Vec<ConnectionAction>), SessionError> {
        if self.status != SessionStatus::Active {
            return Err(SessionError::NotActive { status: self.status });
        }

        if body.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let message = Message {
            id: MessageId::generate(env),
            room_id: self.room.id.clone(),
            author_id: self.identity.id().clone(),
            author_name: self.identity.display_name().to_string(),
            author_avatar_url: self.identity.avatar_url().to_string(),
            body: body.to_string(),
            arrived_via: ArrivedVia::Live,
            sequence_hint: None,
        };

        let actions = conn.send(Event::SendMessage(OutgoingMessage {
            id: message.id.to_string(),
            room_id: message.room_id.to_string(),
            author_id: message.author_id.to_string(),
            author_name: message.author_name.clone(),
            author_avatar_url: message.author_avatar_url.clone(),
            body: message.body.clone(),
        }))?;

        Ok((message, actions))
    }

    /// Leave the room without touching the channel.
    ///
    /// Sends a best-effort `leaveGroup(roomName)` if presence was announced;
    /// a send failure is logged and ignored. Always ends `Left`. Idempotent.
    pub fn unsubscribe(&mut self, conn: &mut ConnectionManager) -> Vec<ConnectionAction> {
        let was = self.status;
        if was >= SessionStatus::Leaving {
            return vec![];
        }

        self.advance(SessionStatus::Leaving);

        let mut actions = Vec::new();
        if was == SessionStatus::Active {
            match conn.send(Event::LeaveGroup { room_name: self.room.name.clone() }) {
                Ok(sent) => actions.extend(sent),
                Err(e) => tracing::debug!(room = %self.room.id, error = %e, "leaveGroup not sent"),
            }
        }

        self.advance(SessionStatus::Left);
        tracing::info!(room = %self.room.id, "left room");

        actions
    }

    /// Leave the room and disconnect the channel. Idempotent; always ends
    /// `Left` with the connection `Disconnected`.
    pub fn leave(&mut self, conn: &mut ConnectionManager) -> Vec<ConnectionAction> {
        let mut actions = self.unsubscribe(conn);
        actions.extend(conn.disconnect());
        actions
    }

    fn join_event(&self) -> Event {
        Event::JoinGroup {
            user_name: self.identity.display_name().to_string(),
            room_name: self.room.name.clone(),
        }
    }

    fn advance(&mut self, to: SessionStatus) {
        debug_assert!(to > self.status, "session status regressed: {:?} -> {to:?}", self.status);
        self.status = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::{ConnectionState, TransportEvent},
        error::ConnectionError,
        message::UserId,
    };

    #[derive(Clone)]
    struct CountingEnv;

    impl Environment for CountingEnv {
        type Instant = std::time::Duration;

        fn now(&self) -> Self::Instant {
            std::time::Duration::ZERO
        }

        async fn sleep(&self, _duration: std::time::Duration) {}

        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, b) in buffer.iter_mut().enumerate() {
                *b = u8::try_from(i).unwrap();
            }
        }
    }

    fn session() -> RoomSession {
        RoomSession::new(
            Room::new("r1", "lobby"),
            UserIdentity::new(UserId::new("u1"), "alice", "https://img/a.png"),
        )
    }

    fn connected() -> ConnectionManager {
        let mut conn = ConnectionManager::new();
        conn.connect("ws://chat").unwrap();
        conn.handle(TransportEvent::Opened).unwrap();
        conn
    }

    #[test]
    fn join_announces_presence_and_activates() {
        let mut conn = connected();
        let mut session = session();

        let actions = session.join(&mut conn).unwrap();
        assert_eq!(actions, vec![ConnectionAction::Transmit(Event::JoinGroup {
            user_name: "alice".into(),
            room_name: "lobby".into(),
        })]);
        assert_eq!(session.status(), SessionStatus::Active);

        assert!(session.join(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn join_while_disconnected_stays_joining() {
        let mut conn = ConnectionManager::new();
        let mut session = session();

        let err = session.join(&mut conn).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(session.status(), SessionStatus::Joining);
    }

    #[test]
    fn send_builds_message_from_identity() {
        let mut conn = connected();
        let mut session = session();
        session.join(&mut conn).unwrap();

        let (message, actions) = session.send("hello", &CountingEnv, &mut conn).unwrap();
        assert_eq!(message.id.as_str(), "000102030405060708090a0b0c0d0e0f");
        assert_eq!(message.author_name, "alice");
        assert_eq!(message.arrived_via, ArrivedVia::Live);
        assert_eq!(message.sequence_hint, None);

        let [ConnectionAction::Transmit(Event::SendMessage(out))] = actions.as_slice() else {
            panic!("expected one sendMessage");
        };
        assert_eq!(out.id, message.id.as_str());
        assert_eq!(out.room_id, "r1");
        assert_eq!(out.body, "hello");
    }

    #[test]
    fn send_rejects_blank_body() {
        let mut conn = connected();
        let mut session = session();
        session.join(&mut conn).unwrap();

        assert_eq!(
            session.send("  \n", &CountingEnv, &mut conn).unwrap_err(),
            SessionError::EmptyMessage
        );
    }

    #[test]
    fn send_before_join_is_not_active() {
        let mut conn = connected();
        assert_eq!(
            session().send("hi", &CountingEnv, &mut conn).unwrap_err(),
            SessionError::NotActive { status: SessionStatus::Joining }
        );
    }

    #[test]
    fn send_while_reconnecting_is_transient() {
        let mut conn = connected();
        let mut session = session();
        session.join(&mut conn).unwrap();
        conn.handle(TransportEvent::Lost { reason: "reset".into() }).unwrap();

        let err = session.send("hi", &CountingEnv, &mut conn).unwrap_err();
        assert_eq!(
            err,
            SessionError::Connection(ConnectionError::NotConnected {
                state: ConnectionState::Reconnecting,
            })
        );
        assert!(err.is_transient());
    }

    #[test]
    fn leave_sends_leave_group_then_disconnects() {
        let mut conn = connected();
        let mut session = session();
        session.join(&mut conn).unwrap();

        let actions = session.leave(&mut conn);
        assert_eq!(actions, vec![
            ConnectionAction::Transmit(Event::LeaveGroup { room_name: "lobby".into() }),
            ConnectionAction::Close,
        ]);
        assert_eq!(session.status(), SessionStatus::Left);
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        assert!(session.leave(&mut conn).is_empty());
    }

    #[test]
    fn leave_survives_lost_connection() {
        let mut conn = connected();
        let mut session = session();
        session.join(&mut conn).unwrap();
        conn.handle(TransportEvent::Lost { reason: "reset".into() }).unwrap();

        assert_eq!(session.leave(&mut conn), vec![ConnectionAction::Close]);
        assert_eq!(session.status(), SessionStatus::Left);
    }

    #[test]
    fn unsubscribe_keeps_channel_open() {
        let mut conn = connected();
        let mut session = session();
        session.join(&mut conn).unwrap();

        session.unsubscribe(&mut conn);
        assert_eq!(session.status(), SessionStatus::Left);
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[test]
    fn rejoin_requires_active() {
        let mut conn = connected();
        let mut session = session();
        assert!(session.rejoin(&mut conn).is_err());

        session.join(&mut conn).unwrap();
        assert_eq!(session.rejoin(&mut conn).unwrap().len(), 1);
        assert_eq!(session.status(), SessionStatus::Active);

        session.leave(&mut conn);
        assert_eq!(
            session.join(&mut conn).unwrap_err(),
            SessionError::NotActive { status: SessionStatus::Left }
        );
    }
}

//! One open chat room.
//!
//! [`ChatRoom`] owns the room's [`ConnectionManager`], [`RoomSession`], and
//! [`MessageStream`] and routes between them. Like the core machines it does
//! no I/O: connection actions accumulate until the driver takes them with
//! [`ChatRoom::take_outgoing`].
//!
//! # Responsibilities
//!
//! - Announces presence once the channel opens, and again after a reconnect.
//! - Routes inbound `messageReceived` events for this room into the stream.
//! - Tags each history load with a [`HistoryTicket`] and drops results that
//!   are stale or arrive after leave.

use duckchat_core::{
    ConnectionAction, ConnectionError, ConnectionManager, ConnectionState, Environment,
    HistoryBatch, HistoryError, Message, MessageStream, Room, RoomSession, SessionError,
    SessionStatus, StateChange, StreamEvent, SubscriptionId, TransportEvent, UserIdentity,
};
use duckchat_proto::Event;

/// Identifies one history load.
///
/// Only the most recently issued ticket is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryTicket(u64);

/// One open room: connection, session, and merged message stream.
pub struct ChatRoom<E: Environment> {
    env: E,
    conn: ConnectionManager,
    session: RoomSession,
    stream: MessageStream,
    history_generation: u64,
    outgoing: Vec<ConnectionAction>,
}

impl<E: Environment> std::fmt::Debug for ChatRoom<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRoom")
            .field("conn", &self.conn)
            .field("session", &self.session)
            .field("stream", &self.stream)
            .field("history_generation", &self.history_generation)
            .finish_non_exhaustive()
    }
}

impl<E: Environment> ChatRoom<E> {
    /// Create a room for `identity`. Nothing is connected yet.
    pub fn new(env: E, room: Room, identity: UserIdentity) -> Self {
        let stream = MessageStream::new(room.id.clone());
        Self {
            env,
            conn: ConnectionManager::new(),
            session: RoomSession::new(room, identity),
            stream,
            history_generation: 0,
            outgoing: Vec::new(),
        }
    }

    /// Room being chatted in.
    pub fn room(&self) -> &Room {
        self.session.room()
    }

    /// Session status.
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Live-channel state.
    pub fn connection_state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Merged messages in arrival order.
    pub fn messages(&self) -> &[Message] {
        self.stream.messages()
    }

    /// The merged stream.
    pub fn stream(&self) -> &MessageStream {
        &self.stream
    }

    /// Subscribe to stream appends and history warnings.
    pub fn subscribe(
        &mut self,
        handler: impl FnMut(&StreamEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.stream.subscribe(handler)
    }

    /// Remove a stream subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.stream.unsubscribe(id)
    }

    /// Observe live-channel state transitions.
    pub fn on_connection_change(&mut self, handler: impl FnMut(StateChange) + Send + 'static) {
        self.conn.on_state_change(handler);
    }

    /// Start connecting the live channel.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if already connecting or connected,
    ///   or if the room has been left
    pub fn open(&mut self, endpoint: &str) -> Result<(), ConnectionError> {
        if self.session.status() >= SessionStatus::Leaving {
            return Err(ConnectionError::InvalidState {
                state: self.conn.state(),
                operation: "open a left room",
            });
        }
        let actions = self.conn.connect(endpoint)?;
        self.outgoing.extend(actions);
        Ok(())
    }

    /// Process a transport report.
    ///
    /// Whenever the channel becomes connected the session (re)announces
    /// presence: a first join while `Joining`, a rejoin while `Active`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Unreachable` if the transport gave up. The channel
    ///   is disconnected and the session stays where it was.
    pub fn handle_transport(&mut self, event: TransportEvent) -> Result<(), ConnectionError> {
        let before = self.conn.state();
        let inbound = self.conn.handle(event)?;

        if before != ConnectionState::Connected && self.conn.state() == ConnectionState::Connected {
            self.announce();
        }

        for event in inbound {
            match event {
                Event::MessageReceived(payload) => {
                    self.stream.live_message(Message::from_live(payload));
                },
                other => {
                    tracing::debug!(event = other.name(), "ignoring inbound event");
                },
            }
        }

        Ok(())
    }

    /// Publish a message.
    ///
    /// The message shows up in the stream once the server echoes it.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotActive` unless joined
    /// - `SessionError::EmptyMessage` for a blank body
    /// - `SessionError::Connection` while the channel is down
    pub fn send(&mut self, body: &str) -> Result<Message, SessionError> {
        let (message, actions) = self.session.send(body, &self.env, &mut self.conn)?;
        self.outgoing.extend(actions);
        Ok(message)
    }

    /// Issue a ticket for a new history load, invalidating earlier ones.
    pub fn begin_history(&mut self) -> HistoryTicket {
        self.history_generation += 1;
        HistoryTicket(self.history_generation)
    }

    /// Deliver the result of the load identified by `ticket`.
    ///
    /// Returns false if the result was discarded: a newer load was issued,
    /// or the room was left while the load was in flight.
    pub fn history_resolved(
        &mut self,
        ticket: HistoryTicket,
        result: Result<HistoryBatch, HistoryError>,
    ) -> bool {
        if ticket.0 != self.history_generation || self.session.status() >= SessionStatus::Leaving {
            tracing::debug!(
                room = %self.room().id,
                ?ticket,
                current = self.history_generation,
                status = ?self.session.status(),
                "discarding stale history"
            );
            return false;
        }

        match result {
            Ok(batch) => {
                self.stream.history_loaded(batch);
            },
            Err(e) => self.stream.history_failed(&e),
        }

        true
    }

    /// Leave the room, disconnect, and discard the stream. Idempotent.
    pub fn leave(&mut self) {
        let actions = self.session.leave(&mut self.conn);
        self.outgoing.extend(actions);
        self.stream.teardown();
    }

    /// Take pending connection actions for the driver.
    pub fn take_outgoing(&mut self) -> Vec<ConnectionAction> {
        std::mem::take(&mut self.outgoing)
    }

    fn announce(&mut self) {
        let result = match self.session.status() {
            SessionStatus::Joining => self.session.join(&mut self.conn),
            SessionStatus::Active => self.session.rejoin(&mut self.conn),
            SessionStatus::Leaving | SessionStatus::Left => return,
        };

        match result {
            Ok(actions) => self.outgoing.extend(actions),
            Err(e) => tracing::warn!(room = %self.room().id, error = %e, "presence not announced"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    };

    use duckchat_core::{ArrivedVia, HistoryState, RoomId, UserId};
    use duckchat_proto::{IncomingMessage, rest::HistoryRecord};

    use super::*;

    #[derive(Clone, Default)]
    struct TestEnv(Arc<AtomicU8>);

    impl Environment for TestEnv {
        type Instant = std::time::Duration;

        fn now(&self) -> Self::Instant {
            std::time::Duration::ZERO
        }

        async fn sleep(&self, _duration: std::time::Duration) {}

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(self.0.fetch_add(1, Ordering::Relaxed));
        }
    }

    fn room() -> ChatRoom<TestEnv> {
        ChatRoom::new(
            TestEnv::default(),
            Room::new("r1", "lobby"),
            UserIdentity::new(UserId::new("u1"), "alice", ""),
        )
    }

    fn opened() -> ChatRoom<TestEnv> {
        let mut room = room();
        room.open("ws://chat").unwrap();
        room.handle_transport(TransportEvent::Opened).unwrap();
        room.take_outgoing();
        room
    }

    fn received(id: &str, room_id: &str) -> TransportEvent {
        TransportEvent::Inbound(Event::MessageReceived(IncomingMessage {
            id: id.into(),
            room_id: room_id.into(),
            author_id: "u2".into(),
            author_name: "bob".into(),
            author_avatar_url: String::new(),
            body: "hey".into(),
        }))
    }

    fn batch(ids: &[&str]) -> HistoryBatch {
        HistoryBatch::new(
            RoomId::new("r1"),
            ids.iter()
                .map(|id| HistoryRecord {
                    id: (*id).into(),
                    message: "old".into(),
                    user_id: "u2".into(),
                    user_name: "bob".into(),
                    user_img_url: String::new(),
                })
                .collect(),
        )
    }

    fn join_event() -> ConnectionAction {
        ConnectionAction::Transmit(Event::JoinGroup {
            user_name: "alice".into(),
            room_name: "lobby".into(),
        })
    }

    #[test]
    fn opening_joins_once_connected() {
        let mut room = room();
        room.open("ws://chat").unwrap();
        assert_eq!(room.take_outgoing(), vec![ConnectionAction::Open {
            endpoint: "ws://chat".into()
        }]);
        assert_eq!(room.status(), SessionStatus::Joining);

        room.handle_transport(TransportEvent::Opened).unwrap();
        assert_eq!(room.take_outgoing(), vec![join_event()]);
        assert_eq!(room.status(), SessionStatus::Active);
    }

    #[test]
    fn reconnect_rejoins() {
        let mut room = opened();

        room.handle_transport(TransportEvent::Lost { reason: "reset".into() }).unwrap();
        assert!(room.take_outgoing().is_empty());

        room.handle_transport(TransportEvent::Reconnected).unwrap();
        assert_eq!(room.take_outgoing(), vec![join_event()]);
        assert_eq!(room.status(), SessionStatus::Active);
    }

    #[test]
    fn inbound_messages_for_other_rooms_are_ignored() {
        let mut room = opened();
        room.handle_transport(received("m1", "r1")).unwrap();
        room.handle_transport(received("m2", "r9")).unwrap();

        let ids: Vec<_> = room.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1"]);
    }

    #[test]
    fn own_message_appears_once_via_echo() {
        let mut room = opened();
        let sent = room.send("hello").unwrap();
        assert!(room.messages().is_empty());

        let echo = TransportEvent::Inbound(Event::MessageReceived(IncomingMessage {
            id: sent.id.to_string(),
            room_id: "r1".into(),
            author_id: "u1".into(),
            author_name: "alice".into(),
            author_avatar_url: String::new(),
            body: "hello".into(),
        }));
        room.handle_transport(echo.clone()).unwrap();
        room.handle_transport(echo).unwrap();

        assert_eq!(room.messages().len(), 1);
        assert!(room.messages()[0].is_from(&UserId::new("u1")));
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut room = opened();
        let first = room.begin_history();
        let second = room.begin_history();

        assert!(!room.history_resolved(first, Ok(batch(&["1"]))));
        assert!(room.history_resolved(second, Ok(batch(&["2"]))));

        let ids: Vec<_> = room.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
        assert_eq!(room.messages()[0].arrived_via, ArrivedVia::History);
    }

    #[test]
    fn history_after_leave_is_discarded() {
        let mut room = opened();
        let ticket = room.begin_history();

        room.leave();
        assert!(!room.history_resolved(ticket, Ok(batch(&["1", "2"]))));
        assert!(room.messages().is_empty());
        assert_eq!(room.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn history_failure_keeps_live_flowing() {
        let mut room = opened();
        let ticket = room.begin_history();

        room.history_resolved(ticket, Err(HistoryError::unavailable(&RoomId::new("r1"), "503")));
        room.handle_transport(received("m1", "r1")).unwrap();

        assert_eq!(room.stream().history_state(), HistoryState::Failed);
        assert_eq!(room.messages().len(), 1);
    }

    #[test]
    fn unreachable_leaves_session_joining() {
        let mut room = room();
        room.open("ws://chat").unwrap();

        let err = room.handle_transport(TransportEvent::Failed { reason: "refused".into() });
        assert!(matches!(err, Err(ConnectionError::Unreachable { .. })));
        assert_eq!(room.status(), SessionStatus::Joining);
    }

    #[test]
    fn left_room_cannot_reopen() {
        let mut room = opened();
        room.leave();
        room.take_outgoing();

        assert!(matches!(room.open("ws://chat"), Err(ConnectionError::InvalidState { .. })));
        assert!(room.take_outgoing().is_empty());
    }
}

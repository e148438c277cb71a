//! Merged, duplicate-free message sequence for one room.
//!
//! Two sources feed the buffer: the one-shot history backlog and live
//! inbound events. They race. Neither waits for the other; every message is
//! appended the moment it arrives unless its id was already seen.
//!
//! # Ordering
//!
//! The buffer is ordered by arrival into the buffer, nothing else:
//!
//! ```text
//! history [1,2] then live 3   ->  [1,2,3]
//! live 3 then history [1,2]   ->  [3,1,2]
//! live 1 then history [1,2]   ->  [1,2]
//! ```
//!
//! Live messages that race ahead of the backlog stay ahead of it. There is no
//! timestamp reordering.
//!
//! # Invariants
//!
//! - Each id is appended at most once.
//! - The buffer only grows until [`MessageStream::teardown`], which discards
//!   everything and ignores all later appends.

use std::collections::HashSet;

use crate::{
    error::HistoryError,
    message::{Message, MessageId, RoomId},
};

/// Progress of the room's backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryState {
    /// Not loaded yet.
    Pending,
    /// Backlog merged into the buffer.
    Loaded,
    /// Backlog could not be fetched. The stream runs live-only.
    Failed,
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A message was appended at `index`.
    Appended {
        /// Position in the buffer.
        index: usize,
        /// The appended message.
        message: Message,
    },
    /// History failed to load. Non-fatal; delivered at most once per stream.
    HistoryUnavailable {
        /// Failure description.
        reason: String,
    },
}

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&StreamEvent) + Send>;

/// Merges backlog and live messages for one room.
pub struct MessageStream {
    room_id: RoomId,
    buffer: Vec<Message>,
    seen: HashSet<MessageId>,
    history: HistoryState,
    warned: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    closed: bool,
}

impl std::fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream")
            .field("room_id", &self.room_id)
            .field("len", &self.buffer.len())
            .field("history", &self.history)
            .field("subscribers", &self.subscribers.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl MessageStream {
    /// Create an empty stream for `room_id`.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            buffer: Vec::new(),
            seen: HashSet::new(),
            history: HistoryState::Pending,
            warned: false,
            subscribers: Vec::new(),
            next_subscription: 0,
            closed: false,
        }
    }

    /// Room this stream merges.
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Messages in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.buffer
    }

    /// Number of buffered messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// True if a message with `id` was appended.
    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    /// Backlog progress.
    #[must_use]
    pub fn history_state(&self) -> HistoryState {
        self.history
    }

    /// True after [`MessageStream::teardown`].
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Merge a history batch. Returns how many messages were appended.
    ///
    /// Ids already in the buffer (live messages that raced ahead, or a
    /// repeated load) are skipped. Marks history loaded.
    pub fn history_loaded(&mut self, batch: impl IntoIterator<Item = Message>) -> usize {
        if self.closed {
            tracing::debug!(room = %self.room_id, "history after teardown, discarding");
            return 0;
        }

        let mut appended = 0;
        for message in batch {
            if self.accept(&message) && self.append(message) {
                appended += 1;
            }
        }

        self.history = HistoryState::Loaded;
        tracing::debug!(room = %self.room_id, appended, total = self.buffer.len(), "history merged");

        appended
    }

    /// Record that the backlog failed to load.
    ///
    /// The stream keeps accepting live messages. Subscribers get one
    /// [`StreamEvent::HistoryUnavailable`] per stream, however many loads
    /// fail.
    pub fn history_failed(&mut self, error: &HistoryError) {
        if self.closed {
            return;
        }

        tracing::warn!(room = %self.room_id, %error, "history unavailable, continuing live-only");

        if self.history == HistoryState::Pending {
            self.history = HistoryState::Failed;
        }

        if !self.warned {
            self.warned = true;
            self.notify(&StreamEvent::HistoryUnavailable { reason: error.to_string() });
        }
    }

    /// Merge one live message. Returns true if it was appended.
    pub fn live_message(&mut self, message: Message) -> bool {
        if self.closed || !self.accept(&message) {
            return false;
        }

        self.append(message)
    }

    /// Register a subscriber, notified synchronously on every append.
    pub fn subscribe(&mut self, handler: impl FnMut(&StreamEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Discard the buffer, the seen set, and all subscriptions.
    ///
    /// Terminal: every later append is ignored.
    pub fn teardown(&mut self) {
        self.buffer = Vec::new();
        self.seen = HashSet::new();
        self.subscribers.clear();
        self.closed = true;
    }

    fn accept(&self, message: &Message) -> bool {
        if message.room_id == self.room_id {
            return true;
        }

        tracing::debug!(
            room = %self.room_id,
            other = %message.room_id,
            id = %message.id,
            "message for another room, dropping"
        );
        false
    }

    fn append(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            tracing::debug!(room = %self.room_id, id = %message.id, via = ?message.arrived_via, "duplicate message");
            return false;
        }

        let index = self.buffer.len();
        self.buffer.push(message.clone());
        self.notify(&StreamEvent::Appended { index, message });

        true
    }

    fn notify(&mut self, event: &StreamEvent) {
        for (_, handler) in &mut self.subscribers {
            handler(event);
        }
    }
}

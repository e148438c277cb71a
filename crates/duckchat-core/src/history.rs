//! Room backlog, fetched once per load.

use std::{future::Future, vec};

use duckchat_proto::rest::HistoryRecord;

use crate::{
    error::HistoryError,
    message::{ArrivedVia, Message, MessageId, RoomId, UserId},
};

/// One fetched backlog, normalized lazily into [`Message`]s.
///
/// Finite and non-restartable: iterating consumes it, and it is deliberately
/// not `Clone`. Each message carries its position in the batch as
/// `sequence_hint`.
#[derive(Debug)]
pub struct HistoryBatch {
    room_id: RoomId,
    records: vec::IntoIter<HistoryRecord>,
    position: u64,
}

impl HistoryBatch {
    /// Wrap the records fetched for `room_id`, oldest first.
    pub fn new(room_id: RoomId, records: Vec<HistoryRecord>) -> Self {
        Self { room_id, records: records.into_iter(), position: 0 }
    }

    /// A batch with no messages.
    pub fn empty(room_id: RoomId) -> Self {
        Self::new(room_id, Vec::new())
    }

    /// Room the batch was fetched for.
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }
}

impl Iterator for HistoryBatch {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        let record = self.records.next()?;
        let position = self.position;
        self.position += 1;

        Some(Message {
            id: MessageId::new(record.id),
            room_id: self.room_id.clone(),
            author_id: UserId::new(record.user_id),
            author_name: record.user_name,
            author_avatar_url: record.user_img_url,
            body: record.message,
            arrived_via: ArrivedVia::History,
            sequence_hint: Some(position),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for HistoryBatch {}

/// Fetches a room's backlog.
pub trait HistoryLoader: Send + Sync {
    /// Fetch the backlog of `room_id`. One request per call.
    ///
    /// # Errors
    ///
    /// - `HistoryError::Unavailable` on network or parse failure
    fn load(
        &self,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<HistoryBatch, HistoryError>> + Send;
}

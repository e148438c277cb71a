//! Scripted history loader.
//!
//! [`SimHistory::ready`] answers every load at once. [`SimHistory::gated`]
//! parks each load until the test completes it through the [`HistoryGate`],
//! which is how tests place a backlog response exactly between live events.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use duckchat_core::{HistoryBatch, HistoryError, HistoryLoader, RoomId};
use duckchat_proto::rest::HistoryRecord;
use tokio::sync::{mpsc, oneshot};

type LoadResult = Result<Vec<HistoryRecord>, String>;

enum Mode {
    Ready(LoadResult),
    Gated(mpsc::UnboundedSender<PendingLoad>),
}

/// [`HistoryLoader`] with scripted responses.
pub struct SimHistory {
    mode: Mode,
    loads: Arc<AtomicUsize>,
}

/// A load waiting for the test to answer it.
#[derive(Debug)]
pub struct PendingLoad {
    /// Room being loaded.
    pub room_id: RoomId,
    reply: oneshot::Sender<LoadResult>,
}

/// Test-side handle of a gated [`SimHistory`].
pub struct HistoryGate {
    loads: mpsc::UnboundedReceiver<PendingLoad>,
}

impl SimHistory {
    /// Every load returns `records`.
    pub fn ready(records: Vec<HistoryRecord>) -> Self {
        Self { mode: Mode::Ready(Ok(records)), loads: Arc::default() }
    }

    /// Every load fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self { mode: Mode::Ready(Err(reason.into())), loads: Arc::default() }
    }

    /// Every load waits for the returned gate.
    pub fn gated() -> (Self, HistoryGate) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { mode: Mode::Gated(tx), loads: Arc::default() }, HistoryGate { loads: rx })
    }

    /// Shared counter of loads started, readable after the loader moves
    /// into a runtime.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

impl HistoryLoader for SimHistory {
    async fn load(&self, room_id: &RoomId) -> Result<HistoryBatch, HistoryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        let result = match &self.mode {
            Mode::Ready(result) => result.clone(),
            Mode::Gated(gate) => {
                let (reply, answer) = oneshot::channel();
                let pending = PendingLoad { room_id: room_id.clone(), reply };
                if gate.send(pending).is_err() {
                    return Err(HistoryError::unavailable(room_id, "gate closed"));
                }
                answer.await.unwrap_or_else(|_| Err("load abandoned".to_string()))
            },
        };

        result
            .map(|records| HistoryBatch::new(room_id.clone(), records))
            .map_err(|reason| HistoryError::unavailable(room_id, reason))
    }
}

impl PendingLoad {
    /// Answer with `records`. Returns false if the load was abandoned.
    pub fn complete(self, records: Vec<HistoryRecord>) -> bool {
        self.reply.send(Ok(records)).is_ok()
    }

    /// Answer with a failure. Returns false if the load was abandoned.
    pub fn fail(self, reason: impl Into<String>) -> bool {
        self.reply.send(Err(reason.into())).is_ok()
    }
}

impl HistoryGate {
    /// Next load the runtime started.
    pub async fn next_load(&mut self) -> Option<PendingLoad> {
        self.loads.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> HistoryRecord {
        HistoryRecord {
            id: id.into(),
            message: "old".into(),
            user_id: "u2".into(),
            user_name: "bob".into(),
            user_img_url: String::new(),
        }
    }

    #[tokio::test]
    async fn ready_answers_immediately() {
        let history = SimHistory::ready(vec![record("1"), record("2")]);
        let counter = history.load_counter();

        let batch = history.load(&RoomId::new("r1")).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_is_unavailable() {
        let history = SimHistory::failing("503");
        let result = history.load(&RoomId::new("r1")).await;
        assert_eq!(result.unwrap_err(), HistoryError::unavailable(&RoomId::new("r1"), "503"));
    }

    #[tokio::test]
    async fn gated_waits_for_completion() {
        let (history, mut gate) = SimHistory::gated();
        let room_id = RoomId::new("r1");

        let (batch, completed) = tokio::join!(history.load(&room_id), async {
            let pending = gate.next_load().await.unwrap();
            assert_eq!(pending.room_id, RoomId::new("r1"));
            pending.complete(vec![record("1")])
        });

        assert!(completed);
        assert_eq!(batch.unwrap().len(), 1);
    }
}

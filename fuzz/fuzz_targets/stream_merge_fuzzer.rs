//! Fuzz target for MessageStream merging
//!
//! Interleaves backlog batches, live messages, failures, and teardown in
//! arbitrary order.
//!
//! # Invariants
//!
//! - No message id appears twice in the buffer
//! - The buffer only grows until teardown, and existing entries keep their
//!   positions
//! - Nothing is appended after teardown
//! - Messages for other rooms are never appended

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use duckchat_core::{HistoryBatch, HistoryError, Message, MessageStream, RoomId};
use duckchat_proto::{IncomingMessage, rest::HistoryRecord};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    History(Vec<u8>),
    Live { id: u8, foreign: bool },
    Fail,
    Teardown,
}

fn record(id: u8) -> HistoryRecord {
    HistoryRecord {
        id: format!("m{id}"),
        message: "old".into(),
        user_id: "u2".into(),
        user_name: "bob".into(),
        user_img_url: String::new(),
    }
}

fn live(id: u8, foreign: bool) -> Message {
    Message::from_live(IncomingMessage {
        id: format!("m{id}"),
        room_id: if foreign { "r9".into() } else { "r1".into() },
        author_id: "u2".into(),
        author_name: "bob".into(),
        author_avatar_url: String::new(),
        body: "live".into(),
    })
}

fuzz_target!(|ops: Vec<Op>| {
    let room_id = RoomId::new("r1");
    let mut stream = MessageStream::new(room_id.clone());

    for op in ops {
        let before: Vec<String> = stream.messages().iter().map(|m| m.id.to_string()).collect();

        match op {
            Op::History(ids) => {
                let batch = HistoryBatch::new(room_id.clone(), ids.into_iter().map(record).collect());
                stream.history_loaded(batch);
            },
            Op::Live { id, foreign } => {
                stream.live_message(live(id, foreign));
            },
            Op::Fail => stream.history_failed(&HistoryError::unavailable(&room_id, "fuzz")),
            Op::Teardown => stream.teardown(),
        }

        let after: Vec<String> = stream.messages().iter().map(|m| m.id.to_string()).collect();
        let unique: HashSet<&String> = after.iter().collect();
        assert_eq!(unique.len(), after.len(), "duplicate id in {after:?}");
        assert!(stream.messages().iter().all(|m| m.room_id == room_id));

        if stream.is_closed() {
            assert!(after.is_empty());
        } else {
            assert!(after.starts_with(&before), "{before:?} not a prefix of {after:?}");
        }
    }
});

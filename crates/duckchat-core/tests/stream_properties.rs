//! Property-based tests for MessageStream merging

use std::collections::HashSet;

use duckchat_core::{ArrivedVia, Message, MessageId, MessageStream, RoomId, UserId};
use proptest::prelude::*;

fn msg(id: u8, via: ArrivedVia) -> Message {
    Message {
        id: MessageId::new(id.to_string()),
        room_id: RoomId::new("r1"),
        author_id: UserId::new("u1"),
        author_name: "alice".into(),
        author_avatar_url: String::new(),
        body: format!("body {id}"),
        arrived_via: via,
        sequence_hint: None,
    }
}

/// Live messages before the backlog, the backlog, then the remaining live
/// messages.
fn merge(history: &[u8], live: &[u8], split: usize) -> MessageStream {
    let split = split.min(live.len());
    let mut stream = MessageStream::new(RoomId::new("r1"));

    for id in &live[..split] {
        stream.live_message(msg(*id, ArrivedVia::Live));
    }
    stream.history_loaded(history.iter().map(|id| msg(*id, ArrivedVia::History)));
    for id in &live[split..] {
        stream.live_message(msg(*id, ArrivedVia::Live));
    }

    stream
}

fn ids_with(stream: &MessageStream, via: ArrivedVia) -> Vec<String> {
    stream
        .messages()
        .iter()
        .filter(|m| m.arrived_via == via)
        .map(|m| m.id.to_string())
        .collect()
}

fn is_subsequence(needle: &[String], haystack: &[u8]) -> bool {
    let mut rest = haystack.iter().map(u8::to_string);
    needle.iter().all(|id| rest.any(|h| &h == id))
}

fn scenario() -> impl Strategy<Value = (Vec<u8>, Vec<u8>, usize)> {
    (
        prop::collection::vec(0u8..30, 0..25),
        prop::collection::vec(0u8..30, 0..25),
        0usize..26,
    )
}

/// Property: No id appears twice in the buffer
#[test]
fn prop_buffer_has_no_duplicates() {
    proptest!(|((history, live, split) in scenario())| {
        let stream = merge(&history, &live, split);

        let mut seen = HashSet::new();
        for message in stream.messages() {
            prop_assert!(seen.insert(message.id.clone()), "duplicate {}", message.id);
        }
    });
}

/// Property: Every distinct id from either source ends up in the buffer
#[test]
fn prop_no_message_is_lost() {
    proptest!(|((history, live, split) in scenario())| {
        let stream = merge(&history, &live, split);

        let expected: HashSet<u8> = history.iter().chain(live.iter()).copied().collect();
        prop_assert_eq!(stream.len(), expected.len());
        for id in expected {
            prop_assert!(stream.contains(&MessageId::new(id.to_string())));
        }
    });
}

/// Property: Messages appended from history keep their batch order
#[test]
fn prop_history_order_preserved() {
    proptest!(|((history, live, split) in scenario())| {
        let stream = merge(&history, &live, split);
        prop_assert!(is_subsequence(&ids_with(&stream, ArrivedVia::History), &history));
    });
}

/// Property: Live messages keep their arrival order
#[test]
fn prop_live_order_preserved() {
    proptest!(|((history, live, split) in scenario())| {
        let stream = merge(&history, &live, split);
        prop_assert!(is_subsequence(&ids_with(&stream, ArrivedVia::Live), &live));
    });
}

/// Property: Loading the same backlog twice appends nothing the second time
#[test]
fn prop_reload_is_idempotent() {
    proptest!(|((history, live, split) in scenario())| {
        let mut stream = merge(&history, &live, split);
        let before: Vec<MessageId> = stream.messages().iter().map(|m| m.id.clone()).collect();

        let appended = stream.history_loaded(history.iter().map(|id| msg(*id, ArrivedVia::History)));
        let after: Vec<MessageId> = stream.messages().iter().map(|m| m.id.clone()).collect();

        prop_assert_eq!(appended, 0);
        prop_assert_eq!(before, after);
    });
}

/// Property: The buffer never shrinks before teardown
#[test]
fn prop_buffer_never_shrinks() {
    proptest!(|(ops in prop::collection::vec((any::<bool>(), 0u8..10), 0..40))| {
        let mut stream = MessageStream::new(RoomId::new("r1"));
        let mut previous = 0;

        for (from_history, id) in ops {
            if from_history {
                stream.history_loaded([msg(id, ArrivedVia::History)]);
            } else {
                stream.live_message(msg(id, ArrivedVia::Live));
            }
            prop_assert!(stream.len() >= previous);
            previous = stream.len();
        }
    });
}

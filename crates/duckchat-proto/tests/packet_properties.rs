//! Property-based tests for live-channel packet decoding.
//!
//! Decoding is fed by the network, so it must reject garbage with an error
//! and never panic. Well-formed chat events must survive the trip through the
//! Socket.IO framing unchanged.

use duckchat_proto::{Event, IncomingMessage, OutgoingMessage, Packet};
use proptest::prelude::*;

/// Strategy for text that includes JSON-looking fragments and odd unicode.
fn arbitrary_text() -> impl Strategy<Value = String> {
    prop_oneof![
        ".*",
        "[0-6]{1,2}\\[.*\\]",
        "4[0-6][/a-z,]{0,6}\\{.*\\}",
    ]
}

fn arbitrary_incoming() -> impl Strategy<Value = IncomingMessage> {
    (".{0,16}", ".{0,16}", ".{0,16}", ".{0,16}", ".{0,32}", ".{0,64}").prop_map(
        |(id, room_id, author_id, author_name, author_avatar_url, body)| IncomingMessage {
            id,
            room_id,
            author_id,
            author_name,
            author_avatar_url,
            body,
        },
    )
}

fn arbitrary_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (".{0,16}", ".{0,16}")
            .prop_map(|(user_name, room_name)| Event::JoinGroup { user_name, room_name }),
        ".{0,16}".prop_map(|room_name| Event::LeaveGroup { room_name }),
        arbitrary_incoming().prop_map(Event::MessageReceived),
        arbitrary_incoming().prop_map(|m| {
            Event::SendMessage(OutgoingMessage {
                id: m.id,
                room_id: m.room_id,
                author_id: m.author_id,
                author_name: m.author_name,
                author_avatar_url: m.author_avatar_url,
                body: m.body,
            })
        }),
    ]
}

proptest! {
    #[test]
    fn prop_decode_never_panics(text in arbitrary_text()) {
        let _ = Packet::decode(&text);
    }

    #[test]
    fn prop_event_survives_framing(event in arbitrary_event()) {
        let text = Packet::Event(event.clone()).encode().expect("encode");
        prop_assert!(text.starts_with("42["));

        let decoded = Packet::decode(&text).expect("decode");
        prop_assert_eq!(decoded, Packet::Event(event));
    }
}

//! Fuzz target for Packet::decode
//!
//! Feeds arbitrary text frames to the Engine.IO / Socket.IO decoder to find:
//! - Parser panics on truncated or malformed type prefixes
//! - Event arrays with unexpected shapes or JSON types
//! - Oversized frames that slip past the size check
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use duckchat_proto::Packet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(packet) = Packet::decode(text) {
        let _ = packet.encode();
    }
});

//! Fuzz target: `PacketParser::parse`
//!
//! The first input byte picks a split stride and the rest is fed to the
//! parser in pieces of that size. Asserts that the parser never panics,
//! that splitting never changes the decoded events apart from how extra
//! bytes are grouped, and that no payload exceeds the length field.
//!
//! cargo fuzz run fuzz_packet_parser

#![no_main]

use crow_host::parser::{DecodeResult, MAX_PAYLOAD_SIZE, PacketParser};
use libfuzzer_sys::fuzz_target;

fn normalise(results: Vec<DecodeResult>) -> (Vec<u8>, Vec<DecodeResult>) {
    let mut extra = Vec::new();
    let mut events = Vec::new();
    for r in results {
        match r {
            DecodeResult::Extra { data } => extra.extend(data),
            other => events.push(other),
        }
    }
    (extra, events)
}

fuzz_target!(|data: &[u8]| {
    let Some((&stride, stream)) = data.split_first() else {
        return;
    };
    let stride = usize::from(stride).max(1);

    let mut whole = PacketParser::new();
    let bulk = whole.parse(stream, None);
    for r in &bulk {
        if let DecodeResult::Response { payload, .. } = r {
            assert!(payload.len() <= MAX_PAYLOAD_SIZE, "payload exceeds length field");
        }
    }

    let mut split = PacketParser::new();
    let mut pieces = Vec::new();
    for chunk in stream.chunks(stride) {
        pieces.extend(split.parse(chunk, None));
    }

    assert_eq!(normalise(bulk), normalise(pieces));
    assert_eq!(whole.min_bytes_expected(), split.min_bytes_expected());

    // After a reset the parser must accept bytes cleanly again.
    split.reset();
    assert_eq!(split.min_bytes_expected(), 5);
    let _ = split.parse(stream, Some(stride as u8));
});

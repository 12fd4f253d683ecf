//! Fuzz target: `RemoteError::from_payload`
//!
//! Arbitrary error payloads must decode or fail with a typed
//! `DetailError`, never panic.
//!
//! cargo fuzz run fuzz_error_details

#![no_main]

use crow_host::remote_error::RemoteError;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(e) = RemoteError::from_payload(1, 32, data) {
        assert_eq!(e.number, data.first().copied().unwrap_or(0));
        if let Some(msg) = &e.details.message {
            assert!(msg.is_ascii());
        }
    }
});

//! Response packet encoder.
//!
//! The device-side counterpart of [`PacketParser`](crate::parser::PacketParser):
//! writes a 5-byte header followed by the payload in chunks of at most
//! 128 bytes, each trailed by its F16 checksum.
//!
//! ```text
//! ┌──────────────┬──────────────────────┬──────────────────────┐
//! │ Header (5B)  │ chunk + upper, lower │ chunk + upper, lower │ …
//! └──────────────┴──────────────────────┴──────────────────────┘
//! ```

extern crate alloc;
use alloc::vec::Vec;

use crate::parser::checksum::{F16, HEADER_SIZE, RH0_RESERVED_PATTERN, checksum};
use crate::parser::{CHUNK_SIZE, MAX_PAYLOAD_SIZE, framed_payload_len};

/// Error flag in RH0.
pub const RH0_ERROR_FLAG: u8 = 0x80;

/// Build the 5-byte header for a response.
///
/// Returns `None` if `payload_len` does not fit the 11-bit length field.
pub fn encode_header(is_error: bool, token: u8, payload_len: usize) -> Option<[u8; HEADER_SIZE]> {
    if payload_len > MAX_PAYLOAD_SIZE {
        return None;
    }

    let mut rh0 = RH0_RESERVED_PATTERN | (((payload_len >> 8) as u8 & 0x07) << 3);
    if is_error {
        rh0 |= RH0_ERROR_FLAG;
    }
    let rh1 = (payload_len & 0xFF) as u8;

    let (upper, lower) = checksum(&[rh0, rh1, token]);
    Some([rh0, rh1, token, upper, lower])
}

/// Encode a complete response packet.
///
/// Returns `None` if the payload exceeds [`MAX_PAYLOAD_SIZE`].
pub fn encode_response(is_error: bool, token: u8, payload: &[u8]) -> Option<Vec<u8>> {
    let header = encode_header(is_error, token, payload.len())?;

    let mut out = Vec::with_capacity(HEADER_SIZE + framed_payload_len(payload.len()));
    out.extend_from_slice(&header);

    let mut f16 = F16::new();
    for chunk in payload.chunks(CHUNK_SIZE) {
        f16.reset();
        f16.update_all(chunk);
        out.extend_from_slice(chunk);
        out.push(f16.upper());
        out.push(f16.lower());
    }

    Some(out)
}

// ── Tests ────────────────────────────────────────────────────

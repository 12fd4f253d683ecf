//! Streaming decoder for Crow response packets.
//!
//! Wire format:
//! ```text
//! ┌─────┬─────┬───────┬─────┬─────┬─────────────┬────┬────┬─────────────┬────┬────┐
//! │ RH0 │ RH1 │ token │ UPR │ LWR │ chunk ≤128B │ CU │ CL │ chunk ≤128B │ CU │ CL │ …
//! └─────┴─────┴───────┴─────┴─────┴─────────────┴────┴────┴─────────────┴────┴────┘
//!   RH0: E . S S S 0 1 0     E = error flag, SSS = payload size bits 10..8
//!   RH1: payload size bits 7..0
//! ```
//!
//! The parser keeps all progress between calls, so a transport may hand
//! it whatever it happens to read: part of a header, several packets,
//! or garbage. Bytes that cannot start a valid header are returned as
//! [`DecodeResult::Extra`] and the header window slides forward by one
//! byte until it lines up with a valid header again.

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, trace, warn};

pub mod checksum;

use checksum::{F16, HEADER_SIZE, header_is_valid};

/// Maximum payload bytes per chunk before a checksum trailer.
pub const CHUNK_SIZE: usize = 128;

/// Checksum trailer size following each chunk.
pub const CHUNK_TRAILER_SIZE: usize = 2;

/// Largest payload expressible in the 3+8 length bits of RH0/RH1.
pub const MAX_PAYLOAD_SIZE: usize = 0x07FF;

/// Message carried by [`DecodeResult::Error`] for payload checksum failures.
pub const BAD_CHECKSUM_MESSAGE: &str = "The response packet has bad checksums.";

/// One decoded event from a [`PacketParser::parse`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete response packet with valid checksums.
    Response {
        is_error: bool,
        token: u8,
        payload: Vec<u8>,
    },
    /// A packet with a valid header whose payload failed its checksum.
    Error { token: u8, message: String },
    /// Bytes that did not belong to any valid packet.
    Extra { data: Vec<u8> },
    /// Unconsumed input following a token-matched response.
    Leftover { data: Vec<u8> },
}

/// Position in the decode automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Header0,
    Header1,
    Header2,
    Header3,
    /// Fifth header byte; stays here while the window slides over garbage.
    HeaderEval,
    PayloadByte,
    ChecksumUpper,
    ChecksumLower,
    /// Payload is known bad; swallow the rest of the packet.
    Discard,
}

/// Resumable Crow response parser.
///
/// One instance per byte stream. Not reentrant: calls on the same
/// instance must be serialised by the caller.
pub struct PacketParser {
    state: ParserState,
    min_bytes_expected: usize,
    header: [u8; HEADER_SIZE],
    is_error: bool,
    token: u8,
    payload: Vec<u8>,
    payload_size: usize,
    chunk_remaining: usize,
    payload_remaining: usize,
    f16: F16,
}

/// Per-call scratch: results so far plus the pending extra-byte run.
struct Emitter {
    results: Vec<DecodeResult>,
    extra: Vec<u8>,
}

impl Emitter {
    fn new() -> Self {
        Self {
            results: Vec::new(),
            extra: Vec::new(),
        }
    }

    fn flush_extra(&mut self) {
        if !self.extra.is_empty() {
            let data = core::mem::take(&mut self.extra);
            self.results.push(DecodeResult::Extra { data });
        }
    }

    fn push(&mut self, result: DecodeResult) {
        self.results.push(result);
    }

    fn finish(mut self) -> Vec<DecodeResult> {
        self.flush_extra();
        self.results
    }
}

/// Outcome of feeding a run of bytes to the current state.
enum Step {
    /// `n` bytes consumed, keep going.
    Consumed(usize),
    /// `n` bytes consumed and a packet for `token` was just emitted.
    Completed { consumed: usize, token: u8 },
}

impl PacketParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Header0,
            min_bytes_expected: HEADER_SIZE,
            header: [0; HEADER_SIZE],
            is_error: false,
            token: 0,
            payload: Vec::with_capacity(MAX_PAYLOAD_SIZE),
            payload_size: 0,
            chunk_remaining: 0,
            payload_remaining: 0,
            f16: F16::new(),
        }
    }

    /// Lower bound on bytes still needed to finish the packet in progress.
    ///
    /// Exactly 5 while waiting for a header, and 0 after a
    /// token-matched response ended a [`parse`](Self::parse) call early.
    pub fn min_bytes_expected(&self) -> usize {
        self.min_bytes_expected
    }

    /// Discard all in-progress state.
    pub fn reset(&mut self) {
        self.state = ParserState::Header0;
        self.min_bytes_expected = HEADER_SIZE;
        self.header = [0; HEADER_SIZE];
        self.is_error = false;
        self.token = 0;
        self.payload.clear();
        self.payload_size = 0;
        self.chunk_remaining = 0;
        self.payload_remaining = 0;
        self.f16.reset();
    }

    /// [`reset`](Self::reset), then [`parse`](Self::parse).
    pub fn parse_fresh(&mut self, data: &[u8], token: Option<u8>) -> Vec<DecodeResult> {
        self.reset();
        self.parse(data, token)
    }

    /// Feed bytes into the parser.
    ///
    /// Returns every event completed within `data`, in stream order.
    /// With `token` set, returns as soon as a response (or checksum
    /// error) carrying that token is finished: `min_bytes_expected`
    /// becomes 0 and any bytes after it come back as a single
    /// [`DecodeResult::Leftover`].
    pub fn parse(&mut self, data: &[u8], token: Option<u8>) -> Vec<DecodeResult> {
        let mut out = Emitter::new();
        let mut offset = 0;

        while offset < data.len() {
            match self.step(&data[offset..], &mut out) {
                Step::Consumed(n) => offset += n,
                Step::Completed { consumed, token: done } => {
                    offset += consumed;
                    if token == Some(done) {
                        self.min_bytes_expected = 0;
                        if offset < data.len() {
                            out.push(DecodeResult::Leftover {
                                data: data[offset..].to_vec(),
                            });
                        }
                        trace!("parser: token {} matched, {} bytes left over", done, data.len() - offset);
                        return out.finish();
                    }
                }
            }
        }

        out.finish()
    }

    /// Advance the automaton over the front of `data` (never empty).
    fn step(&mut self, data: &[u8], out: &mut Emitter) -> Step {
        let byte = data[0];

        match self.state {
            ParserState::Header0 => {
                self.header[0] = byte;
                self.min_bytes_expected = 4;
                self.state = ParserState::Header1;
                Step::Consumed(1)
            }
            ParserState::Header1 => {
                self.header[1] = byte;
                self.min_bytes_expected = 3;
                self.state = ParserState::Header2;
                Step::Consumed(1)
            }
            ParserState::Header2 => {
                self.header[2] = byte;
                self.min_bytes_expected = 2;
                self.state = ParserState::Header3;
                Step::Consumed(1)
            }
            ParserState::Header3 => {
                self.header[3] = byte;
                self.min_bytes_expected = 1;
                self.state = ParserState::HeaderEval;
                Step::Consumed(1)
            }
            ParserState::HeaderEval => {
                self.header[4] = byte;
                if header_is_valid(&self.header) {
                    out.flush_extra();
                    self.begin_packet(out)
                } else {
                    // Slide the window: RH0 becomes an extra byte.
                    out.extra.push(self.header[0]);
                    self.header.copy_within(1.., 0);
                    self.min_bytes_expected = 1;
                    Step::Consumed(1)
                }
            }
            ParserState::PayloadByte => {
                let n = self.chunk_remaining.min(data.len());
                let chunk = &data[..n];
                self.payload.extend_from_slice(chunk);
                self.f16.update_all(chunk);
                self.chunk_remaining -= n;
                self.min_bytes_expected -= n;
                if self.chunk_remaining == 0 {
                    self.state = ParserState::ChecksumUpper;
                }
                Step::Consumed(n)
            }
            ParserState::ChecksumUpper => {
                self.min_bytes_expected -= 1;
                if self.f16.upper_matches(byte) {
                    self.state = ParserState::ChecksumLower;
                    Step::Consumed(1)
                } else {
                    self.enter_discard(1, out)
                }
            }
            ParserState::ChecksumLower => {
                self.min_bytes_expected -= 1;
                if !self.f16.lower_matches(byte) {
                    self.enter_discard(1, out)
                } else if self.payload_remaining == 0 {
                    let payload = core::mem::take(&mut self.payload);
                    debug_assert_eq!(payload.len(), self.payload_size);
                    out.push(DecodeResult::Response {
                        is_error: self.is_error,
                        token: self.token,
                        payload,
                    });
                    self.await_header();
                    Step::Completed {
                        consumed: 1,
                        token: self.token,
                    }
                } else {
                    self.begin_chunk();
                    Step::Consumed(1)
                }
            }
            ParserState::Discard => {
                let n = self.min_bytes_expected.min(data.len());
                self.min_bytes_expected -= n;
                if self.min_bytes_expected == 0 {
                    self.emit_bad_checksum(out);
                    Step::Completed {
                        consumed: n,
                        token: self.token,
                    }
                } else {
                    Step::Consumed(n)
                }
            }
        }
    }

    /// Header at `self.header` is valid; set up payload decoding.
    fn begin_packet(&mut self, out: &mut Emitter) -> Step {
        self.is_error = self.header[0] & 0x80 != 0;
        self.header[0] = (self.header[0] & 0x38) >> 3;
        self.payload_size = usize::from(u16::from_be_bytes([self.header[0], self.header[1]]));
        self.token = self.header[2];

        if self.payload_size == 0 {
            out.push(DecodeResult::Response {
                is_error: self.is_error,
                token: self.token,
                payload: Vec::new(),
            });
            self.await_header();
            return Step::Completed {
                consumed: 1,
                token: self.token,
            };
        }

        self.min_bytes_expected = framed_payload_len(self.payload_size);
        debug!(
            "parser: header token={} size={} error={}",
            self.token, self.payload_size, self.is_error
        );

        self.payload.clear();
        self.payload.reserve(self.payload_size);
        self.payload_remaining = self.payload_size;
        self.begin_chunk();
        Step::Consumed(1)
    }

    fn begin_chunk(&mut self) {
        self.chunk_remaining = self.payload_remaining.min(CHUNK_SIZE);
        self.payload_remaining -= self.chunk_remaining;
        self.f16.reset();
        self.state = ParserState::PayloadByte;
    }

    /// A checksum byte just failed. If the packet has nothing left to
    /// swallow, report it now; otherwise discard the remainder first.
    fn enter_discard(&mut self, consumed: usize, out: &mut Emitter) -> Step {
        warn!("parser: bad payload checksum for token {}", self.token);
        if self.min_bytes_expected == 0 {
            self.emit_bad_checksum(out);
            Step::Completed {
                consumed,
                token: self.token,
            }
        } else {
            self.state = ParserState::Discard;
            Step::Consumed(consumed)
        }
    }

    fn emit_bad_checksum(&mut self, out: &mut Emitter) {
        self.payload.clear();
        out.push(DecodeResult::Error {
            token: self.token,
            message: String::from(BAD_CHECKSUM_MESSAGE),
        });
        self.await_header();
    }

    fn await_header(&mut self) {
        self.state = ParserState::Header0;
        self.min_bytes_expected = HEADER_SIZE;
    }
}

impl Default for PacketParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes following a header for a payload of `size` bytes.
pub fn framed_payload_len(size: usize) -> usize {
    let full = (size / CHUNK_SIZE) * (CHUNK_SIZE + CHUNK_TRAILER_SIZE);
    match size % CHUNK_SIZE {
        0 => full,
        rem => full + rem + CHUNK_TRAILER_SIZE,
    }
}

// ── Tests ────────────────────────────────────────────────────

//! Waiting for the response to one command.
//!
//! Transport-free: the caller owns the serial port and the clock. It
//! asks the [`Exchange`] how many bytes to read and how long to wait,
//! hands over whatever arrived together with the time elapsed since
//! receiving started, and finally calls [`Exchange::finish`].
//!
//! ```text
//! while let Some(timeout) = ex.read_timeout(elapsed) {
//!     let data = port.read(ex.bytes_wanted(), timeout);
//!     ex.feed(&data, elapsed);
//! }
//! let payload = ex.finish()?;
//! ```

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use core::time::Duration;
use log::{trace, warn};

use crate::config::LinkConfig;
use crate::error::{HostError, Result, STALE_TOKEN_DETAIL};
use crate::parser::{DecodeResult, PacketParser};
use crate::remote_error::RemoteError;

/// Longest response packet, in bytes, the receive window allows for.
pub const MAX_RESPONSE_PACKET_SIZE: u32 = 2084;

// ── Tokens ───────────────────────────────────────────────────

/// Hands out response tokens 0, 1, …, 255, 0, …
#[derive(Debug, Clone, Default)]
pub struct TokenSequence {
    next: u8,
}

impl TokenSequence {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn next_token(&mut self) -> u8 {
        let token = self.next;
        self.next = self.next.wrapping_add(1);
        token
    }
}

// ── Receive window ───────────────────────────────────────────

/// Time budget for receiving a response.
///
/// Starts at the transaction timeout; every byte received extends it by
/// one byte time, up to enough time for a maximum-size packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveWindow {
    deadline: Duration,
    ceiling: Duration,
    byte_time: Duration,
}

impl ReceiveWindow {
    pub fn new(config: &LinkConfig) -> Self {
        let byte_time = config.byte_time();
        let deadline = config.transaction_timeout();
        Self {
            deadline,
            ceiling: deadline + byte_time * MAX_RESPONSE_PACKET_SIZE,
            byte_time,
        }
    }

    /// Account for `n` received bytes.
    pub fn extend(&mut self, n: usize) {
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        self.deadline = (self.deadline + self.byte_time * n).min(self.ceiling);
    }

    /// Time left at `elapsed`, or `None` once the window has closed.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.deadline.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

// ── Exchange ─────────────────────────────────────────────────

/// Collects parser output until the response for one token arrives.
pub struct Exchange {
    address: u8,
    port: u8,
    token: u8,
    parser: PacketParser,
    window: ReceiveWindow,
    results: Vec<DecodeResult>,
    byte_count: usize,
}

impl Exchange {
    pub fn new(config: &LinkConfig, address: u8, port: u8, token: u8) -> Self {
        Self {
            address,
            port,
            token,
            parser: PacketParser::new(),
            window: ReceiveWindow::new(config),
            results: Vec::new(),
            byte_count: 0,
        }
    }

    pub fn token(&self) -> u8 {
        self.token
    }

    /// Read size hint: bytes still needed for the packet in progress.
    pub fn bytes_wanted(&self) -> usize {
        self.parser.min_bytes_expected()
    }

    /// The expected response has been decoded.
    pub fn is_complete(&self) -> bool {
        self.parser.min_bytes_expected() == 0
    }

    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Everything the parser has reported so far.
    pub fn results(&self) -> &[DecodeResult] {
        &self.results
    }

    /// How long the next read may block, or `None` to stop reading.
    pub fn read_timeout(&self, elapsed: Duration) -> Option<Duration> {
        if self.is_complete() {
            return None;
        }
        self.window.remaining(elapsed)
    }

    /// Hand over bytes read from the port.
    ///
    /// Bytes arriving after completion are ignored.
    pub fn feed(&mut self, data: &[u8], elapsed: Duration) {
        if self.is_complete() {
            return;
        }
        self.byte_count += data.len();
        let results = self.parser.parse(data, Some(self.token));
        trace!(
            "exchange: token {} fed {} bytes at {:?}, {} results",
            self.token,
            data.len(),
            elapsed,
            results.len()
        );
        self.results.extend(results);
        self.window.extend(data.len());
    }

    /// Resolve the exchange into the response payload or an error.
    pub fn finish(self) -> Result<Vec<u8>> {
        let outcome = if self.is_complete() {
            self.resolve_complete()
        } else {
            self.resolve_incomplete()
        };
        if let Err(e) = &outcome {
            warn!("exchange: token {}: {}", self.token, e);
        }
        outcome
    }

    fn resolve_complete(&self) -> Result<Vec<u8>> {
        for item in &self.results {
            match item {
                DecodeResult::Response {
                    is_error,
                    token,
                    payload,
                } if *token == self.token => {
                    if !*is_error {
                        return Ok(payload.clone());
                    }
                    return Err(
                        match RemoteError::from_payload(self.address, self.port, payload) {
                            Ok(remote) => HostError::Remote(remote),
                            Err(reason) => HostError::MalformedErrorResponse {
                                address: self.address,
                                port: self.port,
                                reason,
                            },
                        },
                    );
                }
                DecodeResult::Error { token, message } if *token == self.token => {
                    return Err(self.no_response(Some(message.clone())));
                }
                _ => {}
            }
        }
        unreachable!("parser completed token {} without reporting it", self.token)
    }

    fn resolve_incomplete(&self) -> Result<Vec<u8>> {
        if self.byte_count == 0 {
            return Err(self.no_response(None));
        }
        for item in &self.results {
            if let DecodeResult::Response { token, .. } = item {
                assert_ne!(
                    *token, self.token,
                    "matching response left the exchange incomplete"
                );
                return Err(self.no_response(Some(STALE_TOKEN_DETAIL.into())));
            }
        }
        Err(self.no_response(None))
    }

    fn no_response(&self, detail: Option<String>) -> HostError {
        HostError::NoResponse {
            address: self.address,
            port: self.port,
            byte_count: self.byte_count,
            detail,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────

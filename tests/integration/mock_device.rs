//! Scripted serial port for integration tests.
//!
//! Queues the bytes a device would send and hands them out in reads of
//! at most the requested size, advancing a simulated clock by one byte
//! time per byte plus a fixed latency for the first read.

use std::collections::VecDeque;
use std::time::Duration;

use crow_host::codec::encode_response;
use crow_host::config::LinkConfig;
use crow_host::transaction::Exchange;

pub struct MockPort {
    rx: VecDeque<u8>,
    /// Delay before the first byte arrives.
    pub latency: Duration,
    byte_time: Duration,
    elapsed: Duration,
    /// Sizes of every read request made, in order.
    pub reads: Vec<usize>,
}

#[allow(dead_code)]
impl MockPort {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            rx: VecDeque::new(),
            latency: Duration::from_millis(5),
            byte_time: config.byte_time(),
            elapsed: Duration::ZERO,
            reads: Vec::new(),
        }
    }

    pub fn queue(&mut self, bytes: &[u8]) -> &mut Self {
        self.rx.extend(bytes.iter().copied());
        self
    }

    pub fn queue_response(&mut self, is_error: bool, token: u8, payload: &[u8]) -> &mut Self {
        let packet = encode_response(is_error, token, payload).expect("payload fits");
        self.queue(&packet)
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Read up to `max` bytes, blocking at most `timeout`.
    pub fn read(&mut self, max: usize, timeout: Duration) -> Vec<u8> {
        self.reads.push(max);

        let wait = if self.elapsed.is_zero() {
            self.latency
        } else {
            Duration::ZERO
        };
        if self.rx.is_empty() || wait >= timeout {
            self.elapsed += timeout;
            return Vec::new();
        }
        self.elapsed += wait;

        let n = max.min(self.rx.len());
        self.elapsed += self.byte_time * n as u32;
        self.rx.drain(..n).collect()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Run the read loop until the exchange is done or the window closes.
pub fn drive(port: &mut MockPort, exchange: &mut Exchange) {
    while let Some(timeout) = exchange.read_timeout(port.elapsed()) {
        let data = port.read(exchange.bytes_wanted(), timeout);
        exchange.feed(&data, port.elapsed());
    }
}

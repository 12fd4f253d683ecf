//! Serial link configuration
//!
//! Per-address settings used when waiting for a response: baudrate,
//! stop bits, and the transaction timeout. Addresses without an override
//! use the default link settings.

extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use core::fmt;
use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Stop bits per serial frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

/// Link settings for one device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial baudrate (bits per second)
    pub baudrate: u32,
    pub stop_bits: StopBits,
    /// Time allowed for the response to start arriving (milliseconds)
    pub transaction_timeout_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baudrate: 115_200,
            stop_bits: StopBits::One,
            transaction_timeout_ms: 250,
        }
    }
}

impl LinkConfig {
    /// Tenths of a bit on the wire per byte: start + 8 data + stop.
    pub fn bit_tenths_per_byte(&self) -> u64 {
        match self.stop_bits {
            StopBits::One => 100,
            StopBits::OnePointFive => 105,
            StopBits::Two => 110,
        }
    }

    /// Time to transmit one byte at this baudrate.
    pub fn byte_time(&self) -> Duration {
        let nanos = self.bit_tenths_per_byte() * 100_000_000 / u64::from(self.baudrate.max(1));
        Duration::from_nanos(nanos)
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.transaction_timeout_ms))
    }
}

// ── Errors ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Baudrate of zero for the given address (`None` = default).
    ZeroBaudrate(Option<u8>),
    /// Stored settings could not be decoded.
    Decode,
    /// Settings could not be encoded.
    Encode,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBaudrate(None) => write!(f, "default baudrate must be non-zero"),
            Self::ZeroBaudrate(Some(a)) => write!(f, "baudrate for address {a} must be non-zero"),
            Self::Decode => write!(f, "settings could not be decoded"),
            Self::Encode => write!(f, "settings could not be encoded"),
        }
    }
}

// ── Per-address settings ─────────────────────────────────────

/// Link settings for every address on one serial port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    pub default: LinkConfig,
    pub overrides: BTreeMap<u8, LinkConfig>,
}

impl SerialSettings {
    pub fn new(default: LinkConfig) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Settings in effect for `address`.
    pub fn for_address(&self, address: u8) -> LinkConfig {
        self.overrides.get(&address).copied().unwrap_or(self.default)
    }

    pub fn set_baudrate(&mut self, address: u8, baudrate: u32) {
        self.entry(address).baudrate = baudrate;
    }

    pub fn set_stop_bits(&mut self, address: u8, stop_bits: StopBits) {
        self.entry(address).stop_bits = stop_bits;
    }

    pub fn set_transaction_timeout(&mut self, address: u8, timeout_ms: u32) {
        self.entry(address).transaction_timeout_ms = timeout_ms;
    }

    /// Drop the override for `address`, falling back to the default.
    pub fn clear(&mut self, address: u8) {
        self.overrides.remove(&address);
    }

    fn entry(&mut self, address: u8) -> &mut LinkConfig {
        let default = self.default;
        self.overrides.entry(address).or_insert(default)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default.baudrate == 0 {
            return Err(ConfigError::ZeroBaudrate(None));
        }
        match self.overrides.iter().find(|(_, c)| c.baudrate == 0) {
            Some((&address, _)) => Err(ConfigError::ZeroBaudrate(Some(address))),
            None => Ok(()),
        }
    }

    /// Compact binary form for persistent storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let settings: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json).map_err(|_| ConfigError::Decode)?;
        settings.validate()?;
        Ok(settings)
    }
}

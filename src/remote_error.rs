//! Decoding of error responses sent by a Crow device.
//!
//! An error response carries the error number in its first payload byte
//! (0 if the payload is empty). An optional second byte, `E1`, is a
//! bitfield announcing which detail fields follow:
//!
//! ```text
//! bit  field               encoding
//! 0    message             ASCII, u16 BE offset + u16 BE length
//! 1    crow_version        u8
//! 2    max_command_size    u16 BE
//! 3    max_response_size   u16 BE
//! 4    address             u8
//! 5    port                u8
//! 6    service_identifier  ASCII, u16 BE offset + u8 length
//! ```
//!
//! Fields are read in bit order starting at payload offset 2. ASCII
//! offsets are relative to the start of the payload.

extern crate alloc;
use alloc::string::String;

use core::fmt;

// ── Classification ───────────────────────────────────────────

/// Category of a remote error, derived from its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Generic remote error (number 0).
    Remote,
    /// Device-level error: 1, or the 32..=63 range.
    Device,
    DeviceFault,
    ServiceFault,
    DeviceUnavailable,
    DeviceIsBusy,
    OversizedCommand,
    CorruptCommandPayload,
    PortNotOpen,
    DeviceLowResources,
    /// Reserved device range 10..=31.
    UnknownDevice,
    /// Service-level error: 64, or custom 128..=255.
    Service,
    UnknownCommandFormat,
    ServiceLowResources,
    InvalidCommand,
    RequestTooLarge,
    CommandNotAvailable,
    CommandNotImplemented,
    CommandNotAllowed,
    IncorrectCommandSize,
    MissingCommandData,
    TooMuchCommandData,
    /// Reserved service range 75..=127.
    UnknownService,
}

impl RemoteErrorKind {
    pub fn from_number(number: u8) -> Self {
        match number {
            0 => Self::Remote,
            1 | 32..=63 => Self::Device,
            2 => Self::DeviceFault,
            3 => Self::ServiceFault,
            4 => Self::DeviceUnavailable,
            5 => Self::DeviceIsBusy,
            6 => Self::OversizedCommand,
            7 => Self::CorruptCommandPayload,
            8 => Self::PortNotOpen,
            9 => Self::DeviceLowResources,
            10..=31 => Self::UnknownDevice,
            64 | 128..=255 => Self::Service,
            65 => Self::UnknownCommandFormat,
            66 => Self::ServiceLowResources,
            67 => Self::InvalidCommand,
            68 => Self::RequestTooLarge,
            69 => Self::CommandNotAvailable,
            70 => Self::CommandNotImplemented,
            71 => Self::CommandNotAllowed,
            72 => Self::IncorrectCommandSize,
            73 => Self::MissingCommandData,
            74 => Self::TooMuchCommandData,
            75..=127 => Self::UnknownService,
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Remote => "remote error",
            Self::Device => "device error",
            Self::DeviceFault => "device fault",
            Self::ServiceFault => "service fault",
            Self::DeviceUnavailable => "device unavailable",
            Self::DeviceIsBusy => "device is busy",
            Self::OversizedCommand => "oversized command",
            Self::CorruptCommandPayload => "corrupt command payload",
            Self::PortNotOpen => "port not open",
            Self::DeviceLowResources => "device low on resources",
            Self::UnknownDevice => "unknown device error",
            Self::Service => "service error",
            Self::UnknownCommandFormat => "unknown command format",
            Self::ServiceLowResources => "service low on resources",
            Self::InvalidCommand => "invalid command",
            Self::RequestTooLarge => "request too large",
            Self::CommandNotAvailable => "command not available",
            Self::CommandNotImplemented => "command not implemented",
            Self::CommandNotAllowed => "command not allowed",
            Self::IncorrectCommandSize => "incorrect command size",
            Self::MissingCommandData => "missing command data",
            Self::TooMuchCommandData => "too much command data",
            Self::UnknownService => "unknown service error",
        };
        f.write_str(s)
    }
}

// ── Details ──────────────────────────────────────────────────

const E1_MESSAGE: u8 = 0x01;
const E1_CROW_VERSION: u8 = 0x02;
const E1_MAX_COMMAND_SIZE: u8 = 0x04;
const E1_MAX_RESPONSE_SIZE: u8 = 0x08;
const E1_ADDRESS: u8 = 0x10;
const E1_PORT: u8 = 0x20;
const E1_SERVICE_IDENTIFIER: u8 = 0x40;

/// Optional fields attached to an error response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    pub message: Option<String>,
    pub crow_version: Option<u8>,
    pub max_command_size: Option<u16>,
    pub max_response_size: Option<u16>,
    pub address: Option<u8>,
    pub port: Option<u8>,
    pub service_identifier: Option<String>,
}

/// Why an error response's detail fields could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailError {
    /// The payload ends before the named field.
    Truncated(&'static str),
    /// An ASCII descriptor points outside the payload.
    OutOfRange(&'static str),
    /// The referenced text is not ASCII.
    NotAscii(&'static str),
}

impl fmt::Display for DetailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated(field) => write!(f, "error response too short for {field}"),
            Self::OutOfRange(field) => write!(f, "{field} lies outside the error response"),
            Self::NotAscii(field) => write!(f, "{field} is not ASCII"),
        }
    }
}

/// Sequential reader over the detail area of an error payload.
struct DetailReader<'a> {
    payload: &'a [u8],
    index: usize,
}

impl<'a> DetailReader<'a> {
    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], DetailError> {
        let end = self.index + n;
        let bytes = self
            .payload
            .get(self.index..end)
            .ok_or(DetailError::Truncated(field))?;
        self.index = end;
        Ok(bytes)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DetailError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, DetailError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// ASCII text referenced by an offset/length descriptor.
    fn ascii(&mut self, wide_len: bool, field: &'static str) -> Result<String, DetailError> {
        let offset = usize::from(self.u16(field)?);
        let len = if wide_len {
            usize::from(self.u16(field)?)
        } else {
            usize::from(self.u8(field)?)
        };

        let text = self
            .payload
            .get(offset..offset + len)
            .ok_or(DetailError::OutOfRange(field))?;
        if !text.is_ascii() {
            return Err(DetailError::NotAscii(field));
        }
        Ok(text.iter().map(|&b| char::from(b)).collect())
    }
}

impl ErrorDetails {
    /// Parse the detail fields of an error payload.
    pub fn parse(payload: &[u8]) -> Result<Self, DetailError> {
        let mut details = Self::default();
        let Some(&e1) = payload.get(1) else {
            return Ok(details);
        };

        let mut r = DetailReader { payload, index: 2 };
        if e1 & E1_MESSAGE != 0 {
            details.message = Some(r.ascii(true, "message")?);
        }
        if e1 & E1_CROW_VERSION != 0 {
            details.crow_version = Some(r.u8("crow_version")?);
        }
        if e1 & E1_MAX_COMMAND_SIZE != 0 {
            details.max_command_size = Some(r.u16("max_command_size")?);
        }
        if e1 & E1_MAX_RESPONSE_SIZE != 0 {
            details.max_response_size = Some(r.u16("max_response_size")?);
        }
        if e1 & E1_ADDRESS != 0 {
            details.address = Some(r.u8("address")?);
        }
        if e1 & E1_PORT != 0 {
            details.port = Some(r.u8("port")?);
        }
        if e1 & E1_SERVICE_IDENTIFIER != 0 {
            details.service_identifier = Some(r.ascii(false, "service_identifier")?);
        }
        Ok(details)
    }
}

// ── RemoteError ──────────────────────────────────────────────

/// An error response received from a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub address: u8,
    pub port: u8,
    pub number: u8,
    pub kind: RemoteErrorKind,
    pub details: ErrorDetails,
}

impl RemoteError {
    /// Decode the payload of an error response from `address`/`port`.
    pub fn from_payload(address: u8, port: u8, payload: &[u8]) -> Result<Self, DetailError> {
        let number = payload.first().copied().unwrap_or(0);
        Ok(Self {
            address,
            port,
            number,
            kind: RemoteErrorKind::from_number(number),
            details: ErrorDetails::parse(payload)?,
        })
    }

    /// Service-specific error number (128..=255).
    pub fn is_custom(&self) -> bool {
        self.number >= 128
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (number {}) at address {}, port {}",
            self.kind, self.number, self.address, self.port
        )?;
        if let Some(msg) = &self.details.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────

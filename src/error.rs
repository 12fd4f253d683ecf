//! Host-side error types.
//!
//! Malformed input never reaches this module: the parser reports bad
//! headers and bad checksums through its result list. These errors
//! describe the outcome of waiting for a specific response.

extern crate alloc;
use alloc::string::String;

use core::fmt;

use crate::remote_error::{DetailError, RemoteError};

/// Detail attached to a response carrying someone else's token.
pub const STALE_TOKEN_DETAIL: &str = "An invalid response was received (incorrect token). \
     It may be a stale response, or the responding device may have malfunctioned.";

/// Every failed exchange funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// No usable response with the expected token arrived.
    NoResponse {
        address: u8,
        port: u8,
        byte_count: usize,
        detail: Option<String>,
    },
    /// The device answered with an error response.
    Remote(RemoteError),
    /// The device answered with an error response that could not be decoded.
    MalformedErrorResponse {
        address: u8,
        port: u8,
        reason: DetailError,
    },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse {
                address,
                port,
                byte_count,
                detail,
            } => {
                write!(
                    f,
                    "no response from address {address}, port {port} ({byte_count} bytes received)"
                )?;
                if let Some(d) = detail {
                    write!(f, ": {d}")?;
                }
                Ok(())
            }
            Self::Remote(e) => write!(f, "remote: {e}"),
            Self::MalformedErrorResponse {
                address,
                port,
                reason,
            } => write!(
                f,
                "malformed error response from address {address}, port {port}: {reason}"
            ),
        }
    }
}

impl From<RemoteError> for HostError {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

/// Host-wide `Result` alias.
pub type Result<T> = core::result::Result<T, HostError>;

//! Crow host library.
//!
//! Decodes Crow response packets from a serial byte stream and resolves
//! them into command outcomes. Nothing here performs I/O: the caller
//! reads the port and feeds the bytes in.
//!
//! ```text
//! ┌────────────────┐  bytes  ┌──────────────┐  DecodeResult  ┌─────────────┐
//! │  serial port   │────────▶│ PacketParser │───────────────▶│  Exchange   │──▶ payload
//! │ (caller-owned) │         │   (parser)   │                │(transaction)│    or HostError
//! └────────────────┘         └──────────────┘                └─────────────┘
//! ```

#![deny(unused_must_use)]

pub mod codec;
pub mod config;
pub mod error;
pub mod parser;
pub mod remote_error;
pub mod transaction;

pub use error::{HostError, Result};
pub use parser::{DecodeResult, PacketParser};

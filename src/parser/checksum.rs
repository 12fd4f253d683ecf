//! F16 running checksum used by Crow headers and payload chunks.
//!
//! Each byte is added to `lower`, then `lower` is added to `upper`.
//! Comparisons are made modulo 255, so a transmitted `0xFF` is
//! equivalent to `0x00`.
//!
//! ```text
//! lower += b
//! upper += lower
//! ```

/// Size of a response header in bytes (RH0..RH4).
pub const HEADER_SIZE: usize = 5;

/// Reserved-bit mask applied to RH0.
pub const RH0_RESERVED_MASK: u8 = 0x47;

/// Required value of `RH0 & RH0_RESERVED_MASK`.
pub const RH0_RESERVED_PATTERN: u8 = 0x02;

/// Running sum-of-sums accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct F16 {
    upper: u32,
    lower: u32,
}

impl F16 {
    pub const fn new() -> Self {
        Self { upper: 0, lower: 0 }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn update(&mut self, byte: u8) {
        // Reduce as we go; the result mod 255 is unchanged.
        self.lower = (self.lower + u32::from(byte)) % 255;
        self.upper = (self.upper + self.lower) % 255;
    }

    pub fn update_all(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.update(b);
        }
    }

    /// Upper checksum byte, reduced mod 255.
    pub fn upper(&self) -> u8 {
        (self.upper % 255) as u8
    }

    /// Lower checksum byte, reduced mod 255.
    pub fn lower(&self) -> u8 {
        (self.lower % 255) as u8
    }

    pub fn upper_matches(&self, byte: u8) -> bool {
        self.upper() == byte % 255
    }

    pub fn lower_matches(&self, byte: u8) -> bool {
        self.lower() == byte % 255
    }
}

/// Compute the `(upper, lower)` trailer for a run of bytes.
pub fn checksum(bytes: &[u8]) -> (u8, u8) {
    let mut f = F16::new();
    f.update_all(bytes);
    (f.upper(), f.lower())
}

/// Check a 5-byte response header.
///
/// Valid when the reserved bits of RH0 match and RH3/RH4 carry the
/// F16 checksum of RH0..RH2.
pub fn header_is_valid(header: &[u8; HEADER_SIZE]) -> bool {
    if header[0] & RH0_RESERVED_MASK != RH0_RESERVED_PATTERN {
        return false;
    }

    let mut f = F16::new();
    f.update_all(&header[..3]);
    f.upper_matches(header[3]) && f.lower_matches(header[4])
}

// ── Tests ────────────────────────────────────────────────────

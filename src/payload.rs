//! Uplink payload wire format.
//!
//! Every multi-byte field is big-endian. Later versions append fields, so a
//! decoder for version N can read any payload of version ≤ N.
//!
//! ```text
//! byte:  0        1..=2        3..=4          5..=6
//!        version  range (mm)   battery (mV)   boot count
//! v1     ✓        ✓
//! v2     ✓        ✓            ✓
//! v3     ✓        ✓            ✓              ✓
//! ```
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::payload::UplinkPayload;
//!
//! let payload = UplinkPayload::new(1000, 3700, 42);
//! let bytes = payload.encode();
//! assert_eq!(bytes.as_slice(), &[3, 0x03, 0xE8, 0x0E, 0x74, 0x00, 0x2A]);
//!
//! let decoded = UplinkPayload::decode(&bytes).unwrap();
//! assert_eq!(decoded, payload);
//! ```

use core::fmt;

/// Newest payload version, used by default.
pub const CURRENT_VERSION: u8 = 3;

/// Longest encoded payload (version 3).
pub const MAX_PAYLOAD_LEN: usize = 7;

/// Encoded payload bytes.
pub type PayloadBytes = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

/// One measurement report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UplinkPayload {
    /// Wire format version (1..=3).
    pub version: u8,
    /// Range in millimetres.
    pub range: u16,
    /// Battery voltage in millivolts (absent on v1).
    pub voltage_mv: u16,
    /// Wake counter, truncated to 16 bits (absent before v3).
    pub boot_count: u16,
}

/// Payload decoding failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadError {
    /// No bytes at all.
    Empty,
    /// Version byte not in 1..=3.
    UnknownVersion(u8),
    /// Fewer bytes than the version requires.
    Truncated {
        /// Version byte found.
        version: u8,
        /// Bytes required for that version.
        expected: usize,
        /// Bytes present.
        actual: usize,
    },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Empty => write!(f, "empty payload"),
            PayloadError::UnknownVersion(v) => write!(f, "unknown payload version {}", v),
            PayloadError::Truncated {
                version,
                expected,
                actual,
            } => write!(
                f,
                "payload v{} needs {} bytes, got {}",
                version, expected, actual
            ),
        }
    }
}

/// Encoded length of a payload version, `None` if unknown.
pub const fn encoded_len(version: u8) -> Option<usize> {
    match version {
        1 => Some(3),
        2 => Some(5),
        3 => Some(7),
        _ => None,
    }
}

impl UplinkPayload {
    /// Current-version payload.
    pub fn new(range: u16, voltage_mv: u16, boot_count: u32) -> Self {
        Self {
            version: CURRENT_VERSION,
            range,
            voltage_mv,
            boot_count: boot_count as u16,
        }
    }

    /// Same measurement at a different wire version.
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Encode to bytes. Unknown versions encode as the current version.
    pub fn encode(&self) -> PayloadBytes {
        let version = if encoded_len(self.version).is_some() {
            self.version
        } else {
            CURRENT_VERSION
        };
        let mut out = PayloadBytes::new();
        let _ = out.push(version);
        let _ = out.extend_from_slice(&self.range.to_be_bytes());
        if version >= 2 {
            let _ = out.extend_from_slice(&self.voltage_mv.to_be_bytes());
        }
        if version >= 3 {
            let _ = out.extend_from_slice(&self.boot_count.to_be_bytes());
        }
        out
    }

    /// Decode from bytes. Trailing bytes beyond the version's length are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        let version = *bytes.first().ok_or(PayloadError::Empty)?;
        let expected = encoded_len(version).ok_or(PayloadError::UnknownVersion(version))?;
        if bytes.len() < expected {
            return Err(PayloadError::Truncated {
                version,
                expected,
                actual: bytes.len(),
            });
        }

        let field = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);
        Ok(Self {
            version,
            range: field(1),
            voltage_mv: if version >= 2 { field(3) } else { 0 },
            boot_count: if version >= 3 { field(5) } else { 0 },
        })
    }
}

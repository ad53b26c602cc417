//! Sensor identities and their canonical string encoding.
//!
//! Internally an identity is a fixed-width byte value (a 1-Wire ROM code or
//! a chip serial number).  It only becomes a string at the boundaries: the
//! persistent correction map, the wire protocol and the setup console.  All
//! three go through [`SensorIdentity::key`] / [`SensorIdentity::parse`], so a
//! correction entered on the console is found again by the protocol path.
//!
//! Encoding: lowercase hex, two digits per byte, no separators.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Widest identity we store (1-Wire ROM code).
pub const IDENTITY_MAX_LEN: usize = 8;

/// Length of the longest encoded identity string.
pub const IDENTITY_KEY_LEN: usize = IDENTITY_MAX_LEN * 2;

/// Encoded identity, as used for map keys and wire strings.
pub type IdentityKey = heapless::String<IDENTITY_KEY_LEN>;

/// The three sensor families a node can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorClass {
    /// DS18B20-style probes enumerated on the 1-Wire bus (0..=8 of them).
    Bus,
    /// Single on-board HDC1080-style humidity/temperature chip.
    Hdc1080,
    /// Single on-board SHT4x-style humidity/temperature chip.
    Sht4x,
}

impl SensorClass {
    /// Byte width of identities for this class.
    pub const fn identity_len(self) -> usize {
        match self {
            Self::Bus => 8,
            Self::Hdc1080 => 6,
            Self::Sht4x => 4,
        }
    }
}

/// Opaque identity of one physical sensor.  Equality is byte-exact,
/// including the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorIdentity {
    bytes: [u8; IDENTITY_MAX_LEN],
    len: u8,
}

/// Why an identity string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// Empty, odd-length, or longer than [`IDENTITY_KEY_LEN`].
    BadLength,
    /// Contains a character that is not a hex digit.
    BadDigit,
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength => write!(f, "identity must be 2..={} hex digits", IDENTITY_KEY_LEN),
            Self::BadDigit => write!(f, "identity contains a non-hex character"),
        }
    }
}

impl SensorIdentity {
    /// Build an identity from raw bytes.  Returns `None` for empty input or
    /// input wider than [`IDENTITY_MAX_LEN`].
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        if raw.is_empty() || raw.len() > IDENTITY_MAX_LEN {
            return None;
        }
        let mut bytes = [0u8; IDENTITY_MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// A 1-Wire ROM code.
    pub const fn rom(code: [u8; 8]) -> Self {
        Self {
            bytes: code,
            len: 8,
        }
    }

    /// All-zero placeholder used for sensors that are not connected.
    pub const fn zeroed(class: SensorClass) -> Self {
        Self {
            bytes: [0; IDENTITY_MAX_LEN],
            len: class.identity_len() as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn is_zero(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }

    /// Canonical string form: lowercase hex.
    pub fn key(&self) -> IdentityKey {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut out = IdentityKey::new();
        for b in self.as_bytes() {
            // Capacity is exactly two digits per stored byte.
            let _ = out.push(HEX[(b >> 4) as usize] as char);
            let _ = out.push(HEX[(b & 0x0f) as usize] as char);
        }
        out
    }

    /// Parse an identity string.  Surrounding whitespace is ignored and
    /// upper-case digits are accepted, so `parse(s)?.key()` normalises `s`.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let s = s.trim();
        if s.is_empty() || s.len() % 2 != 0 || s.len() > IDENTITY_KEY_LEN {
            return Err(IdentityError::BadLength);
        }
        let mut bytes = [0u8; IDENTITY_MAX_LEN];
        for (i, pair) in s.as_bytes().chunks(2).enumerate() {
            let hi = hex_value(pair[0]).ok_or(IdentityError::BadDigit)?;
            let lo = hex_value(pair[1]).ok_or(IdentityError::BadDigit)?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self {
            bytes,
            len: (s.len() / 2) as u8,
        })
    }
}

impl fmt::Display for SensorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

//! CIP elementary data types and the length-prefixed STRING type.
//!
//! The distilled contract calls for a "function pointer dispatch table
//! keyed by type code"; here that's a closed [`CipType`] enumeration and
//! a `match`, which the compiler can check covers exactly the 20 codes
//! below rather than leaving gaps a runtime table lookup wouldn't catch.

use crate::error::{Error, Result};

/// The CIP elementary type codes (0xC1–0xCF), the bit-string codes
/// (0xD1–0xD4), and STRING (0xDA). Elementary and bit-string types are
/// pass-through: their wire bytes are exactly their value bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum CipType {
    Bool = 0xC1,
    Sint = 0xC2,
    Int = 0xC3,
    Dint = 0xC4,
    Lint = 0xC5,
    Usint = 0xC6,
    Uint = 0xC7,
    Udint = 0xC8,
    Ulint = 0xC9,
    Real = 0xCA,
    Lreal = 0xCB,
    Stime = 0xCC,
    Date = 0xCD,
    TimeOfDay = 0xCE,
    DateAndTime = 0xCF,
    Bit4 = 0xD1,
    Bit8 = 0xD2,
    Bit16 = 0xD3,
    Bit32 = 0xD4,
    String = 0xDA,
}

impl CipType {
    pub fn from_code(code: u16) -> Result<CipType> {
        Ok(match code {
            0xC1 => CipType::Bool,
            0xC2 => CipType::Sint,
            0xC3 => CipType::Int,
            0xC4 => CipType::Dint,
            0xC5 => CipType::Lint,
            0xC6 => CipType::Usint,
            0xC7 => CipType::Uint,
            0xC8 => CipType::Udint,
            0xC9 => CipType::Ulint,
            0xCA => CipType::Real,
            0xCB => CipType::Lreal,
            0xCC => CipType::Stime,
            0xCD => CipType::Date,
            0xCE => CipType::TimeOfDay,
            0xCF => CipType::DateAndTime,
            0xD1 => CipType::Bit4,
            0xD2 => CipType::Bit8,
            0xD3 => CipType::Bit16,
            0xD4 => CipType::Bit32,
            0xDA => CipType::String,
            other => return Err(Error::UnsupportedType(other)),
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    /// The fixed wire width of an elementary/bit-string scalar, or
    /// `None` for `String` (which carries its own length prefix).
    pub fn fixed_width(self) -> Option<usize> {
        use CipType::*;
        match self {
            Bool | Sint | Usint | Bit4 => Some(1),
            Int | Uint | Bit8 => Some(2),
            Dint | Udint | Real | Bit16 => Some(4),
            Lint | Ulint | Lreal | Bit32 => Some(8),
            Stime | Date | TimeOfDay => Some(4),
            DateAndTime => Some(8),
            String => None,
        }
    }

    /// Encodes a scalar value into wire bytes for this type. For
    /// elementary/bit-string types `value` is passed through unchanged
    /// (after a width check); for `String` it's treated as the decoded
    /// text and length-prefixed.
    pub fn encode(self, value: &[u8]) -> Result<Vec<u8>> {
        match self.fixed_width() {
            Some(width) => {
                if value.len() != width {
                    return Err(Error::invalid_argument(format!(
                        "value for CIP type 0x{:02X} must be {width} bytes, got {}",
                        self.code(),
                        value.len()
                    )));
                }
                Ok(value.to_vec())
            }
            None => encode_string(value),
        }
    }

    /// Decodes wire bytes for this type. For elementary/bit-string types
    /// this just slices the exact width off the front; for `String` it
    /// reads the length prefix.
    pub fn decode<'a>(self, bytes: &'a [u8]) -> Result<&'a [u8]> {
        match self.fixed_width() {
            Some(width) => {
                if bytes.len() < width {
                    return Err(Error::buffer_underrun(width, bytes.len()));
                }
                Ok(&bytes[..width])
            }
            None => decode_string(bytes),
        }
    }
}

/// Encodes a STRING value: drops a single trailing NUL if present,
/// rejects anything over 255 bytes, and emits `len | bytes`. The true
/// size is computed from the (post-NUL-strip) payload rather than
/// estimated, since an estimate based on the caller's raw buffer length
/// would over-count by one whenever a terminating NUL happens to be
/// present.
pub fn encode_string(value: &[u8]) -> Result<Vec<u8>> {
    let trimmed = match value.split_last() {
        Some((0, rest)) => rest,
        _ => value,
    };
    if trimmed.len() > 255 {
        return Err(Error::invalid_argument(format!(
            "STRING value of {} bytes exceeds the 255-byte limit",
            trimmed.len()
        )));
    }
    let mut out = Vec::with_capacity(1 + trimmed.len());
    out.push(trimmed.len() as u8);
    out.extend_from_slice(trimmed);
    Ok(out)
}

/// Decodes a STRING value: reads the length prefix, requires at least
/// that many bytes to follow, and returns just the string bytes (no
/// length prefix, no NUL).
pub fn decode_string(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.is_empty() {
        return Err(Error::buffer_underrun(1, 0));
    }
    let len = bytes[0] as usize;
    if bytes.len() < 1 + len {
        return Err(Error::buffer_underrun(1 + len, bytes.len()));
    }
    Ok(&bytes[1..1 + len])
}

//! Arbitrary-length byte values
//!
//! This module contains [`BigNumber`], the value type every decoded frame
//! field flows through. A `BigNumber` is either null or a non-empty byte
//! sequence stored most-significant byte first, and supports bit- and
//! byte-granular slicing plus hex/text/integer conversions.

use crate::{ApWatchError, Result};

/// An arbitrary-length number stored as bytes, most significant first.
///
/// Values are immutable by convention: every transformation returns a new
/// `BigNumber` and a null value stays null through [`BigNumber::clone`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigNumber {
    /// `None` represents the null value; a `Some` sequence is never empty.
    bytes: Option<Vec<u8>>,
}

impl BigNumber {
    /// Create the null value.
    pub fn null() -> Self {
        Self { bytes: None }
    }

    /// Copy `count` bytes from the front of `buffer`, keeping wire order.
    ///
    /// Fails with `OutOfRange` if `buffer` holds fewer than `count` bytes;
    /// `count == 0` produces the null value.
    pub fn from_buffer(buffer: &[u8], count: usize) -> Result<Self> {
        if count > buffer.len() {
            return Err(ApWatchError::OutOfRange(format!(
                "from_buffer: {} bytes requested from a {}-byte buffer",
                count,
                buffer.len()
            )));
        }
        if count == 0 {
            return Ok(Self::null());
        }

        Ok(Self {
            bytes: Some(buffer[..count].to_vec()),
        })
    }

    /// Copy `count` bytes from the front of `buffer`, reading back-to-front.
    ///
    /// Used for little-endian wire fields, which become most-significant-first
    /// once reversed.
    pub fn from_buffer_reversed(buffer: &[u8], count: usize) -> Result<Self> {
        if count > buffer.len() {
            return Err(ApWatchError::OutOfRange(format!(
                "from_buffer_reversed: {} bytes requested from a {}-byte buffer",
                count,
                buffer.len()
            )));
        }
        if count == 0 {
            return Ok(Self::null());
        }

        Ok(Self {
            bytes: Some(buffer[..count].iter().rev().copied().collect()),
        })
    }

    /// Parse a hex string, two digits per byte, most significant first.
    ///
    /// The empty string parses to the null value. Odd-length or non-hex input
    /// fails with `InvalidEncoding`.
    pub fn from_hex_string(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::null());
        }

        let bytes =
            hex::decode(s).map_err(|_| ApWatchError::InvalidEncoding(s.to_string()))?;

        Ok(Self { bytes: Some(bytes) })
    }

    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        self.bytes.is_none()
    }

    /// Number of stored bytes, zero when null.
    pub fn byte_len(&self) -> usize {
        self.bytes.as_ref().map_or(0, Vec::len)
    }

    /// Render as uppercase hex, two digits per byte.
    pub fn to_hex_string(&self) -> Result<String> {
        Ok(hex::encode_upper(self.value_of("to_hex_string")?))
    }

    /// Render each byte as a character.
    pub fn to_text_string(&self) -> Result<String> {
        Ok(self
            .value_of("to_text_string")?
            .iter()
            .map(|b| *b as char)
            .collect())
    }

    /// Convert to a native unsigned integer, big-endian positional.
    ///
    /// Fails with `Overflow` when the value holds more bytes than a `u64`.
    pub fn to_unsigned_integer(&self) -> Result<u64> {
        let bytes = self.value_of("to_unsigned_integer")?;

        if bytes.len() > std::mem::size_of::<u64>() {
            return Err(ApWatchError::Overflow(format!(
                "{} bytes do not fit in a u64",
                bytes.len()
            )));
        }

        let mut output = 0u64;
        for byte in bytes {
            output = (output << 8) | u64::from(*byte);
        }

        Ok(output)
    }

    /// Keep `length` bytes starting at byte offset `from`.
    ///
    /// Offset 0 is the most significant stored byte. A zero `length`
    /// collapses the value to null; a range past the end fails with
    /// `OutOfRange`; calling on null fails with `NullValue`.
    pub fn cut_byte(&self, from: usize, length: usize) -> Result<Self> {
        let bytes = self.value_of("cut_byte")?;

        if from + length > bytes.len() {
            return Err(ApWatchError::OutOfRange(format!(
                "cut_byte: range {}..{} over {} bytes",
                from,
                from + length,
                bytes.len()
            )));
        }
        if length == 0 {
            return Ok(Self::null());
        }

        Ok(Self {
            bytes: Some(bytes[from..from + length].to_vec()),
        })
    }

    /// Keep `length` bits starting at bit offset `from`.
    ///
    /// Bit 0 is the most significant bit of the first stored byte. The kept
    /// bits come back right-aligned in the minimal number of bytes. Same
    /// null/out-of-range contract as [`BigNumber::cut_byte`].
    pub fn cut_bit(&self, from: usize, length: usize) -> Result<Self> {
        let bytes = self.value_of("cut_bit")?;

        let total_bits = bytes.len() * 8;
        if from + length > total_bits {
            return Err(ApWatchError::OutOfRange(format!(
                "cut_bit: range {}..{} over {} bits",
                from,
                from + length,
                total_bits
            )));
        }
        if length == 0 {
            return Ok(Self::null());
        }

        // Minimal covering byte window.
        let byte_from = from / 8;
        let byte_to = (from + length + 7) / 8;
        let mut window = bytes[byte_from..byte_to].to_vec();

        let head = from % 8;
        let tail = window.len() * 8 - head - length;

        // Clear the surplus bits before the field.
        window[0] &= 0xFF >> head;

        // Shift the field down to the low end of the window, carrying across
        // byte boundaries; the surplus tail bits fall off the last byte.
        if tail > 0 {
            let mut carry = 0u8;
            for byte in window.iter_mut() {
                let next_carry = *byte & ((1 << tail) - 1);
                *byte = (*byte >> tail) | (carry << (8 - tail));
                carry = next_carry;
            }
        }

        // The leading byte is all padding once a full byte of surplus is gone.
        if head + tail >= 8 {
            window.remove(0);
        }

        Ok(Self {
            bytes: Some(window),
        })
    }

    fn value_of(&self, operation: &str) -> Result<&Vec<u8>> {
        self.bytes
            .as_ref()
            .ok_or_else(|| ApWatchError::NullValue(operation.to_string()))
    }
}

impl Default for BigNumber {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Vec<u8>> for BigNumber {
    fn from(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            Self::null()
        } else {
            Self { bytes: Some(bytes) }
        }
    }
}

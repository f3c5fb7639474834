//! Length-prefixed variable-length integer encoding.
//!
//! A value is written as a single prefix byte `L` (`0..=8`) followed by the `L`
//! least-significant bytes of the value in little-endian order. `L` is always the
//! minimal number of bytes needed to represent the value, so zero is encoded as a
//! lone `0x00` and `u64::MAX` takes nine bytes.
//!
//! Decoding rejects prefixes larger than 8 and encodings whose most-significant
//! byte is zero, which keeps every value to exactly one representation.

use crate::{Error, Sink, Source};

/// Maximum number of bytes in an encoded value (prefix included).
pub const MAX_SIZE: usize = 9;

/// Returns the number of significant bytes in `value`.
#[inline]
fn significant(value: u64) -> usize {
    (u64::BITS - value.leading_zeros()).div_ceil(8) as usize
}

/// Encodes `value` to the sink.
pub fn write<S: Sink + ?Sized>(value: u64, sink: &mut S) -> Result<(), Error> {
    let len = significant(value);
    let mut buf = [0u8; MAX_SIZE];
    buf[0] = len as u8;
    buf[1..=len].copy_from_slice(&value.to_le_bytes()[..len]);
    sink.put_slice(&buf[..=len])
}

/// Decodes a value from the source.
pub fn read<S: Source + ?Sized>(source: &mut S) -> Result<u64, Error> {
    let len = source.read_u8()? as usize;
    if len == 0 {
        return Ok(0);
    }
    if len > 8 {
        return Err(Error::InvalidVarint);
    }
    let mut bytes = [0u8; 8];
    source.read_into(&mut bytes[..len])?;

    // A zero top byte means a shorter prefix would have sufficed.
    if bytes[len - 1] == 0 {
        return Err(Error::InvalidVarint);
    }
    Ok(u64::from_le_bytes(bytes))
}

/// Calculates the number of bytes needed to encode `value`.
#[inline]
pub fn size(value: u64) -> usize {
    1 + significant(value)
}

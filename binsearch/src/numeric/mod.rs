//! Containers keyed by fixed-width integers.
//!
//! The key already has a fixed width, so each container is a single sorted vector
//! without slot dispatch.
//!
//! # Format
//!
//! A container is persisted as a [binsearch_codec::varint] entry count followed by its
//! entries in ascending key order. Valued containers write each value as a varint
//! (the `i64` reinterpreted as a `u64`) before its key. Keys are written as a raw byte
//! (`u8`), two little-endian bytes (`u16`), or a varint (`u32`, `u64`, `i64`).

use binsearch_codec::{varint, Error as CodecError, Sink, Source};
use std::fmt::Debug;

mod keys;
mod values;

pub use keys::{Key, KeyBuilder};
pub use values::{Counter, CounterBuilder, KeyVal, KeyValBuilder, ValueMap, ValueMapBuilder};

/// An integer that can serve as a key.
pub trait Numeric: Copy + Ord + Debug + 'static {
    /// Converts the key to a `u64` word.
    fn to_word(self) -> u64;

    /// Converts a word back into a key, if it is in range.
    fn from_word(word: u64) -> Option<Self>;

    /// Returns the number of bytes [Numeric::write_key] produces.
    fn key_size(self) -> usize {
        varint::size(self.to_word())
    }

    /// Writes the key in its persisted form.
    fn write_key(self, sink: &mut impl Sink) -> Result<(), CodecError> {
        sink.write_varint_u64(self.to_word())
    }

    /// Reads a key written by [Numeric::write_key].
    ///
    /// Returns `None` if the persisted word does not fit the key type.
    fn read_key(source: &mut impl Source) -> Result<Option<Self>, CodecError> {
        Ok(Self::from_word(source.read_varint_u64()?))
    }
}

macro_rules! impl_unsigned {
    ($($type:ty),*) => {
        $(
            impl Numeric for $type {
                #[inline]
                fn to_word(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_word(word: u64) -> Option<Self> {
                    Self::try_from(word).ok()
                }
            }
        )*
    };
}
impl_unsigned!(u32, u64);

// Narrow keys are written raw.
macro_rules! impl_fixed {
    ($($type:ty),*) => {
        $(
            impl Numeric for $type {
                #[inline]
                fn to_word(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_word(word: u64) -> Option<Self> {
                    Self::try_from(word).ok()
                }

                #[inline]
                fn key_size(self) -> usize {
                    std::mem::size_of::<$type>()
                }

                fn write_key(self, sink: &mut impl Sink) -> Result<(), CodecError> {
                    sink.put_slice(&self.to_le_bytes())
                }

                fn read_key(source: &mut impl Source) -> Result<Option<Self>, CodecError> {
                    let mut buf = [0u8; std::mem::size_of::<$type>()];
                    source.read_into(&mut buf)?;
                    Ok(Some(Self::from_le_bytes(buf)))
                }
            }
        )*
    };
}
impl_fixed!(u8, u16);

impl Numeric for i64 {
    #[inline]
    fn to_word(self) -> u64 {
        self as u64
    }

    #[inline]
    fn from_word(word: u64) -> Option<Self> {
        Some(word as i64)
    }
}

/// Integer set keyed by `u8`.
pub type KeyU8 = Key<u8>;
/// Integer set keyed by `u16`.
pub type KeyU16 = Key<u16>;
/// Integer set keyed by `u32`.
pub type KeyU32 = Key<u32>;
/// Integer set keyed by `u64`.
pub type KeyU64 = Key<u64>;
/// Integer set keyed by `i64`.
pub type KeyInt = Key<i64>;

/// `u8` keys mapped to values.
pub type KeyValU8 = KeyVal<u8>;
/// `u16` keys mapped to values.
pub type KeyValU16 = KeyVal<u16>;
/// `u32` keys mapped to values.
pub type KeyValU32 = KeyVal<u32>;
/// `u64` keys mapped to values.
pub type KeyValU64 = KeyVal<u64>;
/// `i64` keys mapped to values.
pub type KeyValInt = KeyVal<i64>;

/// `u8` keys mapped to counts.
pub type CounterU8 = Counter<u8>;
/// `u16` keys mapped to counts.
pub type CounterU16 = Counter<u16>;
/// `u32` keys mapped to counts.
pub type CounterU32 = Counter<u32>;
/// `u64` keys mapped to counts.
pub type CounterU64 = Counter<u64>;
/// `i64` keys mapped to counts.
pub type CounterInt = Counter<i64>;

//! Compact, binary-searchable indices over short byte-string and integer keys.
//!
//! # Overview
//!
//! Byte-string keys of 1 to 64 bytes are packed into tuples of big-endian `u64` words
//! and stored in 64 sorted buckets: one per exact key length. Within a bucket, comparing
//! word tuples is equivalent to comparing the original bytes, so lookups are plain
//! binary searches over fixed-width integers.
//!
//! Keys are ordered first by length and then by bytes. The position of a key in this
//! order is its _rank_. [KeyBytes] returns ranks from [KeyBytes::find] and
//! [KeyBytes::add] so callers can keep values in a parallel array of their own.
//! [KeyValBytes] stores one `i64` per key and [CounterBytes] sums the values of
//! repeated keys.
//!
//! [numeric] provides the same containers over fixed-width integer keys.
//!
//! # Construction
//!
//! Containers can be grown one key at a time (`add`, O(n) per insert) or built in bulk
//! from unsorted input through a builder (`add_unsorted` then `build`, O(n log n)).
//! Building consumes the builder, so a batch can only be built once. A built container
//! can be turned back into a builder with `into_builder`.
//!
//! # Persistence
//!
//! Every container implements [binsearch_codec::Write] and [binsearch_codec::Read].
//! Decoding is bounded by a [Config] so untrusted input cannot allocate without limit.
//!
//! # Example
//!
//! ```
//! use binsearch::{Config, KeyBytes, KeyBytesBuilder, Search};
//! use binsearch_codec::{Decode, Encode};
//!
//! // Bulk construction reports how to reorder a parallel value array.
//! let mut builder = KeyBytesBuilder::new();
//! for key in [&b"pear"[..], b"fig", b"apple"] {
//!     builder.add_unsorted(key).unwrap();
//! }
//! let (mut index, remap) = builder.build();
//! assert_eq!(remap, vec![1, 0, 2]);
//!
//! // Shorter keys come first, then keys of equal length in byte order.
//! assert_eq!(index.find(b"fig").unwrap(), Search::Found(0));
//! assert_eq!(index.add(b"plum").unwrap(), Search::Absent(2));
//! assert_eq!(index.keys(), vec![b"fig".to_vec(), b"pear".to_vec(), b"plum".to_vec(), b"apple".to_vec()]);
//!
//! // Persist and restore.
//! let encoded = index.encode();
//! let restored = KeyBytes::decode_cfg(&encoded, &Config { max_entries: 1024 }).unwrap();
//! assert_eq!(restored, index);
//! ```

use thiserror::Error;

mod bucket;
pub mod bytes;
mod cursor;
pub mod key;
pub mod numeric;
mod offsets;
mod table;

pub use bytes::{
    CounterBytes, CounterBytesBuilder, KeyBytes, KeyBytesBuilder, KeyValBytes,
    KeyValBytesBuilder, ValueBytes, ValueBytesBuilder,
};

/// Maximum number of entries reserved up front when decoding.
///
/// Larger containers still decode, they just grow as entries arrive.
const PREALLOC_LIMIT: usize = 1 << 16;

/// Errors that can occur when interacting with an index.
#[derive(Error, Debug)]
pub enum Error {
    #[error("key too long: {0} bytes")]
    KeyTooLong(usize),
    #[error("empty key")]
    EmptyKey,
    #[error("invalid rank: {0}")]
    InvalidRank(usize),
    #[error("codec error: {0}")]
    Codec(#[from] binsearch_codec::Error),
}

/// Configuration for decoding an index.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// The maximum number of entries to accept.
    pub max_entries: usize,
}

/// The outcome of locating a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Search {
    /// The key is stored at this rank.
    Found(usize),
    /// The key is not stored. This is the rank it has (or would have) once inserted.
    Absent(usize),
}

impl Search {
    /// Returns the rank regardless of whether the key was found.
    pub fn rank(self) -> usize {
        match self {
            Self::Found(rank) | Self::Absent(rank) => rank,
        }
    }

    /// Returns true if the key was found.
    pub fn is_found(self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// How two values stored under the same key are combined.
pub trait Merge {
    /// Folds `next` into `kept`.
    fn merge(kept: &mut i64, next: i64);
}

/// The most recent value wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Replace {}

impl Merge for Replace {
    fn merge(kept: &mut i64, next: i64) {
        *kept = next;
    }
}

/// Values are added together, saturating at the bounds of `i64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sum {}

impl Merge for Sum {
    fn merge(kept: &mut i64, next: i64) {
        *kept = kept.saturating_add(next);
    }
}

//! Pack byte-string keys into big-endian word tuples.
//!
//! A key of `len` bytes is split into `ceil(len / 8)` words. Every word but the last holds
//! 8 bytes. The last word holds the remaining 1 to 8 bytes right-aligned, so the key's
//! final byte is always the word's least-significant byte.
//!
//! Keys are grouped by _class_ (`(len - 1) / 8`, one per word count) and _sub-bucket_
//! (`(len - 1) % 8`, one per trailing byte count). Together they select one of 64
//! _slots_. Because every key in a slot has the same length, comparing word tuples
//! lexicographically orders keys exactly like comparing their bytes.

use crate::Error;

/// Maximum key length, in bytes.
pub const MAX_LEN: usize = 64;

/// Bytes per word.
pub const WORD: usize = 8;

/// Number of length classes (one per word count).
pub const CLASSES: usize = MAX_LEN / WORD;

/// Number of sub-buckets per class (one per trailing byte count).
pub const SUBS: usize = WORD;

/// Number of slots (one per key length).
pub const SLOTS: usize = CLASSES * SUBS;

/// Packs up to 8 bytes into a big-endian word and returns it with its sub-bucket.
///
/// An empty input packs to `(0, 0)`, the same as `[0]`. [Packed] keeps the length
/// alongside the words to tell them apart. Returns `None` if `bytes` is longer than
/// 8 bytes.
pub fn encode(bytes: &[u8]) -> Option<(u64, usize)> {
    if bytes.len() > WORD {
        return None;
    }
    Some((pack(bytes), bytes.len().saturating_sub(1)))
}

/// Unpacks the `len` least-significant bytes of `word` in big-endian order.
///
/// Returns `None` if `len` is greater than 8.
pub fn decode(word: u64, len: usize) -> Option<Vec<u8>> {
    let start = WORD.checked_sub(len)?;
    Some(word.to_be_bytes()[start..].to_vec())
}

fn pack(chunk: &[u8]) -> u64 {
    chunk
        .iter()
        .fold(0u64, |word, byte| (word << 8) | u64::from(*byte))
}

/// Returns the number of significant bytes in `word` (at least 1).
///
/// This is the shortest length [decode] can use without losing set bits. It cannot
/// recover leading NUL bytes, which is why stored keys are decoded with the length
/// implied by their slot instead.
pub fn significant(word: u64) -> usize {
    (WORD - word.leading_zeros() as usize / 8).max(1)
}

/// Unpacks a word tuple into a key of `len` bytes.
pub fn unpack(words: &[u64], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for (i, word) in words.iter().enumerate() {
        let take = len.saturating_sub(i * WORD).min(WORD);
        out.extend_from_slice(&word.to_be_bytes()[WORD - take..]);
    }
    out
}

/// Returns the key length stored in `slot`.
pub fn slot_len(slot: usize) -> usize {
    slot + 1
}

/// A key packed into words, along with its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packed {
    words: [u64; CLASSES],
    len: usize,
}

impl Packed {
    /// Packs `key`, failing if it is longer than [MAX_LEN].
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        if key.len() > MAX_LEN {
            return Err(Error::KeyTooLong(key.len()));
        }
        let mut words = [0u64; CLASSES];
        for (word, chunk) in words.iter_mut().zip(key.chunks(WORD)) {
            *word = pack(chunk);
        }
        Ok(Self {
            words,
            len: key.len(),
        })
    }

    /// Packs a key that may be stored in a container.
    pub(crate) fn storable(key: &[u8]) -> Result<Self, Error> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        Self::new(key)
    }

    /// Returns the key length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the key is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the length class.
    pub fn class(&self) -> usize {
        self.len.saturating_sub(1) / WORD
    }

    /// Returns the sub-bucket within the length class.
    pub fn sub(&self) -> usize {
        self.len.saturating_sub(1) % WORD
    }

    /// Returns the slot (`class * 8 + sub`).
    pub fn slot(&self) -> usize {
        self.class() * SUBS + self.sub()
    }

    /// Returns the words that make up the key.
    pub fn words(&self) -> &[u64] {
        &self.words[..=self.class()]
    }

    /// Returns the first `N` words.
    pub fn head<const N: usize>(&self) -> [u64; N] {
        std::array::from_fn(|i| self.words[i])
    }

    /// Unpacks the key.
    pub fn to_vec(&self) -> Vec<u8> {
        unpack(self.words(), self.len)
    }
}

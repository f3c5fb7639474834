//! A sorted array of fixed-width word tuples.

use binsearch_codec::{read_len, varint, Error as CodecError, Sink, Source};

/// A value stored alongside a key.
pub trait Payload: Copy {
    /// Number of bytes written per value.
    const SIZE: usize;

    /// Writes the value to `sink`.
    fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError>;

    /// Reads a value from `source`.
    fn read(source: &mut impl Source) -> Result<Self, CodecError>;
}

impl Payload for () {
    const SIZE: usize = 0;

    fn write(&self, _: &mut impl Sink) -> Result<(), CodecError> {
        Ok(())
    }

    fn read(_: &mut impl Source) -> Result<Self, CodecError> {
        Ok(())
    }
}

impl Payload for i64 {
    const SIZE: usize = 8;

    fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError> {
        sink.write_u64(*self as u64)
    }

    fn read(source: &mut impl Source) -> Result<Self, CodecError> {
        Ok(source.read_u64()? as i64)
    }
}

/// A key tuple and its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry<const N: usize, V> {
    /// Packed key words.
    pub key: [u64; N],
    /// Value stored with the key.
    pub value: V,
}

/// Entries of a single key length, kept in ascending key order once sorted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket<const N: usize, V> {
    entries: Vec<Entry<N, V>>,
}

impl<const N: usize, V> Default for Bucket<N, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<const N: usize, V> Bucket<N, V> {
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bucket holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns every entry in storage order.
    pub fn entries(&self) -> &[Entry<N, V>] {
        &self.entries
    }

    /// Returns the key at `pos`.
    pub fn key(&self, pos: usize) -> &[u64; N] {
        &self.entries[pos].key
    }

    /// Returns the value at `pos`.
    pub fn value(&self, pos: usize) -> &V {
        &self.entries[pos].value
    }

    /// Returns a mutable reference to the value at `pos`.
    pub fn value_mut(&mut self, pos: usize) -> &mut V {
        &mut self.entries[pos].value
    }

    /// Iterates over every value mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|entry| &mut entry.value)
    }

    /// Binary searches for `key`, returning its position or the position it would be
    /// inserted at.
    pub fn search(&self, key: &[u64; N]) -> Result<usize, usize> {
        self.entries.binary_search_by(|entry| entry.key.cmp(key))
    }

    /// Inserts `key` at `pos`, shifting later entries.
    pub fn insert(&mut self, pos: usize, key: [u64; N], value: V) {
        self.entries.insert(pos, Entry { key, value });
    }

    /// Appends `key` without regard for order.
    pub fn push(&mut self, key: [u64; N], value: V) {
        self.entries.push(Entry { key, value });
    }

    /// Sorts by key, preserving the relative order of equal keys.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.key.cmp(&b.key));
    }

    /// Returns true if keys are strictly ascending.
    pub fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|pair| pair[0].key < pair[1].key)
    }

    /// Releases excess capacity, returning the number of entries reclaimed.
    pub fn shrink(&mut self) -> usize {
        let before = self.entries.capacity();
        self.entries.shrink_to_fit();
        before - self.entries.capacity()
    }

    /// Transforms every value, preserving order.
    pub fn map<W>(self, mut f: impl FnMut(V) -> W) -> Bucket<N, W> {
        Bucket {
            entries: self
                .entries
                .into_iter()
                .map(|Entry { key, value }| Entry {
                    key,
                    value: f(value),
                })
                .collect(),
        }
    }
}

impl<const N: usize, V: Copy> Bucket<N, V> {
    /// Collapses runs of equal keys into their first entry, folding later values in
    /// with `merge`. Returns the number of entries removed.
    ///
    /// Entries must already be sorted.
    pub fn collapse(&mut self, mut merge: impl FnMut(&mut V, V)) -> usize {
        let before = self.entries.len();
        self.entries.dedup_by(|next, kept| {
            if next.key != kept.key {
                return false;
            }
            merge(&mut kept.value, next.value);
            true
        });
        before - self.entries.len()
    }
}

impl<const N: usize, V: Payload> Bucket<N, V> {
    /// Writes the entry count followed by every entry's raw words.
    pub fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError> {
        sink.write_varint_u64(self.entries.len() as u64)?;
        for entry in &self.entries {
            for word in &entry.key {
                sink.write_u64(*word)?;
            }
            entry.value.write(sink)?;
        }
        Ok(())
    }

    pub fn encode_size(&self) -> usize {
        varint::size(self.entries.len() as u64) + self.entries.len() * (N * 8 + V::SIZE)
    }

    /// Reads a bucket for keys with `sub + 1` bytes in their trailing word.
    ///
    /// At most `budget` entries are accepted and the budget is reduced by the number
    /// read. Keys must be strictly ascending and fit their sub-bucket.
    pub fn read(
        source: &mut impl Source,
        sub: usize,
        budget: &mut usize,
    ) -> Result<Self, CodecError> {
        let len = read_len(source, *budget)?;
        *budget -= len;

        // Bits above the trailing word's width must be clear.
        let overflow = match sub + 1 {
            8 => 0,
            bytes => u64::MAX << (bytes * 8),
        };
        let mut entries: Vec<Entry<N, V>> = Vec::with_capacity(len.min(crate::PREALLOC_LIMIT));
        for _ in 0..len {
            let mut key = [0u64; N];
            for word in key.iter_mut() {
                *word = source.read_u64()?;
            }
            if key[N - 1] & overflow != 0 {
                return Err(CodecError::Invalid("Bucket", "key exceeds sub-bucket width"));
            }
            if let Some(last) = entries.last() {
                if last.key >= key {
                    return Err(CodecError::Invalid("Bucket", "keys not ascending"));
                }
            }
            let value = V::read(source)?;
            entries.push(Entry { key, value });
        }
        Ok(Self { entries })
    }
}

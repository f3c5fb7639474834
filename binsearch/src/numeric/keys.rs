use super::Numeric;
use crate::{Config, Error, Search, PREALLOC_LIMIT};
use binsearch_codec::{
    read_len, varint, EncodeSize, Error as CodecError, Read, Sink, Source, Write,
};
use std::cmp::Ordering;
use tracing::debug;

/// A sorted set of integer keys, each identified by its rank.
#[derive(Clone, Debug)]
pub struct Key<K> {
    keys: Vec<K>,
    cursor: usize,
}

impl<K: PartialEq> PartialEq for Key<K> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl<K: Eq> Eq for Key<K> {}

impl<K> Default for Key<K> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            cursor: 0,
        }
    }
}

impl<K: Numeric> Key<K> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Locates `key`.
    pub fn find(&self, key: K) -> Search {
        match self.keys.binary_search(&key) {
            Ok(rank) => Search::Found(rank),
            Err(rank) => Search::Absent(rank),
        }
    }

    /// Inserts `key` if it is not already present.
    ///
    /// Returns [Search::Found] with the existing rank, or [Search::Absent] with the rank
    /// the key was inserted at.
    pub fn add(&mut self, key: K) -> Search {
        let search = self.find(key);
        if let Search::Absent(rank) = search {
            self.keys.insert(rank, key);
        }
        search
    }

    /// Inserts `key` at `rank` without searching.
    ///
    /// Fails with [Error::InvalidRank] if the key does not belong at `rank`.
    pub fn add_at(&mut self, key: K, rank: usize) -> Result<(), Error> {
        if rank > self.keys.len() {
            return Err(Error::InvalidRank(rank));
        }
        if rank > 0 && self.keys[rank - 1].cmp(&key) != Ordering::Less {
            return Err(Error::InvalidRank(rank));
        }
        if rank < self.keys.len() && self.keys[rank].cmp(&key) != Ordering::Greater {
            return Err(Error::InvalidRank(rank));
        }
        self.keys.insert(rank, key);
        Ok(())
    }

    /// Releases capacity reserved for future inserts.
    pub fn optimize(&mut self) {
        self.keys.shrink_to_fit();
    }

    /// Rewinds the iteration cursor. Returns false if there are no keys.
    pub fn reset(&mut self) -> bool {
        self.cursor = 0;
        !self.keys.is_empty()
    }

    /// Returns the next key in order and whether it is the last one.
    ///
    /// After the last key the cursor rewinds on its own. Returns `None` if there are no
    /// keys.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(K, bool)> {
        if self.cursor >= self.keys.len() {
            self.cursor = 0;
        }
        let key = *self.keys.get(self.cursor)?;
        self.cursor += 1;
        let last = self.cursor == self.keys.len();
        if last {
            self.cursor = 0;
        }
        Some((key, last))
    }

    /// Returns every key in order.
    pub fn keys(&self) -> Vec<K> {
        self.keys.clone()
    }

    /// Iterates over every key in order.
    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.keys.iter().copied()
    }

    /// Reopens the container for bulk insertion. Existing keys are assigned their
    /// current rank as insertion index.
    pub fn into_builder(self) -> KeyBuilder<K> {
        KeyBuilder {
            entries: self.keys.into_iter().enumerate().map(|(i, k)| (k, i)).collect(),
        }
    }

    /// Wraps keys that are already sorted and unique.
    pub(super) fn from_sorted(keys: Vec<K>) -> Self {
        Self { keys, cursor: 0 }
    }
}

impl<K: Numeric> Write for Key<K> {
    fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError> {
        sink.write_varint_u64(self.keys.len() as u64)?;
        for key in &self.keys {
            key.write_key(sink)?;
        }
        Ok(())
    }
}

impl<K: Numeric> EncodeSize for Key<K> {
    fn encode_size(&self) -> usize {
        varint::size(self.keys.len() as u64)
            + self
                .keys
                .iter()
                .map(|key| key.key_size())
                .sum::<usize>()
    }
}

impl<K: Numeric> Read for Key<K> {
    type Cfg = Config;

    fn read_cfg(source: &mut impl Source, cfg: &Config) -> Result<Self, CodecError> {
        let len = read_len(source, cfg.max_entries)?;
        let mut keys: Vec<K> = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        for _ in 0..len {
            let key = read_key(source, "Key")?;
            if keys.last().is_some_and(|last| *last >= key) {
                return Err(CodecError::Invalid("Key", "keys not ascending"));
            }
            keys.push(key);
        }
        debug!(entries = len, "read integer key index");
        Ok(Self::from_sorted(keys))
    }
}

/// Reads a key and checks that it fits `K`.
pub(super) fn read_key<K: Numeric>(
    source: &mut impl Source,
    context: &'static str,
) -> Result<K, CodecError> {
    K::read_key(source)?.ok_or(CodecError::Invalid(context, "key out of range"))
}

/// Collects integer keys in any order and sorts them once.
#[derive(Clone, Debug)]
pub struct KeyBuilder<K> {
    /// Keys and their insertion index.
    entries: Vec<(K, usize)>,
}

impl<K> Default for KeyBuilder<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Numeric> KeyBuilder<K> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys added (duplicates included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds `key` without sorting.
    pub fn add_unsorted(&mut self, key: K) {
        let index = self.entries.len();
        self.entries.push((key, index));
    }

    /// Sorts every key and removes duplicates (the first insertion is kept).
    ///
    /// Returns the container and a remap such that `remap[rank]` is the insertion index
    /// of the key at `rank`.
    pub fn build(self) -> (Key<K>, Vec<usize>) {
        let mut entries = self.entries;
        let added = entries.len();
        entries.sort_by_key(|(key, _)| *key);
        entries.dedup_by_key(|(key, _)| *key);
        let (keys, remap): (Vec<K>, Vec<usize>) = entries.into_iter().unzip();
        debug!(
            entries = keys.len(),
            duplicates = added - keys.len(),
            "built integer key index"
        );
        (Key::from_sorted(keys), remap)
    }
}

use super::{keys::read_key, Key, Numeric};
use crate::{Config, Merge, Replace, Sum, PREALLOC_LIMIT};
use binsearch_codec::{
    read_len, varint, EncodeSize, Error as CodecError, Read, Sink, Source, Write,
};
use std::{fmt, marker::PhantomData};
use tracing::{debug, trace};

/// A sorted map from integer keys to `i64` values.
///
/// `P` decides how a value added under an existing key is combined with the stored one.
/// Use the [KeyVal] and [Counter] aliases.
pub struct ValueMap<K, P> {
    entries: Vec<(K, i64)>,
    cursor: usize,
    _merge: PhantomData<P>,
}

/// Integer keys mapped to values. Adding an existing key replaces its value.
pub type KeyVal<K> = ValueMap<K, Replace>;

/// Integer keys mapped to counts. Adding an existing key adds to its count.
pub type Counter<K> = ValueMap<K, Sum>;

impl<K, P> Default for ValueMap<K, P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            _merge: PhantomData,
        }
    }
}

impl<K: Clone, P> Clone for ValueMap<K, P> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            cursor: self.cursor,
            _merge: PhantomData,
        }
    }
}

impl<K: fmt::Debug, P> fmt::Debug for ValueMap<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueMap")
            .field("entries", &self.entries)
            .finish()
    }
}

impl<K: PartialEq, P> PartialEq for ValueMap<K, P> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq, P> Eq for ValueMap<K, P> {}

impl<K: Numeric, P: Merge> ValueMap<K, P> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    fn from_sorted(entries: Vec<(K, i64)>) -> Self {
        Self {
            entries,
            cursor: 0,
            _merge: PhantomData,
        }
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn search(&self, key: K) -> Result<usize, usize> {
        self.entries.binary_search_by(|(stored, _)| stored.cmp(&key))
    }

    /// Returns the value stored under `key`.
    pub fn find(&self, key: K) -> Option<i64> {
        self.search(key).ok().map(|pos| self.entries[pos].1)
    }

    /// Replaces the value stored under `key` with `f(value)`. Returns false if the key is
    /// not present.
    pub fn update(&mut self, key: K, f: impl FnOnce(i64) -> i64) -> bool {
        let Ok(pos) = self.search(key) else {
            return false;
        };
        let value = &mut self.entries[pos].1;
        *value = f(*value);
        true
    }

    /// Replaces every value with `f(value)`.
    pub fn update_all(&mut self, mut f: impl FnMut(i64) -> i64) {
        for (_, value) in &mut self.entries {
            *value = f(*value);
        }
    }

    /// Stores `value` under `key`, merging it with any existing value.
    ///
    /// Returns true if the key was already present.
    pub fn add(&mut self, key: K, value: i64) -> bool {
        match self.search(key) {
            Ok(pos) => {
                P::merge(&mut self.entries[pos].1, value);
                true
            }
            Err(pos) => {
                self.entries.insert(pos, (key, value));
                false
            }
        }
    }

    /// Returns the largest stored value, or `None` if there are no keys.
    pub fn greatest_value(&self) -> Option<i64> {
        self.entries.iter().map(|(_, value)| *value).max()
    }

    /// Releases capacity reserved for future inserts.
    pub fn optimize(&mut self) {
        let reclaimed = self.entries.capacity() - self.entries.len();
        self.entries.shrink_to_fit();
        trace!(reclaimed, "optimized integer value index");
    }

    /// Rewinds the iteration cursor. Returns false if there are no keys.
    pub fn reset(&mut self) -> bool {
        self.cursor = 0;
        !self.entries.is_empty()
    }

    /// Returns the next key and value in order and whether they are the last ones.
    ///
    /// After the last key the cursor rewinds on its own.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(K, i64, bool)> {
        if self.cursor >= self.entries.len() {
            self.cursor = 0;
        }
        let (key, value) = *self.entries.get(self.cursor)?;
        self.cursor += 1;
        let last = self.cursor == self.entries.len();
        if last {
            self.cursor = 0;
        }
        Some((key, value, last))
    }

    /// Returns every key in order.
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|(key, _)| *key).collect()
    }

    /// Iterates over every key and value in order.
    pub fn iter(&self) -> impl Iterator<Item = (K, i64)> + '_ {
        self.entries.iter().copied()
    }

    /// Reopens the map for bulk insertion.
    pub fn into_builder(self) -> ValueMapBuilder<K, P> {
        ValueMapBuilder {
            entries: self.entries,
            _merge: PhantomData,
        }
    }
}

impl<K: Numeric> Counter<K> {
    /// Copies the keys into a [Key].
    pub fn to_key(&self) -> Key<K> {
        Key::from_sorted(self.keys())
    }

    /// Copies the keys and counts into a [KeyVal].
    pub fn to_key_val(&self) -> KeyVal<K> {
        KeyVal::from_sorted(self.entries.clone())
    }
}

impl<K: Numeric, P> Write for ValueMap<K, P> {
    fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError> {
        sink.write_varint_u64(self.entries.len() as u64)?;
        for (key, value) in &self.entries {
            sink.write_varint_u64(*value as u64)?;
            key.write_key(sink)?;
        }
        Ok(())
    }
}

impl<K: Numeric, P> EncodeSize for ValueMap<K, P> {
    fn encode_size(&self) -> usize {
        varint::size(self.entries.len() as u64)
            + self
                .entries
                .iter()
                .map(|(key, value)| varint::size(*value as u64) + key.key_size())
                .sum::<usize>()
    }
}

impl<K: Numeric, P: Merge> Read for ValueMap<K, P> {
    type Cfg = Config;

    fn read_cfg(source: &mut impl Source, cfg: &Config) -> Result<Self, CodecError> {
        let len = read_len(source, cfg.max_entries)?;
        let mut entries: Vec<(K, i64)> = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        for _ in 0..len {
            let value = source.read_varint_u64()? as i64;
            let key = read_key(source, "ValueMap")?;
            if entries.last().is_some_and(|(last, _)| *last >= key) {
                return Err(CodecError::Invalid("ValueMap", "keys not ascending"));
            }
            entries.push((key, value));
        }
        debug!(entries = len, "read integer value index");
        Ok(Self::from_sorted(entries))
    }
}

/// Collects integer keys and values in any order and sorts them once.
pub struct ValueMapBuilder<K, P> {
    entries: Vec<(K, i64)>,
    _merge: PhantomData<P>,
}

/// Builds a [KeyVal]. For repeated keys, the last value added wins.
pub type KeyValBuilder<K> = ValueMapBuilder<K, Replace>;

/// Builds a [Counter]. Repeated keys have their counts summed.
pub type CounterBuilder<K> = ValueMapBuilder<K, Sum>;

impl<K, P> Default for ValueMapBuilder<K, P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            _merge: PhantomData,
        }
    }
}

impl<K: Numeric, P: Merge> ValueMapBuilder<K, P> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries added (duplicates included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds `key` with `value` without sorting.
    pub fn add_unsorted(&mut self, key: K, value: i64) {
        self.entries.push((key, value));
    }

    /// Sorts every entry and merges the values of repeated keys in insertion order.
    pub fn build(self) -> ValueMap<K, P> {
        let mut entries = self.entries;
        let added = entries.len();
        entries.sort_by_key(|(key, _)| *key);
        // `dedup_by` passes the later entry first.
        entries.dedup_by(|next, kept| {
            if next.0 != kept.0 {
                return false;
            }
            P::merge(&mut kept.1, next.1);
            true
        });
        debug!(
            entries = entries.len(),
            merged = added - entries.len(),
            "built integer value index"
        );
        ValueMap::from_sorted(entries)
    }
}

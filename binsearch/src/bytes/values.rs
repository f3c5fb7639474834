use crate::{
    bytes::KeyBytes, cursor::Cursor, key::Packed, table::Table, Config, Error, Merge, Replace,
    Sum,
};
use binsearch_codec::{
    read_len, varint, EncodeSize, Error as CodecError, Read, Sink, Source, Write,
};
use std::{fmt, marker::PhantomData};
use tracing::{debug, trace, warn};

/// A sorted map from byte-string keys to `i64` values.
///
/// `P` decides how a value added under an existing key is combined with the stored one.
/// Use the [KeyValBytes] and [CounterBytes] aliases.
pub struct ValueBytes<P> {
    table: Table<i64>,
    total: usize,
    cursor: Cursor,
    _merge: PhantomData<P>,
}

/// Keys mapped to values. Adding an existing key replaces its value.
pub type KeyValBytes = ValueBytes<Replace>;

/// Keys mapped to counts. Adding an existing key adds to its count.
pub type CounterBytes = ValueBytes<Sum>;

impl<P> Default for ValueBytes<P> {
    fn default() -> Self {
        Self {
            table: Table::default(),
            total: 0,
            cursor: Cursor::default(),
            _merge: PhantomData,
        }
    }
}

impl<P> Clone for ValueBytes<P> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            total: self.total,
            cursor: self.cursor,
            _merge: PhantomData,
        }
    }
}

impl<P> fmt::Debug for ValueBytes<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueBytes")
            .field("total", &self.total)
            .field("table", &self.table)
            .finish()
    }
}

impl<P> PartialEq for ValueBytes<P> {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total && self.table == other.table
    }
}

impl<P> Eq for ValueBytes<P> {}

impl<P: Merge> ValueBytes<P> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    fn from_table(table: Table<i64>) -> Self {
        Self {
            total: table.total(),
            table,
            ..Self::default()
        }
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.total
    }

    /// Returns true if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Returns the value stored under `key`, if any.
    pub fn find(&self, key: &[u8]) -> Result<Option<i64>, Error> {
        let key = Packed::storable(key)?;
        Ok(self
            .table
            .search(&key)
            .ok()
            .map(|pos| *self.table.value_at(key.slot(), pos)))
    }

    /// Replaces the value stored under `key` with `f(value)`. Returns false if the key is
    /// not present.
    pub fn update(&mut self, key: &[u8], f: impl FnOnce(i64) -> i64) -> Result<bool, Error> {
        let key = Packed::storable(key)?;
        let Ok(pos) = self.table.search(&key) else {
            return Ok(false);
        };
        let value = self.table.value_mut(key.slot(), pos);
        *value = f(*value);
        Ok(true)
    }

    /// Replaces every value with `f(value)`.
    pub fn update_all(&mut self, mut f: impl FnMut(i64) -> i64) {
        self.table.for_each_value(|value| *value = f(*value));
    }

    /// Stores `value` under `key`, merging it with any existing value.
    ///
    /// Returns true if the key was already present.
    pub fn add(&mut self, key: &[u8], value: i64) -> Result<bool, Error> {
        let key = Packed::storable(key)?;
        match self.table.search(&key) {
            Ok(pos) => {
                P::merge(self.table.value_mut(key.slot(), pos), value);
                Ok(true)
            }
            Err(pos) => {
                self.table.insert(&key, pos, value);
                self.total += 1;
                Ok(false)
            }
        }
    }

    /// Returns the largest stored value, or `None` if there are no keys.
    pub fn greatest_value(&self) -> Option<i64> {
        let mut greatest = None;
        self.table.visit_values(|value| {
            greatest = Some(greatest.map_or(*value, |g: i64| g.max(*value)));
        });
        greatest
    }

    /// Releases capacity reserved for future inserts.
    pub fn optimize(&mut self) {
        let reclaimed = self.table.shrink();
        trace!(reclaimed, "optimized value index");
    }

    /// Rewinds the iteration cursor. Returns false if there are no keys.
    pub fn reset(&mut self) -> bool {
        let table = &self.table;
        self.cursor.reset(|slot| table.slot_len(slot))
    }

    /// Returns the next key and value in order and whether they are the last ones.
    ///
    /// After the last key the cursor rewinds on its own. Returns `None` if there are no
    /// keys.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(Vec<u8>, i64, bool)> {
        let table = &self.table;
        let (slot, pos, last) = self.cursor.advance(|slot| table.slot_len(slot))?;
        Some((
            self.table.key_at(slot, pos),
            *self.table.value_at(slot, pos),
            last,
        ))
    }

    /// Returns every key in order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.iter().map(|(key, _)| key).collect()
    }

    /// Iterates over every key and value in order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec<u8>, i64)> + '_ {
        self.table.iter().map(|(key, value)| (key, *value))
    }

    /// Reopens the container for bulk insertion.
    pub fn into_builder(self) -> ValueBytesBuilder<P> {
        ValueBytesBuilder {
            table: self.table,
            pending: self.total,
            _merge: PhantomData,
        }
    }
}

impl CounterBytes {
    /// Copies the keys into a [KeyBytes].
    pub fn to_key_bytes(&self) -> KeyBytes {
        KeyBytes::from_table(self.table.clone().map(|_| ()))
    }

    /// Copies the keys and counts into a [KeyValBytes].
    pub fn to_key_val_bytes(&self) -> KeyValBytes {
        KeyValBytes::from_table(self.table.clone())
    }
}

impl<P> Write for ValueBytes<P> {
    fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError> {
        sink.write_varint_u64(self.total as u64)?;
        self.table.write(sink)?;
        debug!(entries = self.total, "wrote value index");
        Ok(())
    }
}

impl<P> EncodeSize for ValueBytes<P> {
    fn encode_size(&self) -> usize {
        varint::size(self.total as u64) + self.table.encode_size()
    }
}

impl<P: Merge> Read for ValueBytes<P> {
    type Cfg = Config;

    fn read_cfg(source: &mut impl Source, cfg: &Config) -> Result<Self, CodecError> {
        let total = read_len(source, cfg.max_entries)?;
        let table = Table::read(source, total)?;
        if table.total() != total {
            warn!(total, "entry count mismatch");
            return Err(CodecError::Invalid("ValueBytes", "entry count mismatch"));
        }
        debug!(entries = total, "read value index");
        Ok(Self::from_table(table))
    }
}

/// Collects keys and values in any order and sorts them once.
pub struct ValueBytesBuilder<P> {
    table: Table<i64>,
    pending: usize,
    _merge: PhantomData<P>,
}

/// Builds a [KeyValBytes]. For repeated keys, the last value added wins.
pub type KeyValBytesBuilder = ValueBytesBuilder<Replace>;

/// Builds a [CounterBytes]. Repeated keys have their counts summed.
pub type CounterBytesBuilder = ValueBytesBuilder<Sum>;

impl<P> Default for ValueBytesBuilder<P> {
    fn default() -> Self {
        Self {
            table: Table::default(),
            pending: 0,
            _merge: PhantomData,
        }
    }
}

impl<P: Merge> ValueBytesBuilder<P> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries added (duplicates included).
    pub fn len(&self) -> usize {
        self.pending
    }

    /// Returns true if no entries have been added.
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Adds `key` with `value` without sorting.
    pub fn add_unsorted(&mut self, key: &[u8], value: i64) -> Result<(), Error> {
        let key = Packed::storable(key)?;
        self.table.push(&key, value);
        self.pending += 1;
        Ok(())
    }

    /// Sorts every entry and merges the values of repeated keys in insertion order.
    pub fn build(self) -> ValueBytes<P> {
        let mut table = self.table;
        table.sort();
        let merged = table.collapse(P::merge);
        debug!(entries = self.pending - merged, merged, "built value index");
        ValueBytes::from_table(table)
    }
}

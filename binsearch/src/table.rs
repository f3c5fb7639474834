//! The 64 buckets of a byte-keyed container, one per key length.
//!
//! Keys of class `c` are stored as `[u64; c + 1]` tuples, so each class has its own
//! bucket type. The `with_class` and `each_class` macros dispatch statically to the
//! right one.

use crate::{
    bucket::{Bucket, Payload},
    key::{self, Packed, SLOTS, SUBS},
};
use binsearch_codec::{Error as CodecError, Sink, Source};
use std::cmp::Ordering;

/// The buckets of one class, indexed by sub-bucket.
type Class<const N: usize, V> = [Bucket<N, V>; SUBS];

/// Binds the buckets of `$class` to `$buckets` and evaluates `$body`.
macro_rules! with_class {
    ($table:expr, $class:expr, |$buckets:ident| $body:expr) => {
        match $class {
            0 => {
                let $buckets = &$table.w1;
                $body
            }
            1 => {
                let $buckets = &$table.w2;
                $body
            }
            2 => {
                let $buckets = &$table.w3;
                $body
            }
            3 => {
                let $buckets = &$table.w4;
                $body
            }
            4 => {
                let $buckets = &$table.w5;
                $body
            }
            5 => {
                let $buckets = &$table.w6;
                $body
            }
            6 => {
                let $buckets = &$table.w7;
                $body
            }
            _ => {
                let $buckets = &$table.w8;
                $body
            }
        }
    };
}

/// Like `with_class`, but binds the buckets mutably.
macro_rules! with_class_mut {
    ($table:expr, $class:expr, |$buckets:ident| $body:expr) => {
        match $class {
            0 => {
                let $buckets = &mut $table.w1;
                $body
            }
            1 => {
                let $buckets = &mut $table.w2;
                $body
            }
            2 => {
                let $buckets = &mut $table.w3;
                $body
            }
            3 => {
                let $buckets = &mut $table.w4;
                $body
            }
            4 => {
                let $buckets = &mut $table.w5;
                $body
            }
            5 => {
                let $buckets = &mut $table.w6;
                $body
            }
            6 => {
                let $buckets = &mut $table.w7;
                $body
            }
            _ => {
                let $buckets = &mut $table.w8;
                $body
            }
        }
    };
}

/// Evaluates `$body` for every class in traversal order.
macro_rules! each_class {
    ($table:expr, |$class:ident, $buckets:ident| $body:block) => {
        visit_classes!(ref $table, $class, $buckets, $body)
    };
}

/// Like `each_class`, but binds the buckets mutably.
macro_rules! each_class_mut {
    ($table:expr, |$class:ident, $buckets:ident| $body:block) => {
        visit_classes!(mut $table, $class, $buckets, $body)
    };
}

macro_rules! visit_classes {
    (@bind ref $table:expr, $field:ident) => {
        &$table.$field
    };
    (@bind mut $table:expr, $field:ident) => {
        &mut $table.$field
    };
    (@fields $mode:tt $table:expr, $class:ident, $buckets:ident, $body:block,
        $(($index:literal, $field:ident)),*) => {
        $({
            #[allow(unused_variables)]
            let $class: usize = $index;
            let $buckets = visit_classes!(@bind $mode $table, $field);
            $body
        })*
    };
    ($mode:tt $table:expr, $class:ident, $buckets:ident, $body:block) => {
        visit_classes!(@fields $mode $table, $class, $buckets, $body,
            (0, w1), (1, w2), (2, w3), (3, w4), (4, w5), (5, w6), (6, w7), (7, w8))
    };
}

/// Every bucket of a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table<V> {
    w1: Class<1, V>,
    w2: Class<2, V>,
    w3: Class<3, V>,
    w4: Class<4, V>,
    w5: Class<5, V>,
    w6: Class<6, V>,
    w7: Class<7, V>,
    w8: Class<8, V>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            w1: Default::default(),
            w2: Default::default(),
            w3: Default::default(),
            w4: Default::default(),
            w5: Default::default(),
            w6: Default::default(),
            w7: Default::default(),
            w8: Default::default(),
        }
    }
}

fn split(slot: usize) -> (usize, usize) {
    (slot / SUBS, slot % SUBS)
}

fn map_class<const N: usize, V, W>(
    class: Class<N, V>,
    f: &mut impl FnMut(V) -> W,
) -> Class<N, W> {
    class.map(|bucket| bucket.map(&mut *f))
}

fn read_class<const N: usize, V: Payload>(
    source: &mut impl Source,
    budget: &mut usize,
) -> Result<Class<N, V>, CodecError> {
    let mut class: Class<N, V> = Default::default();
    for (sub, bucket) in class.iter_mut().enumerate() {
        *bucket = Bucket::read(source, sub, budget)?;
    }
    Ok(class)
}

impl<V> Table<V> {
    /// Returns the number of entries in `slot`.
    pub fn slot_len(&self, slot: usize) -> usize {
        let (class, sub) = split(slot);
        with_class!(self, class, |buckets| buckets[sub].len())
    }

    /// Returns the number of entries in every slot.
    pub fn lens(&self) -> [usize; SLOTS] {
        let mut lens = [0; SLOTS];
        each_class!(self, |class, buckets| {
            for (sub, bucket) in buckets.iter().enumerate() {
                lens[class * SUBS + sub] = bucket.len();
            }
        });
        lens
    }

    /// Returns the total number of entries.
    pub fn total(&self) -> usize {
        self.lens().iter().sum()
    }

    /// Searches the key's slot, returning its position or insertion point.
    pub fn search(&self, key: &Packed) -> Result<usize, usize> {
        let sub = key.sub();
        with_class!(self, key.class(), |buckets| buckets[sub].search(&key.head()))
    }

    /// Compares the entry at `pos` in the key's slot with the key.
    pub fn cmp_at(&self, key: &Packed, pos: usize) -> Ordering {
        let sub = key.sub();
        with_class!(self, key.class(), |buckets| buckets[sub]
            .key(pos)
            .cmp(&key.head()))
    }

    /// Inserts the key at `pos` within its slot.
    pub fn insert(&mut self, key: &Packed, pos: usize, value: V) {
        let sub = key.sub();
        with_class_mut!(self, key.class(), |buckets| buckets[sub].insert(
            pos,
            key.head(),
            value
        ))
    }

    /// Appends the key to its slot without regard for order.
    pub fn push(&mut self, key: &Packed, value: V) {
        let sub = key.sub();
        with_class_mut!(self, key.class(), |buckets| buckets[sub].push(key.head(), value))
    }

    /// Unpacks the key at `pos` in `slot`.
    pub fn key_at(&self, slot: usize, pos: usize) -> Vec<u8> {
        let (class, sub) = split(slot);
        with_class!(self, class, |buckets| key::unpack(
            buckets[sub].key(pos),
            key::slot_len(slot)
        ))
    }

    pub fn value_at(&self, slot: usize, pos: usize) -> &V {
        let (class, sub) = split(slot);
        with_class!(self, class, |buckets| buckets[sub].value(pos))
    }

    pub fn value_mut(&mut self, slot: usize, pos: usize) -> &mut V {
        let (class, sub) = split(slot);
        with_class_mut!(self, class, |buckets| buckets[sub].value_mut(pos))
    }

    /// Calls `f` with every value in traversal order.
    pub fn visit_values(&self, mut f: impl FnMut(&V)) {
        each_class!(self, |class, buckets| {
            for bucket in buckets.iter() {
                bucket.entries().iter().for_each(|entry| f(&entry.value));
            }
        });
    }

    /// Applies `f` to every value.
    pub fn for_each_value(&mut self, mut f: impl FnMut(&mut V)) {
        each_class_mut!(self, |class, buckets| {
            for bucket in buckets.iter_mut() {
                bucket.values_mut().for_each(&mut f);
            }
        });
    }

    /// Sorts every bucket, preserving the relative order of equal keys.
    pub fn sort(&mut self) {
        each_class_mut!(self, |class, buckets| {
            buckets.iter_mut().for_each(Bucket::sort);
        });
    }

    /// Returns true if every bucket is strictly ascending.
    pub fn is_sorted(&self) -> bool {
        let mut sorted = true;
        each_class!(self, |class, buckets| {
            sorted &= buckets.iter().all(Bucket::is_sorted);
        });
        sorted
    }

    /// Releases excess capacity, returning the number of entries reclaimed.
    pub fn shrink(&mut self) -> usize {
        let mut reclaimed = 0;
        each_class_mut!(self, |class, buckets| {
            reclaimed += buckets.iter_mut().map(Bucket::shrink).sum::<usize>();
        });
        reclaimed
    }

    /// Transforms every value in traversal order.
    pub fn map<W>(self, mut f: impl FnMut(V) -> W) -> Table<W> {
        Table {
            w1: map_class(self.w1, &mut f),
            w2: map_class(self.w2, &mut f),
            w3: map_class(self.w3, &mut f),
            w4: map_class(self.w4, &mut f),
            w5: map_class(self.w5, &mut f),
            w6: map_class(self.w6, &mut f),
            w7: map_class(self.w7, &mut f),
            w8: map_class(self.w8, &mut f),
        }
    }

    /// Iterates over every entry in traversal order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            table: self,
            slot: 0,
            pos: 0,
        }
    }
}

impl<V: Copy> Table<V> {
    /// Collapses runs of equal keys (see [Bucket::collapse]). Returns the number of
    /// entries removed.
    pub fn collapse(&mut self, mut merge: impl FnMut(&mut V, V)) -> usize {
        let mut removed = 0;
        each_class_mut!(self, |class, buckets| {
            for bucket in buckets.iter_mut() {
                removed += bucket.collapse(&mut merge);
            }
        });
        removed
    }
}

impl<V: Payload> Table<V> {
    /// Writes every bucket in traversal order.
    pub fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError> {
        each_class!(self, |class, buckets| {
            for bucket in buckets.iter() {
                bucket.write(sink)?;
            }
        });
        Ok(())
    }

    pub fn encode_size(&self) -> usize {
        let mut size = 0;
        each_class!(self, |class, buckets| {
            size += buckets.iter().map(Bucket::encode_size).sum::<usize>();
        });
        size
    }

    /// Reads every bucket in traversal order, accepting at most `budget` entries.
    pub fn read(source: &mut impl Source, mut budget: usize) -> Result<Self, CodecError> {
        let budget = &mut budget;
        Ok(Self {
            w1: read_class(source, budget)?,
            w2: read_class(source, budget)?,
            w3: read_class(source, budget)?,
            w4: read_class(source, budget)?,
            w5: read_class(source, budget)?,
            w6: read_class(source, budget)?,
            w7: read_class(source, budget)?,
            w8: read_class(source, budget)?,
        })
    }
}

/// An iterator over the keys and values of a [Table] in traversal order.
pub struct Iter<'a, V> {
    table: &'a Table<V>,
    slot: usize,
    pos: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot < SLOTS {
            if self.pos < self.table.slot_len(self.slot) {
                let item = (
                    self.table.key_at(self.slot, self.pos),
                    self.table.value_at(self.slot, self.pos),
                );
                self.pos += 1;
                return Some(item);
            }
            self.slot += 1;
            self.pos = 0;
        }
        None
    }
}

use crate::{
    cursor::Cursor,
    key::Packed,
    offsets::Offsets,
    table::Table,
    Config, Error, Search,
};
use binsearch_codec::{
    read_len, varint, EncodeSize, Error as CodecError, Read, Sink, Source, Write,
};
use std::cmp::Ordering;
use tracing::{debug, trace, warn};

/// A sorted set of byte-string keys, each identified by its rank.
///
/// Ranks are dense (`0..len()`) and follow key order: shorter keys first, keys of equal
/// length in byte order. Inserting a key shifts the rank of every later key by one.
#[derive(Clone, Debug, Default)]
pub struct KeyBytes {
    table: Table<()>,
    offsets: Offsets,
    total: usize,
    cursor: Cursor,
}

impl PartialEq for KeyBytes {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total && self.offsets == other.offsets && self.table == other.table
    }
}

impl Eq for KeyBytes {}

impl KeyBytes {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a sorted, duplicate-free table.
    pub(crate) fn from_table(table: Table<()>) -> Self {
        let lens = table.lens();
        Self {
            offsets: Offsets::from_lens(&lens),
            total: lens.iter().sum(),
            table,
            cursor: Cursor::default(),
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

    /// Locates `key`.
    pub fn find(&self, key: &[u8]) -> Result<Search, Error> {
        let key = Packed::storable(key)?;
        Ok(self.locate(&key).0)
    }

    fn locate(&self, key: &Packed) -> (Search, usize) {
        let slot = key.slot();
        match self.table.search(key) {
            Ok(pos) => (Search::Found(self.offsets.rank(slot, pos)), pos),
            Err(pos) => (Search::Absent(self.offsets.rank(slot, pos)), pos),
        }
    }

    /// Inserts `key` if it is not already present.
    ///
    /// Returns [Search::Found] with the existing rank, or [Search::Absent] with the rank
    /// the key was inserted at.
    pub fn add(&mut self, key: &[u8]) -> Result<Search, Error> {
        let key = Packed::storable(key)?;
        let (search, pos) = self.locate(&key);
        if !search.is_found() {
            self.insert(&key, pos);
        }
        Ok(search)
    }

    /// Inserts `key` at `rank`, as returned by a prior [KeyBytes::find] that reported
    /// [Search::Absent], skipping the search.
    ///
    /// Fails with [Error::InvalidRank] if the key does not belong at `rank`.
    pub fn add_at(&mut self, key: &[u8], rank: usize) -> Result<(), Error> {
        let key = Packed::storable(key)?;
        let range = self.offsets.range(key.slot(), self.total);
        if !range.contains(&rank) && rank != range.end {
            return Err(Error::InvalidRank(rank));
        }
        let pos = rank - range.start;

        // Neighbours must remain strictly ordered around the new key.
        if pos > 0 && self.table.cmp_at(&key, pos - 1) != Ordering::Less {
            return Err(Error::InvalidRank(rank));
        }
        if rank < range.end && self.table.cmp_at(&key, pos) != Ordering::Greater {
            return Err(Error::InvalidRank(rank));
        }
        self.insert(&key, pos);
        Ok(())
    }

    fn insert(&mut self, key: &Packed, pos: usize) {
        self.table.insert(key, pos, ());
        self.offsets.bump_after(key.slot());
        self.total += 1;
    }

    /// Releases capacity reserved for future inserts.
    pub fn optimize(&mut self) {
        let reclaimed = self.table.shrink();
        trace!(reclaimed, "optimized key index");
    }

    /// Rewinds the iteration cursor. Returns false if there are no keys.
    pub fn reset(&mut self) -> bool {
        let table = &self.table;
        self.cursor.reset(|slot| table.slot_len(slot))
    }

    /// Returns the next key in order and whether it is the last one.
    ///
    /// After the last key the cursor rewinds on its own. Returns `None` if there are no
    /// keys.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(Vec<u8>, bool)> {
        let table = &self.table;
        let (slot, pos, last) = self.cursor.advance(|slot| table.slot_len(slot))?;
        Some((self.table.key_at(slot, pos), last))
    }

    /// Returns every key in order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.iter().collect()
    }

    /// Iterates over every key in order.
    pub fn iter(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.table.iter().map(|(key, _)| key)
    }

    /// Reopens the container for bulk insertion.
    ///
    /// Existing keys are assigned their current rank as insertion index, so the remap
    /// returned by the next [KeyBytesBuilder::build] indexes into a value array that
    /// starts with the current values followed by those of newly added keys.
    pub fn into_builder(self) -> KeyBytesBuilder {
        let mut rank = 0;
        let table = self.table.map(|()| {
            rank += 1;
            rank - 1
        });
        KeyBytesBuilder {
            table,
            pending: self.total,
        }
    }
}

impl Write for KeyBytes {
    fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError> {
        sink.write_varint_u64(self.total as u64)?;
        self.offsets.write(sink)?;
        self.table.write(sink)?;
        debug!(entries = self.total, "wrote key index");
        Ok(())
    }
}

impl EncodeSize for KeyBytes {
    fn encode_size(&self) -> usize {
        varint::size(self.total as u64) + self.offsets.encode_size() + self.table.encode_size()
    }
}

impl Read for KeyBytes {
    type Cfg = Config;

    fn read_cfg(source: &mut impl Source, cfg: &Config) -> Result<Self, CodecError> {
        let total = read_len(source, cfg.max_entries)?;
        let offsets = Offsets::read(source, total)?;
        let table = Table::read(source, total)?;
        let lens = table.lens();
        if lens.iter().sum::<usize>() != total {
            warn!(total, "entry count mismatch");
            return Err(CodecError::Invalid("KeyBytes", "entry count mismatch"));
        }
        if offsets != Offsets::from_lens(&lens) {
            warn!(total, "count table mismatch");
            return Err(CodecError::Invalid("KeyBytes", "count table mismatch"));
        }
        debug!(entries = total, "read key index");
        Ok(Self {
            table,
            offsets,
            total,
            cursor: Cursor::default(),
        })
    }
}

/// Collects keys in any order and sorts them once.
///
/// Every key is tagged with its insertion index (starting at zero). [KeyBytesBuilder::build]
/// reports where each surviving key came from so a parallel value array can be
/// reordered to match.
#[derive(Clone, Debug, Default)]
pub struct KeyBytesBuilder {
    table: Table<usize>,
    pending: usize,
}

impl KeyBytesBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys added (duplicates included).
    pub fn len(&self) -> usize {
        self.pending
    }

    /// Returns true if no keys have been added.
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Adds `key` without sorting.
    pub fn add_unsorted(&mut self, key: &[u8]) -> Result<(), Error> {
        let key = Packed::storable(key)?;
        self.table.push(&key, self.pending);
        self.pending += 1;
        Ok(())
    }

    /// Sorts every key and removes duplicates (the first insertion is kept).
    ///
    /// Returns the container and a remap such that `remap[rank]` is the insertion index
    /// of the key at `rank`. Reordering a value array with
    /// `remap.iter().map(|i| values[*i])` aligns it with the container.
    pub fn build(self) -> (KeyBytes, Vec<usize>) {
        let mut table = self.table;
        table.sort();
        let duplicates = table.collapse(|_, _| {});

        let mut remap = Vec::with_capacity(self.pending - duplicates);
        let index = KeyBytes::from_table(table.map(|index| remap.push(index)));
        debug!(entries = index.len(), duplicates, "built key index");
        (index, remap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{MAX_LEN, SLOTS};
    use binsearch_codec::{
        buffer::{BufferedReader, BufferedWriter, DEFAULT_BUFFER},
        Decode, Encode,
    };
    use binsearch_macros::test_traced;
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
    use std::collections::HashSet;
    use test_case::test_case;

    const CFG: Config = Config {
        max_entries: 1 << 20,
    };

    /// Generates `n` distinct keys with lengths drawn from `lens`.
    fn random_keys(rng: &mut StdRng, n: usize, lens: &[usize]) -> Vec<Vec<u8>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::with_capacity(n);
        while keys.len() < n {
            let len = lens[rng.gen_range(0..lens.len())];
            // A small alphabet forces long shared prefixes.
            let key: Vec<u8> = (0..len).map(|_| rng.gen_range(0..4)).collect();
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        keys
    }

    /// Sorts keys into container order (length, then bytes).
    fn ordered(keys: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let mut keys = keys.to_vec();
        keys.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        keys
    }

    fn all_lens() -> Vec<usize> {
        (1..=MAX_LEN).collect()
    }

    #[test_traced]
    fn test_empty() {
        let mut index = KeyBytes::new();
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
        assert!(!index.reset());
        assert_eq!(index.next(), None);
        assert!(index.keys().is_empty());
        assert_eq!(index.find(b"a").unwrap(), Search::Absent(0));

        // Count, count table, and 64 empty buckets.
        let encoded = index.encode();
        assert_eq!(encoded.len(), 1 + 64 + 64);
        assert_eq!(KeyBytes::decode_cfg(&encoded, &CFG).unwrap(), index);
    }

    #[test_case(0; "empty")]
    #[test_case(1; "one")]
    #[test_case(2; "two")]
    #[test_case(100; "hundred")]
    #[test_case(10_000; "ten thousand")]
    fn test_add_then_iterate(n: usize) {
        let mut rng = StdRng::seed_from_u64(n as u64);
        let keys = random_keys(&mut rng, n, &all_lens());
        let mut index = KeyBytes::new();
        for key in &keys {
            assert!(!index.add(key).unwrap().is_found());
        }
        for key in &keys {
            assert!(index.add(key).unwrap().is_found());
        }
        assert_eq!(index.len(), n);
        assert!(index.table.is_sorted());

        // Cursor yields every key exactly once, in order.
        let expected = ordered(&keys);
        assert_eq!(index.reset(), n > 0);
        let mut seen = Vec::new();
        while let Some((key, last)) = index.next() {
            seen.push(key);
            if last {
                break;
            }
        }
        assert_eq!(seen, expected);
        assert_eq!(index.keys(), expected);

        // Ranks are positions in that order.
        for (rank, key) in expected.iter().enumerate() {
            assert_eq!(index.find(key).unwrap(), Search::Found(rank));
        }
    }

    #[test]
    fn test_find_missing() {
        let mut rng = StdRng::seed_from_u64(7);
        let keys = random_keys(&mut rng, 500, &[3, 10, 40, 64]);
        let (present, missing) = keys.split_at(250);
        let mut index = KeyBytes::new();
        for key in present {
            index.add(key).unwrap();
        }
        for key in missing {
            let Search::Absent(rank) = index.find(key).unwrap() else {
                panic!("unexpected key");
            };

            // The reported rank is where the key would land.
            let mut copy = index.clone();
            assert_eq!(copy.add(key).unwrap(), Search::Absent(rank));
            assert_eq!(copy.find(key).unwrap(), Search::Found(rank));
        }
    }

    #[test_traced]
    fn test_build_matches_sorted_adds() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut keys = random_keys(&mut rng, 2_000, &all_lens());

        let mut sorted = KeyBytes::new();
        for key in ordered(&keys) {
            sorted.add(&key).unwrap();
        }

        keys.shuffle(&mut rng);
        let mut builder = KeyBytesBuilder::new();
        for key in &keys {
            builder.add_unsorted(key).unwrap();
        }
        assert_eq!(builder.len(), keys.len());
        let (built, remap) = builder.build();
        assert_eq!(built, sorted);
        assert_eq!(remap.len(), keys.len());
        for key in &keys {
            assert_eq!(built.find(key).unwrap(), sorted.find(key).unwrap());
        }
    }

    #[test]
    fn test_remap_reorders_values() {
        let keys: [&[u8]; 5] = [b"kiwi", b"fig", b"banana", b"date", b"apple"];
        let values = ["k", "f", "b", "d", "a"];
        let mut builder = KeyBytesBuilder::new();
        for key in keys {
            builder.add_unsorted(key).unwrap();
        }
        let (index, remap) = builder.build();
        let sorted: Vec<&str> = remap.iter().map(|i| values[*i]).collect();
        assert_eq!(sorted, vec!["f", "d", "k", "a", "b"]);
        for (rank, key) in index.keys().iter().enumerate() {
            assert_eq!(&key[..1], sorted[rank].as_bytes());
        }
    }

    #[test]
    fn test_build_keeps_first_duplicate() {
        let mut builder = KeyBytesBuilder::new();
        for key in [&b"b"[..], b"a", b"b", b"a", b"c"] {
            builder.add_unsorted(key).unwrap();
        }
        let (index, remap) = builder.build();
        assert_eq!(index.len(), 3);
        assert_eq!(remap, vec![1, 0, 4]);
    }

    #[test]
    fn test_add_at() {
        let mut index = KeyBytes::new();
        for key in [&b"aa"[..], b"cc", b"x", b"long key"] {
            index.add(key).unwrap();
        }

        let Search::Absent(rank) = index.find(b"bb").unwrap() else {
            panic!("unexpected key");
        };
        assert_eq!(rank, 2);
        index.add_at(b"bb", rank).unwrap();
        assert_eq!(index.find(b"bb").unwrap(), Search::Found(2));
        assert_eq!(index.find(b"cc").unwrap(), Search::Found(3));
        assert_eq!(index.find(b"long key").unwrap(), Search::Found(4));

        // Outside the slot for two-byte keys.
        assert!(matches!(index.add_at(b"dd", 0), Err(Error::InvalidRank(0))));
        assert!(matches!(index.add_at(b"dd", 5), Err(Error::InvalidRank(5))));
        // Inside the slot, but out of order.
        assert!(matches!(index.add_at(b"dd", 1), Err(Error::InvalidRank(1))));
        // Already present.
        assert!(matches!(index.add_at(b"bb", 2), Err(Error::InvalidRank(2))));
        assert!(matches!(index.add_at(b"bb", 3), Err(Error::InvalidRank(3))));
        assert_eq!(index.len(), 5);

        // Appending at the end of a slot is allowed.
        index.add_at(b"dd", 4).unwrap();
        assert_eq!(
            index.keys(),
            vec![
                b"x".to_vec(),
                b"aa".to_vec(),
                b"bb".to_vec(),
                b"cc".to_vec(),
                b"dd".to_vec(),
                b"long key".to_vec()
            ]
        );
    }

    #[test]
    fn test_key_length_boundary() {
        let mut index = KeyBytes::new();
        let longest = [0xFFu8; MAX_LEN];
        assert_eq!(index.add(&longest).unwrap(), Search::Absent(0));
        assert_eq!(index.find(&longest).unwrap(), Search::Found(0));

        let too_long = [0u8; MAX_LEN + 1];
        assert!(matches!(index.find(&too_long), Err(Error::KeyTooLong(65))));
        assert!(matches!(index.add(&too_long), Err(Error::KeyTooLong(65))));
        assert!(matches!(index.add_at(&too_long, 0), Err(Error::KeyTooLong(65))));
        let mut builder = KeyBytesBuilder::new();
        assert!(matches!(
            builder.add_unsorted(&too_long),
            Err(Error::KeyTooLong(65))
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut index = KeyBytes::new();
        index.add(b"\0").unwrap();
        assert!(matches!(index.find(b""), Err(Error::EmptyKey)));
        assert!(matches!(index.add(b""), Err(Error::EmptyKey)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.keys(), vec![vec![0u8]]);
    }

    #[test]
    fn test_next_wraps_around() {
        let mut index = KeyBytes::new();
        for key in [&b"b"[..], b"a", b"abcdefghijk"] {
            index.add(key).unwrap();
        }
        assert!(index.reset());
        let steps: Vec<_> = (0..4).map(|_| index.next().unwrap()).collect();
        assert_eq!(
            steps,
            vec![
                (b"a".to_vec(), false),
                (b"b".to_vec(), false),
                (b"abcdefghijk".to_vec(), true),
                (b"a".to_vec(), false),
            ]
        );
    }

    #[test_case(0; "empty")]
    #[test_case(1; "one")]
    #[test_case(1_500; "many")]
    fn test_write_read(n: usize) {
        let mut rng = StdRng::seed_from_u64(n as u64);
        let keys = random_keys(&mut rng, n, &[3, 10, 40, 64]);
        let mut index = KeyBytes::new();
        for key in &keys {
            index.add(key).unwrap();
        }
        let encoded = index.encode();
        assert_eq!(encoded.len(), index.encode_size());
        let decoded = KeyBytes::decode_cfg(&encoded, &CFG).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(decoded.keys(), ordered(&keys));
        for key in &keys {
            assert_eq!(decoded.find(key).unwrap(), index.find(key).unwrap());
        }
    }

    #[test]
    fn test_write_read_buffered() -> Result<(), Error> {
        let mut rng = StdRng::seed_from_u64(3);
        let keys = random_keys(&mut rng, 5_000, &all_lens());
        let mut builder = KeyBytesBuilder::new();
        for key in &keys {
            builder.add_unsorted(key)?;
        }
        let (index, _) = builder.build();

        let mut writer = BufferedWriter::new(Vec::new(), DEFAULT_BUFFER);
        index.write(&mut writer)?;
        let encoded = writer.close()?;
        assert_eq!(encoded.len(), index.encode_size());

        let mut reader = BufferedReader::new(&encoded[..], DEFAULT_BUFFER);
        let decoded = KeyBytes::read_cfg(&mut reader, &CFG)?;
        assert_eq!(decoded, index);
        Ok(())
    }

    #[test]
    fn test_read_from_shared_bytes() {
        let mut index = KeyBytes::new();
        for key in [&b"x"[..], b"longer than a word", b"yz"] {
            index.add(key).unwrap();
        }
        let mut encoded = index.encode().to_vec();
        encoded.extend_from_slice(b"trailer");

        // Reading from a stream leaves whatever follows the index in place.
        let mut source = bytes::Bytes::from(encoded);
        let decoded = KeyBytes::read_cfg(&mut source, &CFG).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(&source[..], b"trailer");
    }

    #[test]
    fn test_read_rejects_invalid() {
        let mut index = KeyBytes::new();
        for key in [&b"a"[..], b"b", b"ccc"] {
            index.add(key).unwrap();
        }
        let encoded = index.encode();

        // Too many entries for the configuration.
        assert!(matches!(
            KeyBytes::decode_cfg(&encoded, &Config { max_entries: 2 }),
            Err(CodecError::InvalidLength(3))
        ));

        // Truncated.
        assert!(matches!(
            KeyBytes::decode_cfg(&encoded[..encoded.len() - 1], &CFG),
            Err(CodecError::EndOfBuffer)
        ));

        // Trailing bytes.
        let mut extended = encoded.to_vec();
        extended.push(0);
        assert!(matches!(
            KeyBytes::decode_cfg(&extended, &CFG),
            Err(CodecError::ExtraData(1))
        ));

        // Count table disagrees with the buckets. The offset of slot 1 follows the
        // total and the offset of slot 0.
        let mut tampered = encoded.to_vec();
        assert_eq!(&tampered[3..5], &[0x01, 0x02]);
        tampered[4] = 0x01;
        assert!(matches!(
            KeyBytes::decode_cfg(&tampered, &CFG),
            Err(CodecError::Invalid("KeyBytes", _))
        ));

        // Total disagrees with the buckets.
        let mut tampered = encoded.to_vec();
        assert_eq!(&tampered[..2], &[0x01, 0x03]);
        tampered[1] = 0x04;
        assert!(matches!(
            KeyBytes::decode_cfg(&tampered, &CFG),
            Err(CodecError::Invalid("KeyBytes", _))
        ));
    }

    #[test_traced]
    fn test_into_builder() {
        let mut index = KeyBytes::new();
        let mut values = Vec::new();
        for key in [&b"m"[..], b"c", b"x"] {
            let rank = index.add(key).unwrap().rank();
            values.insert(rank, key[0]);
        }
        assert_eq!(values, b"cmx");

        let mut builder = index.into_builder();
        for key in [&b"a"[..], b"m", b"z"] {
            builder.add_unsorted(key).unwrap();
            values.push(key[0]);
        }
        let (index, remap) = builder.build();
        let reordered: Vec<u8> = remap.iter().map(|i| values[*i]).collect();
        assert_eq!(reordered, b"acmxz");
        assert_eq!(index.len(), 5);
        assert_eq!(remap, vec![3, 0, 1, 2, 5]);
    }

    #[test]
    fn test_optimize_preserves_contents() {
        let mut rng = StdRng::seed_from_u64(11);
        let keys = random_keys(&mut rng, 300, &all_lens());
        let mut index = KeyBytes::new();
        for key in &keys {
            index.add(key).unwrap();
        }
        let before = index.clone();
        index.optimize();
        assert_eq!(index, before);
        index.add(b"after").unwrap();
        assert_eq!(index.len(), 301);
    }

    #[test]
    fn test_known_encoding() {
        let mut index = KeyBytes::new();
        index.add(b"bc").unwrap();
        index.add(b"a").unwrap();

        let mut expected: Vec<u8> = vec![0x01, 0x02];
        // Offsets: nothing precedes slot 0, "a" precedes slot 1, both precede the rest.
        expected.push(0x00);
        expected.extend_from_slice(&[0x01, 0x01]);
        for _ in 2..SLOTS {
            expected.extend_from_slice(&[0x01, 0x02]);
        }
        // Buckets: one-byte keys, then two-byte keys, then 62 empty slots.
        expected.extend_from_slice(&[0x01, 0x01, 0x61, 0, 0, 0, 0, 0, 0, 0]);
        expected.extend_from_slice(&[0x01, 0x01, 0x63, 0x62, 0, 0, 0, 0, 0, 0]);
        expected.extend(std::iter::repeat(0x00).take(SLOTS - 2));

        let encoded = index.encode();
        assert_eq!(encoded.as_ref(), &expected[..]);
        assert_eq!(KeyBytes::decode_cfg(&encoded, &CFG).unwrap(), index);
    }
}

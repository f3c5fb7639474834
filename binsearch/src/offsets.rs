//! Cumulative entry counts that turn a slot position into a global rank.

use crate::key::SLOTS;
use binsearch_codec::{read_len, varint, Error as CodecError, Sink, Source};
use std::ops::Range;

/// For every slot, the number of entries stored in all earlier slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Offsets([usize; SLOTS]);

impl Default for Offsets {
    fn default() -> Self {
        Self([0; SLOTS])
    }
}

impl Offsets {
    /// Computes offsets from per-slot lengths.
    pub fn from_lens(lens: &[usize; SLOTS]) -> Self {
        let mut offsets = [0; SLOTS];
        let mut running = 0;
        for (offset, len) in offsets.iter_mut().zip(lens) {
            *offset = running;
            running += len;
        }
        Self(offsets)
    }

    /// Returns the rank of position `pos` in `slot`.
    pub fn rank(&self, slot: usize, pos: usize) -> usize {
        self.0[slot] + pos
    }

    /// Returns the ranks occupied by `slot` in a container of `total` entries.
    pub fn range(&self, slot: usize, total: usize) -> Range<usize> {
        let end = self.0.get(slot + 1).copied().unwrap_or(total);
        self.0[slot]..end
    }

    /// Records an insertion into `slot`.
    pub fn bump_after(&mut self, slot: usize) {
        for offset in &mut self.0[slot + 1..] {
            *offset += 1;
        }
    }

    pub fn write(&self, sink: &mut impl Sink) -> Result<(), CodecError> {
        for offset in &self.0 {
            sink.write_varint_u64(*offset as u64)?;
        }
        Ok(())
    }

    pub fn encode_size(&self) -> usize {
        self.0.iter().map(|offset| varint::size(*offset as u64)).sum()
    }

    /// Reads offsets, each of which must not exceed `max`.
    pub fn read(source: &mut impl Source, max: usize) -> Result<Self, CodecError> {
        let mut offsets = [0; SLOTS];
        for offset in offsets.iter_mut() {
            *offset = read_len(source, max)?;
        }
        Ok(Self(offsets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lens_matches_bumps() {
        let mut lens = [0; SLOTS];
        let mut bumped = Offsets::default();
        for slot in [5, 0, 63, 5, 17, 0, 5] {
            lens[slot] += 1;
            bumped.bump_after(slot);
        }
        let offsets = Offsets::from_lens(&lens);
        assert_eq!(offsets, bumped);
        assert_eq!(offsets.range(0, 7), 0..2);
        assert_eq!(offsets.range(5, 7), 2..5);
        assert_eq!(offsets.range(17, 7), 5..6);
        assert_eq!(offsets.range(63, 7), 6..7);
        assert_eq!(offsets.rank(5, 1), 3);
    }

    #[test]
    fn test_write_read() {
        let mut lens = [0; SLOTS];
        lens[3] = 300;
        lens[40] = 2;
        let offsets = Offsets::from_lens(&lens);
        let mut buf = Vec::new();
        offsets.write(&mut buf).unwrap();
        assert_eq!(buf.len(), offsets.encode_size());
        assert_eq!(Offsets::read(&mut &buf[..], 302).unwrap(), offsets);
        assert!(matches!(
            Offsets::read(&mut &buf[..], 299),
            Err(CodecError::InvalidLength(300))
        ));
    }
}

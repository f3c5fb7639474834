//! Resumable forward traversal over the slots of a container.

use crate::key::SLOTS;

/// The position of the next entry to yield.
///
/// The cursor does not borrow the container. Each step is given the current slot
/// lengths, so a cursor left behind by later inserts still lands on a valid entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cursor {
    slot: usize,
    pos: usize,
}

impl Cursor {
    /// Rewinds to the first entry. Returns false if there are no entries.
    pub fn reset(&mut self, len: impl Fn(usize) -> usize) -> bool {
        self.slot = 0;
        self.pos = 0;
        self.seek(&len)
    }

    /// Returns the slot and position of the next entry and whether it is the last one.
    ///
    /// After the last entry the cursor rewinds on its own. Returns `None` only when
    /// there are no entries.
    pub fn advance(&mut self, len: impl Fn(usize) -> usize) -> Option<(usize, usize, bool)> {
        if !self.seek(&len) && !self.reset(&len) {
            return None;
        }
        let (slot, pos) = (self.slot, self.pos);
        self.pos += 1;
        let last = !self.seek(&len);
        if last {
            self.slot = 0;
            self.pos = 0;
        }
        Some((slot, pos, last))
    }

    /// Moves forward to the next occupied position. Returns false if there is none.
    fn seek(&mut self, len: &impl Fn(usize) -> usize) -> bool {
        while self.slot < SLOTS {
            if self.pos < len(self.slot) {
                return true;
            }
            self.slot += 1;
            self.pos = 0;
        }
        false
    }
}

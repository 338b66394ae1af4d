//! Slot table: addressing, Robin Hood placement and backward-shift removal.
//!
//! Each occupied slot records how far it sits from its home position
//! (`digest % capacity`). Insertion keeps that distance balanced by letting
//! a newcomer take the place of any resident that is closer to home than
//! the newcomer currently is; removal pulls the following run back by one
//! so no tombstones are needed.
//!
//! Invariants (for a table with at least one empty slot):
//! - `probe_length` equals the wrapped distance from home to the position.
//! - Along any run of occupied slots, probe length grows by at most one per
//!   step, so a lookup can stop at the first empty slot.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) probe_length: usize,
    pub(crate) digest: u64,
    pub(crate) backing_index: usize,
}

#[derive(Debug)]
pub(crate) struct SlotTable {
    slots: Vec<Option<Slot>>,
}

impl SlotTable {
    pub(crate) fn with_capacity(capacity: usize) -> crate::Result<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize(capacity, None);
        Ok(Self { slots })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn home(&self, digest: u64) -> usize {
        (digest % self.capacity() as u64) as usize
    }

    #[inline]
    fn next(&self, index: usize) -> usize {
        let n = index + 1;
        if n == self.capacity() {
            0
        } else {
            n
        }
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&Slot> {
        self.slots[index].as_ref()
    }

    pub(crate) fn as_slice(&self) -> &[Option<Slot>] {
        &self.slots
    }

    /// Occupied slots with their positions, in table order.
    pub(crate) fn occupied(&self) -> impl Iterator<Item = (usize, &Slot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    /// Where `digest` belongs, and the probe length it would have there.
    ///
    /// Walks from home while the resident is a different digest that is at
    /// least as far from its own home as we are. The returned position is
    /// empty, holds `digest` already, or holds a resident closer to home
    /// than us (to be displaced).
    pub(crate) fn locate(&self, digest: u64) -> (usize, usize) {
        let mut index = self.home(digest);
        let mut probe_length = 0;
        while let Some(resident) = &self.slots[index] {
            if resident.digest == digest || resident.probe_length < probe_length {
                break;
            }
            index = self.next(index);
            probe_length += 1;
        }
        (index, probe_length)
    }

    /// Carries `entry` forward from `index` until it, or whatever it
    /// displaced last, lands in an empty slot.
    ///
    /// Requires at least one empty slot.
    pub(crate) fn displace(&mut self, entry: Slot, mut index: usize) {
        let mut carried = entry;
        loop {
            match &mut self.slots[index] {
                empty @ None => {
                    *empty = Some(carried);
                    return;
                }
                Some(resident) => {
                    if resident.probe_length < carried.probe_length {
                        log::trace!(
                            "robin hood swap at {index}: psl {} takes over from psl {}",
                            carried.probe_length,
                            resident.probe_length
                        );
                        core::mem::swap(resident, &mut carried);
                    }
                    carried.probe_length += 1;
                    index = self.next(index);
                }
            }
        }
    }

    /// Position of the slot holding `digest`, scanning linearly from home
    /// up to the first empty slot.
    pub(crate) fn find(&self, digest: u64) -> Option<usize> {
        let mut index = self.home(digest);
        for _ in 0..self.capacity() {
            match &self.slots[index] {
                None => return None,
                Some(s) if s.digest == digest => return Some(index),
                Some(_) => index = self.next(index),
            }
        }
        None
    }

    /// Empties `index` and shifts the following run back by one position.
    ///
    /// The shift stops at an empty slot or at an entry already at its home,
    /// leaving the last vacated position empty.
    pub(crate) fn remove_at(&mut self, index: usize) -> Option<Slot> {
        let removed = self.slots[index].take()?;
        let mut current = index;
        let mut shifted = 0usize;
        loop {
            let following = self.next(current);
            match self.slots[following] {
                Some(s) if s.probe_length > 0 => {
                    self.slots[current] = Some(Slot {
                        probe_length: s.probe_length - 1,
                        ..s
                    });
                    self.slots[following] = None;
                    current = following;
                    shifted += 1;
                }
                _ => break,
            }
        }
        log::trace!("removed slot {index}, shifted {shifted} entries back");
        Some(removed)
    }
}

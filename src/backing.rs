//! Backing store and free-slot stack.
//!
//! Values live in one contiguous byte buffer of `capacity` fixed-size
//! records, addressed by backing index. Slots in the probe table refer to
//! records by index only, so Robin Hood shuffling never moves value bytes.
//!
//! Ownership discipline: every backing index is held by exactly one of
//! {the `FreeStack`, one occupied slot}. `pop` and `push` are the only
//! transfers.

use crate::error::{Error, Result};

/// Dense array of fixed-size value records.
#[derive(Debug)]
pub(crate) struct BackingStore {
    bytes: Vec<u8>,
    record_size: usize,
    capacity: usize,
}

impl BackingStore {
    pub(crate) fn with_capacity(capacity: usize, record_size: usize) -> Result<Self> {
        let len = capacity
            .checked_mul(record_size)
            .ok_or(Error::CapacityOverflow)?;
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len)?;
        bytes.resize(len, 0);
        Ok(Self {
            bytes,
            record_size,
            capacity,
        })
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn range(&self, index: usize) -> core::ops::Range<usize> {
        debug_assert!(index < self.capacity, "backing index out of range");
        let start = index * self.record_size;
        start..start + self.record_size
    }

    #[inline]
    pub(crate) fn record(&self, index: usize) -> &[u8] {
        &self.bytes[self.range(index)]
    }

    #[inline]
    pub(crate) fn record_mut(&mut self, index: usize) -> &mut [u8] {
        let r = self.range(index);
        &mut self.bytes[r]
    }

    /// Overwrites the whole record, so nothing of a previous owner survives.
    #[inline]
    pub(crate) fn write(&mut self, index: usize, value: &[u8]) {
        self.record_mut(index).copy_from_slice(value);
    }
}

/// LIFO pool of unused backing indices.
#[derive(Debug)]
pub(crate) struct FreeStack {
    free: Vec<usize>,
}

impl FreeStack {
    /// Stack holding every index in `0..capacity`, with 0 on top.
    pub(crate) fn full(capacity: usize) -> Result<Self> {
        let mut free = Vec::new();
        free.try_reserve_exact(capacity)?;
        free.extend((0..capacity).rev());
        Ok(Self { free })
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<usize> {
        self.free.pop()
    }

    #[inline]
    pub(crate) fn push(&mut self, index: usize) {
        self.free.push(index);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.free.len()
    }

    #[cfg(test)]
    pub(crate) fn as_slice(&self) -> &[usize] {
        &self.free
    }
}

//! RobinHoodMap: fixed-size keys and records over a slot table plus a
//! separately indexed backing store.

use crate::backing::{BackingStore, FreeStack};
use crate::config::TableConfig;
use crate::digest::{digest_of, SipDigest};
use crate::error::{Error, Result};
use crate::slot::{Slot, SlotTable};
use core::fmt;
use core::hash::BuildHasher;

/// Result of a successful `put`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key was absent; a new entry now holds the value.
    Inserted,
    /// The key was present; its record was overwritten in place.
    Overwritten,
}

impl PutOutcome {
    pub fn is_overwrite(self) -> bool {
        self == Self::Overwritten
    }
}

/// Snapshot of one occupied slot, as yielded by `RobinHoodMap::slots`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotInfo {
    pub position: usize,
    pub probe_length: usize,
    pub digest: u64,
    pub backing_index: usize,
}

/// Slot table, backing store and free stack, always sized together.
#[derive(Debug)]
struct Storage {
    slots: SlotTable,
    backing: BackingStore,
    free: FreeStack,
}

impl Storage {
    fn with_capacity(capacity: usize, record_size: usize) -> Result<Self> {
        Ok(Self {
            slots: SlotTable::with_capacity(capacity)?,
            backing: BackingStore::with_capacity(capacity, record_size)?,
            free: FreeStack::full(capacity)?,
        })
    }

    fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Places `value` under `digest`. Caller guarantees an empty slot and a
    /// free backing index remain after this insert.
    fn insert_digest(&mut self, digest: u64, value: &[u8]) -> PutOutcome {
        let (index, probe_length) = self.slots.locate(digest);
        if let Some(resident) = self.slots.get(index) {
            if resident.digest == digest {
                self.backing.write(resident.backing_index, value);
                return PutOutcome::Overwritten;
            }
        }

        let backing_index = self
            .free
            .pop()
            .expect("free stack is never empty while a slot is empty");
        self.backing.write(backing_index, value);
        self.slots.displace(
            Slot {
                probe_length,
                digest,
                backing_index,
            },
            index,
        );
        PutOutcome::Inserted
    }

    fn backing_index_of(&self, digest: u64) -> Option<usize> {
        let pos = self.slots.find(digest)?;
        self.slots.get(pos).map(|s| s.backing_index)
    }
}

/// Open-addressing map from fixed-size byte keys to fixed-size byte records.
///
/// Keys are reduced to a 64-bit digest by `S` and only the digest is kept:
/// two keys with the same digest are the same logical key. Values are copied
/// into a dense backing store and never move while slots are reshuffled.
pub struct RobinHoodMap<S = SipDigest> {
    hasher: S,
    config: TableConfig,
    value_size: usize,
    key_size: usize,
    len: usize,
    storage: Storage,
}

impl RobinHoodMap {
    /// Table for `key_size`-byte keys and `value_size`-byte records, with the
    /// default config and the default SipHash secret.
    ///
    /// # Panics
    ///
    /// Panics if the initial backing store size overflows or cannot be
    /// allocated.
    pub fn new(value_size: usize, key_size: usize) -> Self {
        Self::with_hasher(value_size, key_size, SipDigest::default())
    }

    pub fn with_config(value_size: usize, key_size: usize, config: TableConfig) -> Result<Self> {
        Self::with_config_and_hasher(value_size, key_size, config, SipDigest::default())
    }
}

impl<S> RobinHoodMap<S>
where
    S: BuildHasher,
{
    /// # Panics
    ///
    /// Same as `new`.
    pub fn with_hasher(value_size: usize, key_size: usize, hasher: S) -> Self {
        match Self::with_config_and_hasher(value_size, key_size, TableConfig::default(), hasher) {
            Ok(map) => map,
            Err(e) => panic!("cannot build table: {e}"),
        }
    }

    pub fn with_config_and_hasher(
        value_size: usize,
        key_size: usize,
        config: TableConfig,
        hasher: S,
    ) -> Result<Self> {
        config.validate()?;
        let storage = Storage::with_capacity(config.initial_capacity, value_size)?;
        Ok(Self {
            hasher,
            config,
            value_size,
            key_size,
            len: 0,
            storage,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots (equal to the number of backing records).
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub fn value_size(&self) -> usize {
        self.value_size
    }

    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() != self.key_size {
            return Err(Error::KeySize {
                expected: self.key_size,
                actual: key.len(),
            });
        }
        Ok(())
    }

    fn check_value(&self, value: &[u8]) -> Result<()> {
        if value.len() != self.value_size {
            return Err(Error::ValueSize {
                expected: self.value_size,
                actual: value.len(),
            });
        }
        Ok(())
    }

    fn digest(&self, key: &[u8]) -> u64 {
        digest_of(&self.hasher, key)
    }

    /// Stores a copy of `value` under `key`.
    ///
    /// If the table is at its load threshold it grows first, so the new
    /// entry is always addressed against the grown capacity.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<PutOutcome> {
        self.check_key(key)?;
        self.check_value(value)?;

        if self.config.needs_growth(self.len, self.capacity()) {
            self.grow()?;
        }

        let digest = self.digest(key);
        let outcome = self.storage.insert_digest(digest, value);
        if outcome == PutOutcome::Inserted {
            self.len += 1;
        }
        Ok(outcome)
    }

    /// Rebuilds every structure at the next capacity and replays all live
    /// entries into it. The new storage is complete before it replaces the
    /// old one, so an error leaves the table untouched.
    fn grow(&mut self) -> Result<()> {
        let old_capacity = self.capacity();
        let new_capacity = self.config.grown_capacity(old_capacity)?;
        let mut grown = Storage::with_capacity(new_capacity, self.value_size)?;

        let mut replayed = 0usize;
        for (_, slot) in self.storage.slots.occupied() {
            let value = self.storage.backing.record(slot.backing_index);
            let outcome = grown.insert_digest(slot.digest, value);
            debug_assert_eq!(outcome, PutOutcome::Inserted);
            replayed += 1;
        }
        debug_assert_eq!(replayed, self.len);

        log::debug!("grew table from {old_capacity} to {new_capacity} slots ({replayed} entries replayed)");
        self.storage = grown;
        Ok(())
    }

    /// Borrowed view of the record stored under `key`.
    ///
    /// The view is tied to `&self`; any later `put` may grow the table and
    /// move every record to a new store.
    pub fn get(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        self.check_key(key)?;
        let digest = self.digest(key);
        Ok(self
            .storage
            .backing_index_of(digest)
            .map(|i| self.storage.backing.record(i)))
    }

    /// Mutable view of the record stored under `key`, for in-place updates.
    pub fn get_mut(&mut self, key: &[u8]) -> Result<Option<&mut [u8]>> {
        self.check_key(key)?;
        let digest = self.digest(key);
        Ok(match self.storage.backing_index_of(digest) {
            Some(i) => Some(self.storage.backing.record_mut(i)),
            None => None,
        })
    }

    pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
        self.check_key(key)?;
        Ok(self.storage.slots.find(self.digest(key)).is_some())
    }

    /// Removes the entry for `key`. Returns whether an entry was removed.
    ///
    /// The record bytes are not wiped; its backing index goes back on the
    /// free stack and is fully overwritten by the next insert that takes it.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        self.check_key(key)?;
        let digest = self.digest(key);
        let Some(pos) = self.storage.slots.find(digest) else {
            return Ok(false);
        };
        let Some(removed) = self.storage.slots.remove_at(pos) else {
            return Ok(false);
        };
        self.storage.free.push(removed.backing_index);
        self.len -= 1;
        Ok(true)
    }

    /// Releases the table and all of its storage. Equivalent to dropping it.
    pub fn free(self) {
        drop(self)
    }

    /// Live entries as `(digest, record)` in slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: self.storage.slots.as_slice().iter(),
            backing: &self.storage.backing,
        }
    }

    /// Every occupied slot, in table order.
    pub fn slots(&self) -> impl Iterator<Item = SlotInfo> + '_ {
        self.storage.slots.occupied().map(|(position, s)| SlotInfo {
            position,
            probe_length: s.probe_length,
            digest: s.digest,
            backing_index: s.backing_index,
        })
    }

    /// Longest distance any entry sits from its home slot.
    pub fn max_probe_length(&self) -> usize {
        self.storage
            .slots
            .occupied()
            .map(|(_, s)| s.probe_length)
            .max()
            .unwrap_or(0)
    }

    /// Panics if any structural invariant is violated.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let capacity = self.capacity();
        let slots = self.storage.slots.as_slice();
        assert_eq!(self.storage.backing.capacity(), capacity);

        let occupied = slots.iter().filter(|s| s.is_some()).count();
        assert_eq!(occupied, self.len, "len drifted from occupied slots");
        assert!(occupied < capacity, "no empty slot left");
        assert_eq!(self.storage.free.len() + self.len, capacity);

        // Backing indices: slots and free stack are disjoint and cover 0..capacity.
        let mut owner = vec![false; capacity];
        for &i in self.storage.free.as_slice() {
            assert!(!owner[i], "backing index {i} held twice");
            owner[i] = true;
        }
        let mut digests = std::collections::HashSet::new();
        for (pos, s) in self.storage.slots.occupied() {
            assert!(!owner[s.backing_index], "backing index {} held twice", s.backing_index);
            owner[s.backing_index] = true;
            assert!(digests.insert(s.digest), "digest stored twice");

            let home = self.storage.slots.home(s.digest);
            let distance = (pos + capacity - home) % capacity;
            assert_eq!(s.probe_length, distance, "probe length at {pos}");

            let following = (pos + 1) % capacity;
            if let Some(f) = &slots[following] {
                assert!(f.probe_length <= s.probe_length + 1, "gap in run at {pos}");
            }
        }
        assert!(owner.iter().all(|&o| o));
    }
}

/// Iterator over `(digest, record)` pairs.
pub struct Iter<'a> {
    slots: core::slice::Iter<'a, Option<Slot>>,
    backing: &'a BackingStore,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (u64, &'a [u8]);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let backing = self.backing;
        self.slots
            .by_ref()
            .flatten()
            .next()
            .map(|s| (s.digest, backing.record(s.backing_index)))
    }
}

impl<S: BuildHasher> fmt::Debug for RobinHoodMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobinHoodMap")
            .field("value_size", &self.value_size)
            .field("key_size", &self.key_size)
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("slots", &self.slots().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::first_byte::FirstByte;

    fn first_byte_map(key_size: usize) -> RobinHoodMap<FirstByte> {
        RobinHoodMap::with_hasher(1, key_size, FirstByte)
    }

    /// Invariant: a new table is empty with the default capacity of 20.
    #[test]
    fn new_is_empty() {
        let m = RobinHoodMap::new(8, 4);
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());
        assert_eq!(m.capacity(), 20);
        assert_eq!(m.value_size(), 8);
        assert_eq!(m.key_size(), 4);
        m.check_invariants();
    }

    /// Invariant: first put inserts, second put of the same key overwrites and
    /// leaves `len` unchanged.
    #[test]
    fn put_then_overwrite() {
        let mut m = RobinHoodMap::new(1, 1);
        assert_eq!(m.put(b"B", b"A").unwrap(), PutOutcome::Inserted);
        assert_eq!(m.put(b"B", b"Z").unwrap(), PutOutcome::Overwritten);
        assert!(PutOutcome::Overwritten.is_overwrite());
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(b"B").unwrap(), Some(&b"Z"[..]));
        m.check_invariants();
    }

    /// Invariant: wrong key or value lengths are rejected before any state changes.
    #[test]
    fn size_mismatch_is_rejected() {
        let mut m = RobinHoodMap::new(2, 3);
        assert_eq!(
            m.put(b"ab", b"xy"),
            Err(Error::KeySize {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            m.put(b"abc", b"xyz"),
            Err(Error::ValueSize {
                expected: 2,
                actual: 3
            })
        );
        assert!(m.get(b"abcd").is_err());
        assert!(m.delete(b"").is_err());
        assert!(m.contains_key(b"a").is_err());
        assert!(m.is_empty());
        m.check_invariants();
    }

    /// Invariant: two keys sharing a home are both reachable, and deleting the
    /// one that is not at home leaves the home resident alone.
    #[test]
    fn delete_walks_to_matching_slot() {
        let mut m = first_byte_map(2);
        m.put(&[0, 1], b"a").unwrap();
        m.put(&[20, 1], b"b").unwrap(); // 20 % 20 == 0, same home
        assert_eq!(m.get(&[20, 9]).unwrap(), Some(&b"b"[..]));

        assert!(m.delete(&[20, 1]).unwrap());
        assert_eq!(m.get(&[0, 1]).unwrap(), Some(&b"a"[..]));
        assert_eq!(m.get(&[20, 1]).unwrap(), None);
        m.check_invariants();
    }

    /// Invariant: deleting an absent key whose home is occupied by another key
    /// changes nothing.
    #[test]
    fn delete_absent_with_occupied_home_is_noop() {
        let mut m = first_byte_map(1);
        m.put(&[3], b"x").unwrap();
        assert!(!m.delete(&[23]).unwrap());
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(&[3]).unwrap(), Some(&b"x"[..]));
        m.check_invariants();
    }

    /// Invariant: keys with equal digests are one logical key; the second write
    /// overwrites the first.
    #[test]
    fn digest_collision_overwrites() {
        let mut m = first_byte_map(2);
        assert_eq!(m.put(&[5, 0], b"a").unwrap(), PutOutcome::Inserted);
        assert_eq!(m.put(&[5, 1], b"b").unwrap(), PutOutcome::Overwritten);
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(&[5, 0]).unwrap(), Some(&b"b"[..]));
    }

    /// Invariant: crossing the load threshold grows the table and keeps every
    /// entry, including clustered ones.
    #[test]
    fn growth_preserves_clustered_entries() {
        let mut m = first_byte_map(1);
        for k in 0u8..60 {
            // Homes collide heavily at capacity 20.
            m.put(&[k], &[k.wrapping_mul(3)]).unwrap();
            m.check_invariants();
        }
        assert!(m.capacity() >= 80);
        for k in 0u8..60 {
            assert_eq!(m.get(&[k]).unwrap(), Some(&[k.wrapping_mul(3)][..]));
        }
    }

    /// Invariant: growth happens exactly when `len >= 0.9 * capacity` before a put.
    #[test]
    fn growth_trigger_point() {
        let mut m = RobinHoodMap::new(1, 1);
        for k in 0u8..18 {
            m.put(&[k], &[k]).unwrap();
        }
        assert_eq!(m.capacity(), 20);
        m.put(&[18], &[18]).unwrap();
        assert_eq!(m.capacity(), 40);
        assert_eq!(m.len(), 19);
        m.check_invariants();
    }

    /// Invariant: a freed backing index is reused by the next insert and holds
    /// only the new value.
    #[test]
    fn freed_backing_index_is_reused() {
        let mut m = RobinHoodMap::new(4, 1);
        m.put(b"a", b"AAAA").unwrap();
        m.put(b"b", b"BBBB").unwrap();
        let before: Vec<_> = m.slots().map(|s| s.backing_index).collect();
        assert!(m.delete(b"a").unwrap());
        m.put(b"c", b"cccc").unwrap();
        let mut after: Vec<_> = m.slots().map(|s| s.backing_index).collect();
        after.sort_unstable();
        let mut before_sorted = before;
        before_sorted.sort_unstable();
        assert_eq!(after, before_sorted);
        assert_eq!(m.get(b"c").unwrap(), Some(&b"cccc"[..]));
        assert_eq!(m.get(b"b").unwrap(), Some(&b"BBBB"[..]));
        m.check_invariants();
    }

    /// Invariant: a growth that cannot be sized fails the `put` and leaves the
    /// table exactly as it was.
    #[test]
    fn failed_growth_leaves_table_unchanged() {
        let cfg = TableConfig::default()
            .initial_capacity(2)
            .growth_factor(1e300);
        let mut m = RobinHoodMap::with_config(1, 1, cfg).unwrap();
        assert_eq!(m.put(b"a", b"1").unwrap(), PutOutcome::Inserted);

        assert_eq!(m.put(b"b", b"2"), Err(Error::CapacityOverflow));
        assert_eq!(m.len(), 1);
        assert_eq!(m.capacity(), 2);
        assert_eq!(m.get(b"a").unwrap(), Some(&b"1"[..]));
        assert_eq!(m.get(b"b").unwrap(), None);
        m.check_invariants();
    }

    /// Invariant: the table digests keys with the hasher it was given.
    #[test]
    fn uses_supplied_hasher() {
        let secret = [3u8; 16];
        let mut m = RobinHoodMap::with_hasher(1, 2, SipDigest::with_secret(secret));
        assert_eq!(m.hasher().secret(), &secret);
        m.put(b"ab", b"x").unwrap();
        let expected = digest_of(m.hasher(), b"ab");
        assert_eq!(m.slots().next().map(|s| s.digest), Some(expected));
        assert_eq!(m.iter().next().map(|(d, _)| d), Some(expected));
    }

    /// Invariant: `get_mut` edits the stored record in place.
    #[test]
    fn get_mut_updates_in_place() {
        let mut m = RobinHoodMap::new(2, 1);
        m.put(b"k", &[1, 2]).unwrap();
        m.get_mut(b"k").unwrap().unwrap()[1] = 9;
        assert_eq!(m.get(b"k").unwrap(), Some(&[1, 9][..]));
        assert!(m.get_mut(b"z").unwrap().is_none());
    }

    /// Invariant: `iter` and `slots` report every live entry exactly once.
    #[test]
    fn iter_and_slots_cover_live_entries() {
        let mut m = RobinHoodMap::new(1, 1);
        for k in b'A'..b'L' {
            m.put(&[k], &[k + 25]).unwrap();
        }
        m.delete(b"F").unwrap();
        assert_eq!(m.iter().count(), 10);
        assert_eq!(m.slots().count(), 10);
        let mut values: Vec<u8> = m.iter().map(|(_, v)| v[0]).collect();
        values.sort_unstable();
        let expected: Vec<u8> = (b'A'..b'L').filter(|&k| k != b'F').map(|k| k + 25).collect();
        assert_eq!(values, expected);
        assert!(format!("{m:?}").contains("RobinHoodMap"));
    }

    /// Invariant: bad configs are refused at construction.
    #[test]
    fn invalid_config_rejected() {
        let cfg = TableConfig::default().max_load_factor(1.5);
        assert!(matches!(
            RobinHoodMap::with_config(1, 1, cfg),
            Err(Error::InvalidConfig(_))
        ));
    }

    /// Invariant: a one-slot table still works; growth keeps an empty slot.
    #[test]
    fn tiny_initial_capacity() {
        let cfg = TableConfig::default().initial_capacity(1);
        let mut m = RobinHoodMap::with_config(1, 1, cfg).unwrap();
        assert_eq!(m.get(b"x").unwrap(), None);
        m.put(b"x", b"1").unwrap();
        m.put(b"y", b"2").unwrap();
        m.check_invariants();
        assert_eq!(m.get(b"x").unwrap(), Some(&b"1"[..]));
        assert_eq!(m.get(b"y").unwrap(), Some(&b"2"[..]));
        m.free();
    }
}

//! rh-hashmap: a single-threaded, open-addressing map from fixed-size byte
//! keys to fixed-size byte records, using Robin Hood displacement.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep slot shuffling and value storage apart so that Robin Hood
//!   displacement never copies value bytes, and so each piece can be
//!   reasoned about on its own.
//! - Layers:
//!   - `digest`: reduces a key to a `u64` digest with a keyed
//!     `BuildHasher` (SipHash-2-4 with a fixed 16-byte secret by default).
//!   - `SlotTable`: `(probe_length, digest, backing_index)` slots; owns
//!     addressing, Robin Hood placement and backward-shift removal.
//!   - `BackingStore` + `FreeStack`: a dense arena of fixed-size records and
//!     the LIFO of unused record indices.
//!   - `RobinHoodMap<S>`: public API; owns the three structures above plus
//!     sizing metadata and drives put/get/delete/grow.
//!
//! Constraints
//! - Single-threaded and synchronous; mutation requires `&mut self`, so
//!   callers sharing a table must serialize access themselves.
//! - Key and record sizes are fixed at construction; every operation checks
//!   the lengths it is given and returns an error on mismatch.
//! - Slots refer to records by index only. A backing index is owned by
//!   exactly one of {free stack, one occupied slot} at all times.
//!
//! Identity
//! - Only the digest is stored, never the key. Two keys with the same digest
//!   are the same logical key: the second `put` overwrites the first.
//!
//! Growth
//! - Before every insert the table grows if `len >= capacity *
//!   max_load_factor` (0.9 by default), or if the insert would use the last
//!   empty slot. Growth builds a complete new slot table, backing store and
//!   free stack, replays every live entry by digest, then swaps them in.
//!   A failed growth returns an error and leaves the table unchanged.
//!
//! Deletion
//! - `delete` probes to the slot holding the key's digest (never just its
//!   home slot), returns the backing index to the free stack and shifts the
//!   following run back by one. No tombstones are left.
//!
//! Notes and non-goals
//! - No variable-length values; store a handle to external storage instead.
//! - Iteration order is slot order and carries no guarantee.
//! - No persistence.

mod backing;
pub mod config;
pub mod digest;
mod error;
mod robin_hood_map;
mod robin_hood_map_proptest;
mod slot;

// Public surface
pub use config::TableConfig;
pub use digest::SipDigest;
pub use error::{Error, Result};
pub use robin_hood_map::{Iter, PutOutcome, RobinHoodMap, SlotInfo};

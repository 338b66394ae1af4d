//! Sizing tunables: initial capacity, growth factor and max load factor.

use crate::error::{Error, Result};

/// Default number of slots in a freshly constructed table.
pub const DEFAULT_INITIAL_CAPACITY: usize = 20;

/// Default multiplier applied to the capacity on growth.
pub const DEFAULT_GROWTH_FACTOR: f64 = 2.0;

/// Default occupancy ratio at which the next insert grows the table first.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.9;

/// Table sizing policy.
///
/// The policy is fixed for the lifetime of a table.
#[derive(Clone, Debug, PartialEq)]
pub struct TableConfig {
    pub(crate) initial_capacity: usize,
    pub(crate) growth_factor: f64,
    pub(crate) max_load_factor: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    /// Sets the number of slots allocated at construction.
    ///
    /// Defaults to 20.
    #[must_use]
    pub fn initial_capacity(mut self, slots: usize) -> Self {
        self.initial_capacity = slots;
        self
    }

    /// Sets the capacity multiplier used when the table grows.
    ///
    /// Must be greater than 1.0. Defaults to 2.0.
    #[must_use]
    pub fn growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Sets the occupancy ratio that triggers growth before an insert.
    ///
    /// Must lie strictly between 0.0 and 1.0. Defaults to 0.9.
    #[must_use]
    pub fn max_load_factor(mut self, ratio: f64) -> Self {
        self.max_load_factor = ratio;
        self
    }

    pub fn get_initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    pub fn get_growth_factor(&self) -> f64 {
        self.growth_factor
    }

    pub fn get_max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Checks that every tunable is in range.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(Error::InvalidConfig("initial capacity must be non-zero"));
        }
        if !self.growth_factor.is_finite() || self.growth_factor <= 1.0 {
            return Err(Error::InvalidConfig("growth factor must be finite and > 1.0"));
        }
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(Error::InvalidConfig("max load factor must be in (0.0, 1.0)"));
        }
        Ok(())
    }

    /// Whether a table holding `len` entries in `capacity` slots must grow
    /// before accepting another insert.
    ///
    /// Besides the load factor, growth is forced when the insert would fill
    /// the last empty slot: probing relies on an empty slot to terminate.
    pub(crate) fn needs_growth(&self, len: usize, capacity: usize) -> bool {
        len as f64 >= capacity as f64 * self.max_load_factor || len + 1 >= capacity
    }

    /// Capacity after one growth step from `capacity`.
    pub(crate) fn grown_capacity(&self, capacity: usize) -> Result<usize> {
        let scaled = (capacity as f64 * self.growth_factor).ceil();
        if !scaled.is_finite() || scaled >= usize::MAX as f64 {
            return Err(Error::CapacityOverflow);
        }
        let next = capacity.checked_add(1).ok_or(Error::CapacityOverflow)?;
        Ok((scaled as usize).max(next))
    }
}

//! Fragment sizing.

use crate::compact::Tagged;
use crate::error::PoolError;

/// Alignment and minimum size of every fragment, in bytes.
///
/// Eight bytes holds one free-list word, and 8-byte alignment keeps every
/// fragment address 4-byte aligned as the compactor requires.
pub const FRAGMENT_ALIGN: usize = 8;

/// Geometry of a pool: how big each fragment is and how many there are.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolLayout {
    value_bytes: usize,
    fragment_bytes: usize,
    capacity: usize,
}

impl PoolLayout {
    /// Compute the layout for `capacity` values of `value_bytes` each.
    ///
    /// The fragment size is `max(value_bytes, 8)` rounded up to a multiple
    /// of 8.
    pub fn new(value_bytes: usize, capacity: usize) -> Result<Self, PoolError> {
        if value_bytes == 0 {
            return Err(PoolError::ZeroValueBytes);
        }
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        let overflow = PoolError::SizeOverflow {
            value_bytes,
            capacity,
        };
        if capacity > Tagged::MAX_INDEX as usize {
            return Err(overflow);
        }
        let fragment_bytes = value_bytes
            .max(FRAGMENT_ALIGN)
            .checked_next_multiple_of(FRAGMENT_ALIGN)
            .ok_or_else(|| overflow.clone())?;
        fragment_bytes.checked_mul(capacity).ok_or(overflow)?;
        Ok(Self {
            value_bytes,
            fragment_bytes,
            capacity,
        })
    }

    /// Bytes requested per value.
    pub fn value_bytes(&self) -> usize {
        self.value_bytes
    }

    /// Bytes actually reserved per fragment.
    pub fn fragment_bytes(&self) -> usize {
        self.fragment_bytes
    }

    /// Number of fragments.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total buffer size the layout needs.
    pub fn total_bytes(&self) -> usize {
        self.fragment_bytes * self.capacity
    }
}

/// Buffer size needed for `capacity` values of `value_bytes` each.
pub fn compute_size(value_bytes: usize, capacity: usize) -> Result<usize, PoolError> {
    PoolLayout::new(value_bytes, capacity).map(|l| l.total_bytes())
}

//! Compact 32-bit references.
//!
//! Two encodings live here:
//!
//! - [`pack`] / [`unpack`]: a native address folded into 32 bits relative
//!   to a base address. The low 30 bits of the address are kept verbatim
//!   (addresses are 4-byte aligned, so their two lowest bits are always
//!   zero) and those two spare bits hold the difference between the upper
//!   halves of the address and the base.
//! - [`Tagged`]: a fragment slot plus a generation counter, stored in one
//!   `AtomicU64` through [`AtomicTagged`]. This is what the pool and queue
//!   actually swing with CAS.

use std::sync::atomic::{AtomicU64, Ordering};

/// Packed value reserved for "no pointer".
pub const NULL_PACKED: u32 = 0;

/// Bits of a packed value that carry the upper-region delta.
const REGION_MASK: u32 = 0x3;

/// Fold `addr` into 32 bits relative to `base`.
///
/// `addr` must be 4-byte aligned and its upper 32 bits may exceed those
/// of `base` by at most 3. Outside that window the result is meaningless
/// but the call is still safe.
pub fn pack(base: usize, addr: usize) -> u32 {
    let addr = addr as u64;
    let base = base as u64;
    let region = ((addr >> 32).wrapping_sub(base >> 32)) as u32 & REGION_MASK;
    (addr as u32 & !REGION_MASK) | region
}

/// Recover the address folded by [`pack`] under the same `base`.
pub fn unpack(base: usize, packed: u32) -> usize {
    let upper = ((base as u64) >> 32).wrapping_add(u64::from(packed & REGION_MASK));
    let lower = u64::from(packed & !REGION_MASK);
    ((upper << 32) | lower) as usize
}

/// [`pack`] for raw pointers.
pub fn pack_ptr<T>(base: *const T, ptr: *const T) -> u32 {
    pack(base.addr(), ptr.addr())
}

/// [`unpack`] for raw pointers. The result borrows `base`'s provenance,
/// so it is only dereferenceable when it lies inside `base`'s allocation.
pub fn unpack_ptr<T>(base: *const T, packed: u32) -> *const T {
    base.with_addr(unpack(base.addr(), packed))
}

/// A fragment slot paired with a generation counter.
///
/// The slot is `index + 1` so that the all-zero word means "no fragment".
/// The counter only ever moves forward (wrapping at `u32::MAX`); every
/// successful CAS on a head, tail or link installs a successor with a
/// higher counter, which is what defeats ABA.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tagged {
    slot: u32,
    count: u32,
}

impl Tagged {
    /// The null reference with a zero counter.
    pub const NULL: Tagged = Tagged { slot: 0, count: 0 };

    /// Largest fragment index a tagged reference can name.
    pub const MAX_INDEX: u32 = u32::MAX - 1;

    /// Reference to fragment `index` with the given counter.
    pub fn new(index: u32, count: u32) -> Self {
        debug_assert!(index <= Self::MAX_INDEX);
        Self {
            slot: index + 1,
            count,
        }
    }

    /// Null reference carrying `count`.
    pub fn null(count: u32) -> Self {
        Self { slot: 0, count }
    }

    /// Build from a raw slot value (`0` = null).
    pub(crate) fn from_slot(slot: u32, count: u32) -> Self {
        Self { slot, count }
    }

    /// Raw slot value (`index + 1`, or `0` for null).
    pub fn slot(self) -> u32 {
        self.slot
    }

    /// Fragment index, or `None` for null.
    pub fn index(self) -> Option<u32> {
        self.slot.checked_sub(1)
    }

    /// Whether this names no fragment.
    pub fn is_null(self) -> bool {
        self.slot == 0
    }

    /// Generation counter.
    pub fn count(self) -> u32 {
        self.count
    }

    /// The value that replaces `self` in a successful CAS: points at
    /// `index` (or nothing) with the counter advanced by one.
    pub fn successor(self, index: Option<u32>) -> Self {
        let slot = index.map_or(0, |i| i + 1);
        Self {
            slot,
            count: self.count.wrapping_add(1),
        }
    }

    /// Encode as one 64-bit word (counter high, slot low).
    pub fn to_bits(self) -> u64 {
        (u64::from(self.count) << 32) | u64::from(self.slot)
    }

    /// Decode a word produced by [`to_bits`](Self::to_bits).
    pub fn from_bits(bits: u64) -> Self {
        Self {
            slot: bits as u32,
            count: (bits >> 32) as u32,
        }
    }
}

impl Default for Tagged {
    fn default() -> Self {
        Self::NULL
    }
}

/// An atomically updatable [`Tagged`] reference.
#[derive(Debug, Default)]
pub struct AtomicTagged {
    bits: AtomicU64,
}

impl AtomicTagged {
    /// Create a cell holding `value`.
    pub fn new(value: Tagged) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    /// Load the current reference.
    pub fn load(&self, order: Ordering) -> Tagged {
        Tagged::from_bits(self.bits.load(order))
    }

    /// Overwrite the reference.
    pub fn store(&self, value: Tagged, order: Ordering) {
        self.bits.store(value.to_bits(), order);
    }

    /// Weak CAS comparing slot and counter together. On failure returns
    /// the value actually observed.
    pub fn compare_exchange_weak(
        &self,
        current: Tagged,
        new: Tagged,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Tagged, Tagged> {
        self.bits
            .compare_exchange_weak(current.to_bits(), new.to_bits(), success, failure)
            .map(Tagged::from_bits)
            .map_err(Tagged::from_bits)
    }

    /// Strong CAS, for best-effort swings that are not retried in a loop.
    pub fn compare_exchange(
        &self,
        current: Tagged,
        new: Tagged,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Tagged, Tagged> {
        self.bits
            .compare_exchange(current.to_bits(), new.to_bits(), success, failure)
            .map(Tagged::from_bits)
            .map_err(Tagged::from_bits)
    }

    /// Clear the slot while keeping the counter, so the counter never
    /// moves backwards when a fragment is recycled.
    pub fn clear_slot(&self, order: Ordering) {
        self.bits.fetch_and(!u64::from(u32::MAX), order);
    }
}

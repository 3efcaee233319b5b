//! The only `unsafe` in this crate.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use crate::buffer::PoolBuffer;

// SAFETY: the buffer's bytes are reached only through fragment pointers
// that the pool hands to one owner at a time. The pool itself never
// dereferences them, so sharing `&PoolBuffer` across threads cannot race.
unsafe impl Sync for PoolBuffer {}

/// `base + offset`, checked against the allocation length.
pub(crate) fn offset_ptr(base: NonNull<u8>, offset: usize, len: usize) -> NonNull<u8> {
    assert!(offset < len, "offset {offset} outside buffer of {len} bytes");
    // SAFETY: `offset < len` and `base` points at the start of a live
    // allocation of `len` bytes, so the result stays in bounds and is
    // therefore non-null.
    unsafe { base.add(offset) }
}

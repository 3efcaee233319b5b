//! Owned backing storage for a pool.

use std::cell::UnsafeCell;
use std::fmt;
use std::ptr::NonNull;

use crate::layout::{PoolLayout, FRAGMENT_ALIGN};

/// Zero-initialised, 8-byte aligned storage handed to
/// [`MemoryPool::bind`](crate::MemoryPool::bind).
///
/// The pool never reads or writes fragment bytes itself; it only hands out
/// pointers into this buffer. Whoever holds an allocated fragment owns its
/// bytes until the fragment is freed.
pub struct PoolBuffer {
    words: Box<[UnsafeCell<u64>]>,
}

impl PoolBuffer {
    /// A buffer of at least `bytes` bytes, rounded up to a multiple of 8.
    pub fn zeroed(bytes: usize) -> Self {
        let words = bytes.div_ceil(FRAGMENT_ALIGN);
        Self {
            words: (0..words).map(|_| UnsafeCell::new(0)).collect(),
        }
    }

    /// A buffer exactly large enough for `layout`.
    pub fn for_layout(layout: &PoolLayout) -> Self {
        Self::zeroed(layout.total_bytes())
    }

    /// Size in bytes.
    pub fn len_bytes(&self) -> usize {
        self.words.len() * FRAGMENT_ALIGN
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Address of the first byte, carrying provenance over the whole buffer.
    pub(crate) fn base(&self) -> NonNull<u8> {
        let first = UnsafeCell::raw_get(self.words.as_ptr());
        NonNull::new(first.cast::<u8>()).unwrap_or(NonNull::dangling())
    }
}

impl fmt::Debug for PoolBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuffer")
            .field("len_bytes", &self.len_bytes())
            .finish()
    }
}

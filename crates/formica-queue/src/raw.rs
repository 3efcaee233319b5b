//! Node storage. The only `unsafe` in this crate.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicU32;

use formica_pool::{AtomicTagged, MemoryPool, FRAGMENT_ALIGN};

use crate::queue::LockFreeQueue;

/// Parties that must let go of a node before it returns to the pool: the
/// dequeuer that moved head past it, and the dequeuer that took its value.
pub(crate) const RELEASE_PARTIES: u32 = 2;

/// One queue node, laid out at the start of a pool fragment.
#[repr(C)]
pub(crate) struct Node<T> {
    pub(crate) next: AtomicTagged,
    pub(crate) releases: AtomicU32,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Node<T> {
    const FITS_FRAGMENT: () = assert!(
        align_of::<Node<T>>() <= FRAGMENT_ALIGN,
        "queue values must not need more than 8-byte alignment"
    );

    /// The node stored in fragment `index` of `pool`.
    ///
    /// The pool must have been sized by `QueueLayout::new::<T>`.
    pub(crate) fn at(pool: &MemoryPool, index: u32) -> &Node<T> {
        let () = Self::FITS_FRAGMENT;
        let ptr = pool
            .fragment(index)
            .expect("tagged index names a fragment of the bound pool");
        // SAFETY: the fragment is 8-byte aligned, which covers Node<T> by
        // FITS_FRAGMENT, and at least size_of::<Node<T>>() bytes long
        // because the pool layout was computed from Node<T>. The buffer is
        // zero-initialised, and every bit pattern is valid for the two
        // atomics and the MaybeUninit payload. The buffer stays alive while
        // `pool` is borrowed (unbinding needs `&mut`). Every field is
        // interior-mutable, so shared references may coexist with writes
        // from other threads.
        unsafe { ptr.cast::<Node<T>>().as_ref() }
    }

    /// Move `value` into the payload.
    ///
    /// Callers must own the node exclusively: freshly allocated and not
    /// yet linked into the queue.
    pub(crate) fn put(&self, value: T) {
        // SAFETY: an unlinked node is reachable only from the enqueuer
        // that popped it, so no other thread touches the payload.
        unsafe { (*self.value.get()).write(value) };
    }

    /// Move the payload out.
    ///
    /// Callers must be the single dequeuer whose head CAS made this node
    /// the sentinel. Every linked node past the sentinel carries a value
    /// written by [`put`](Self::put), and the node cannot return to the
    /// pool before that dequeuer releases it.
    pub(crate) fn take(&self) -> T {
        // SAFETY: the payload was initialised before the node was linked,
        // and the winning head CAS is the only claim on it.
        unsafe { (*self.value.get()).assume_init_read() }
    }
}

// SAFETY: values of T are moved between threads through the queue but are
// never shared. Each one is written by a single enqueuer and read by the
// single dequeuer that claimed it, so `T: Send` is sufficient.
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}

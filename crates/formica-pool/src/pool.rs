//! The lock-free fixed-block pool.

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::buffer::PoolBuffer;
use crate::compact::{AtomicTagged, Tagged};
use crate::error::PoolError;
use crate::layout::PoolLayout;
use crate::raw;

/// Fixed-block allocator over a caller-supplied [`PoolBuffer`].
///
/// Free fragments form a singly linked stack. The link of each fragment
/// lives in a side table (`links`) rather than in the fragment itself, so
/// the pool never touches the bytes it hands out. The stack head is an
/// [`AtomicTagged`] whose counter advances on every push and pop.
///
/// `alloc` and `free` take `&self` and may race freely. `bind`, `unbind`
/// and `clear` take `&mut self` and so never overlap with either.
pub struct MemoryPool {
    layout: PoolLayout,
    buffer: Option<PoolBuffer>,
    links: Box<[AtomicU32]>,
    head: CachePadded<AtomicTagged>,
    freeable: AtomicUsize,
}

impl MemoryPool {
    /// An unbound pool with the given geometry.
    pub fn new(layout: PoolLayout) -> Self {
        Self {
            layout,
            buffer: None,
            links: (0..layout.capacity()).map(|_| AtomicU32::new(0)).collect(),
            head: CachePadded::new(AtomicTagged::default()),
            freeable: AtomicUsize::new(0),
        }
    }

    /// Compute the layout, allocate a buffer and bind it in one step.
    pub fn with_capacity(value_bytes: usize, capacity: usize) -> Result<Self, PoolError> {
        let layout = PoolLayout::new(value_bytes, capacity)?;
        let mut pool = Self::new(layout);
        pool.bind(PoolBuffer::for_layout(&layout))?;
        Ok(pool)
    }

    /// Take ownership of `buffer` and place every fragment on the free list.
    ///
    /// On error the buffer is dropped.
    pub fn bind(&mut self, buffer: PoolBuffer) -> Result<(), PoolError> {
        if self.buffer.is_some() {
            return Err(PoolError::AlreadyBound);
        }
        let required = self.layout.total_bytes();
        if buffer.len_bytes() < required {
            return Err(PoolError::BufferTooSmall {
                required,
                provided: buffer.len_bytes(),
            });
        }
        self.buffer = Some(buffer);
        self.thread_free_list();
        Ok(())
    }

    /// Release the buffer. Outstanding fragment pointers become dangling.
    pub fn unbind(&mut self) -> Option<PoolBuffer> {
        let buffer = self.buffer.take()?;
        let head = self.head.load(Ordering::Relaxed);
        self.head.store(head.successor(None), Ordering::Relaxed);
        self.freeable.store(0, Ordering::Relaxed);
        Some(buffer)
    }

    /// Return every fragment to the free list, forgetting outstanding
    /// allocations. A no-op on an unbound pool.
    pub fn clear(&mut self) {
        if self.buffer.is_some() {
            self.thread_free_list();
        }
    }

    fn thread_free_list(&mut self) {
        let head = self.head.load(Ordering::Relaxed);
        self.head.store(head.successor(None), Ordering::Relaxed);
        self.freeable.store(0, Ordering::Relaxed);
        for index in 0..self.layout.capacity() as u32 {
            self.push(index);
        }
    }

    // ── Index-level API ─────────────────────────────────────────

    /// Pop a free fragment and return its index.
    pub fn alloc_index(&self) -> Result<u32, PoolError> {
        if self.buffer.is_none() {
            return Err(PoolError::Unbound);
        }
        self.pop().ok_or(PoolError::Exhausted)
    }

    /// Push fragment `index` back onto the free list.
    ///
    /// Freeing an index that is already free is not detected and leaves
    /// the pool handing the same fragment to two owners.
    pub fn free_index(&self, index: u32) -> Result<(), PoolError> {
        if self.buffer.is_none() {
            return Err(PoolError::Unbound);
        }
        if index as usize >= self.layout.capacity() {
            return Err(PoolError::ForeignPointer);
        }
        self.push(index);
        Ok(())
    }

    /// Start address of fragment `index`.
    pub fn fragment(&self, index: u32) -> Result<NonNull<u8>, PoolError> {
        let buffer = self.buffer.as_ref().ok_or(PoolError::Unbound)?;
        if index as usize >= self.layout.capacity() {
            return Err(PoolError::ForeignPointer);
        }
        let offset = index as usize * self.layout.fragment_bytes();
        Ok(raw::offset_ptr(buffer.base(), offset, buffer.len_bytes()))
    }

    /// Index of the fragment starting at `ptr`.
    pub fn index_of(&self, ptr: *const u8) -> Result<u32, PoolError> {
        let buffer = self.buffer.as_ref().ok_or(PoolError::Unbound)?;
        let offset = ptr
            .addr()
            .checked_sub(buffer.base().as_ptr().addr())
            .ok_or(PoolError::ForeignPointer)?;
        if offset >= self.layout.total_bytes() || offset % self.layout.fragment_bytes() != 0 {
            return Err(PoolError::ForeignPointer);
        }
        Ok((offset / self.layout.fragment_bytes()) as u32)
    }

    // ── Pointer-level API ───────────────────────────────────────

    /// Pop a free fragment and return its address.
    pub fn alloc(&self) -> Result<NonNull<u8>, PoolError> {
        let index = self.alloc_index()?;
        self.fragment(index)
    }

    /// Return the fragment starting at `ptr` to the pool.
    pub fn free(&self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        let index = self.index_of(ptr.as_ptr())?;
        self.free_index(index)
    }

    /// Whether `ptr` falls anywhere inside this pool's fragments.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let Some(buffer) = self.buffer.as_ref() else {
            return false;
        };
        let start = buffer.base().as_ptr().addr();
        let addr = ptr.addr();
        addr >= start && addr - start < self.layout.total_bytes()
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Geometry of this pool.
    pub fn layout(&self) -> PoolLayout {
        self.layout
    }

    /// Bytes requested per value.
    pub fn value_bytes(&self) -> usize {
        self.layout.value_bytes()
    }

    /// Bytes reserved per fragment.
    pub fn fragment_bytes(&self) -> usize {
        self.layout.fragment_bytes()
    }

    /// Number of fragments.
    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    /// Fragments currently on the free list. Approximate while other
    /// threads are allocating or freeing.
    pub fn freeable(&self) -> usize {
        self.freeable.load(Ordering::Relaxed)
    }

    /// Whether a buffer is bound.
    pub fn is_bound(&self) -> bool {
        self.buffer.is_some()
    }

    // ── Free list ───────────────────────────────────────────────

    fn push(&self, index: u32) {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            self.links[index as usize].store(head.slot(), Ordering::Relaxed);
            let new = head.successor(Some(index));
            match self
                .head
                .compare_exchange_weak(head, new, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => {
                    head = actual;
                    backoff.spin();
                }
            }
        }
        self.freeable.fetch_add(1, Ordering::Relaxed);
    }

    fn pop(&self) -> Option<u32> {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let index = head.index()?;
            let next = self.links[index as usize].load(Ordering::Relaxed);
            let new = Tagged::from_slot(next, head.count().wrapping_add(1));
            match self
                .head
                .compare_exchange_weak(head, new, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) => {
                    self.freeable.fetch_sub(1, Ordering::Relaxed);
                    return Some(index);
                }
                Err(actual) => {
                    head = actual;
                    backoff.spin();
                }
            }
        }
    }
}

impl fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPool")
            .field("layout", &self.layout)
            .field("bound", &self.is_bound())
            .field("freeable", &self.freeable())
            .finish()
    }
}

// Compile-time assertion: MemoryPool must be shareable across workers.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<MemoryPool>();
};

//! The Michael & Scott queue.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::Ordering;

use crossbeam_utils::{Backoff, CachePadded};
use formica_pool::{AtomicTagged, MemoryPool, PoolBuffer, Tagged};

use crate::error::{QueueError, QueueFull};
use crate::layout::QueueLayout;
use crate::raw::{Node, RELEASE_PARTIES};

/// Bounded lock-free multi-producer multi-consumer FIFO.
///
/// `head` always names the sentinel, whose successor holds the oldest
/// value. `tail` names the last node or lags one step behind it; any
/// thread that sees the lag finishes the swing.
///
/// A node goes back to the pool once head has moved past it and its
/// value has been taken. Those two events can happen on different
/// threads in either order, so `enqueue` may transiently report
/// [`QueueFull`] while a just-dequeued node is still being released.
pub struct LockFreeQueue<T> {
    layout: QueueLayout,
    pool: MemoryPool,
    head: CachePadded<AtomicTagged>,
    tail: CachePadded<AtomicTagged>,
    _values: PhantomData<T>,
}

impl<T> LockFreeQueue<T> {
    /// An unbound queue for up to `capacity` values.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        let layout = QueueLayout::new::<T>(capacity)?;
        Ok(Self {
            layout,
            pool: MemoryPool::new(layout.pool()),
            head: CachePadded::new(AtomicTagged::default()),
            tail: CachePadded::new(AtomicTagged::default()),
            _values: PhantomData,
        })
    }

    /// A queue for up to `capacity` values, bound to a fresh buffer.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        let mut queue = Self::new(capacity)?;
        let buffer = PoolBuffer::for_layout(&queue.layout.pool());
        queue.bind(buffer)?;
        Ok(queue)
    }

    /// Bind the node pool to `buffer` and install the sentinel.
    pub fn bind(&mut self, buffer: PoolBuffer) -> Result<(), QueueError> {
        self.pool.bind(buffer)?;
        let sentinel = self.pool.alloc_index()?;
        let node = Node::<T>::at(&self.pool, sentinel);
        node.next.clear_slot(Ordering::Relaxed);
        // The sentinel carries no value, so only the head party remains.
        node.releases.store(RELEASE_PARTIES - 1, Ordering::Relaxed);
        let at = Tagged::new(sentinel, 0);
        self.head.store(at, Ordering::Relaxed);
        self.tail.store(at, Ordering::Relaxed);
        Ok(())
    }

    /// Drop every queued value and release the buffer.
    pub fn unbind(&mut self) -> Option<PoolBuffer> {
        if !self.pool.is_bound() {
            return None;
        }
        while self.dequeue().is_some() {}
        self.head.store(Tagged::NULL, Ordering::Relaxed);
        self.tail.store(Tagged::NULL, Ordering::Relaxed);
        self.pool.unbind()
    }

    /// Append `value` at the tail. An unbound queue is always full.
    pub fn enqueue(&self, value: T) -> Result<(), QueueFull<T>> {
        let Ok(index) = self.pool.alloc_index() else {
            return Err(QueueFull(value));
        };
        let node = Node::<T>::at(&self.pool, index);
        node.next.clear_slot(Ordering::Relaxed);
        node.releases.store(0, Ordering::Relaxed);
        // Just popped from the free list and not yet linked.
        node.put(value);

        let backoff = Backoff::new();
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let last = Node::<T>::at(&self.pool, Self::named(tail));
            let next = last.next.load(Ordering::Acquire);
            if tail != self.tail.load(Ordering::Acquire) {
                continue;
            }
            match next.index() {
                None => {
                    if last
                        .next
                        .compare_exchange_weak(
                            next,
                            next.successor(Some(index)),
                            Ordering::Release,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                    {
                        // Best effort; a lagging tail is fixed by the next visitor.
                        let _ = self.tail.compare_exchange(
                            tail,
                            tail.successor(Some(index)),
                            Ordering::Release,
                            Ordering::Relaxed,
                        );
                        return Ok(());
                    }
                }
                Some(lagging) => {
                    let _ = self.tail.compare_exchange(
                        tail,
                        tail.successor(Some(lagging)),
                        Ordering::Release,
                        Ordering::Relaxed,
                    );
                }
            }
            backoff.spin();
        }
    }

    /// Remove the value at the head, or `None` if the queue is empty.
    pub fn dequeue(&self) -> Option<T> {
        if !self.pool.is_bound() {
            return None;
        }
        let backoff = Backoff::new();
        loop {
            let head = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            let head_index = Self::named(head);
            let next = Node::<T>::at(&self.pool, head_index)
                .next
                .load(Ordering::Acquire);
            if head != self.head.load(Ordering::Acquire) {
                continue;
            }
            if head.slot() == tail.slot() {
                let lagging = next.index()?;
                let _ = self.tail.compare_exchange(
                    tail,
                    tail.successor(Some(lagging)),
                    Ordering::Release,
                    Ordering::Relaxed,
                );
            } else if let Some(next_index) = next.index() {
                if self
                    .head
                    .compare_exchange_weak(
                        head,
                        head.successor(Some(next_index)),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    let first = Node::<T>::at(&self.pool, next_index);
                    // The winning head CAS makes this thread the only taker
                    // of `first`'s value; `first` stays out of the pool until
                    // it is released below.
                    let value = first.take();
                    self.release(next_index);
                    self.release(head_index);
                    return Some(value);
                }
            }
            backoff.spin();
        }
    }

    fn release(&self, index: u32) {
        let node = Node::<T>::at(&self.pool, index);
        if node.releases.fetch_add(1, Ordering::AcqRel) + 1 == RELEASE_PARTIES {
            self.pool
                .free_index(index)
                .expect("released node belongs to the bound pool");
        }
    }

    fn named(at: Tagged) -> u32 {
        at.index().expect("head and tail name a node while bound")
    }

    /// Whether no value is queued. Approximate under concurrency.
    pub fn is_empty(&self) -> bool {
        match self.head.load(Ordering::Acquire).index() {
            None => true,
            Some(index) => Node::<T>::at(&self.pool, index)
                .next
                .load(Ordering::Acquire)
                .is_null(),
        }
    }

    /// Approximate number of queued values. May overcount while dequeued
    /// nodes are still being released.
    pub fn len_hint(&self) -> usize {
        if !self.pool.is_bound() {
            return 0;
        }
        (self.pool.capacity() - self.pool.freeable()).saturating_sub(1)
    }

    /// Maximum number of values held at once.
    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    /// Geometry of this queue.
    pub fn layout(&self) -> QueueLayout {
        self.layout
    }

    /// Whether a buffer is bound.
    pub fn is_bound(&self) -> bool {
        self.pool.is_bound()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        if self.pool.is_bound() {
            while self.dequeue().is_some() {}
        }
    }
}

impl<T> fmt::Debug for LockFreeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("capacity", &self.capacity())
            .field("bound", &self.is_bound())
            .field("len_hint", &self.len_hint())
            .finish()
    }
}

// Compile-time assertion: a queue of Send values is shareable across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<LockFreeQueue<Box<dyn FnMut() + Send>>>();
};

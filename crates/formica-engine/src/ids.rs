//! Task id issuing.

use std::sync::atomic::{AtomicU32, Ordering};

use formica_core::TaskId;

/// Shared counter that issues task ids.
///
/// Each call to [`next`](Self::next) bumps the counter once and folds the
/// new value into the id space, so the first id is `1` and ids wrap after
/// 32768 submissions. After a wrap a cancel aimed at a stale id lands on
/// whichever task was issued that id most recently.
#[derive(Debug, Default)]
pub struct TaskIdAllocator {
    counter: AtomicU32,
}

// Compile-time assertion: TaskIdAllocator must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<TaskIdAllocator>();
};

impl TaskIdAllocator {
    /// A fresh allocator. The first issued id is `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id.
    pub fn next(&self) -> TaskId {
        TaskId::from_counter(self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
    }

    /// Raw number of ids issued so far (wrapping at `u32::MAX`).
    pub fn issued(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }
}

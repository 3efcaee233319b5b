//! Task closures for engine tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use formica_core::TaskId;

/// Shared invocation counter.
#[derive(Clone, Debug, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(value: u32) -> Self {
        Self(Arc::new(AtomicU32::new(value)))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts invocations and always returns `result`.
pub fn counting_task(
    counter: &CallCounter,
    result: bool,
) -> impl FnMut(TaskId) -> bool + Send + 'static {
    let counter = counter.clone();
    move |_| {
        counter.bump();
        result
    }
}

/// Counts invocations and always fails.
pub fn failing_task(counter: &CallCounter) -> impl FnMut(TaskId) -> bool + Send + 'static {
    counting_task(counter, false)
}

/// Decrements `cell` once per invocation and succeeds.
pub fn decrementing_task(cell: &CallCounter) -> impl FnMut(TaskId) -> bool + Send + 'static {
    let cell = cell.clone();
    move |_| {
        cell.0.fetch_sub(1, Ordering::SeqCst);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_task_counts() {
        let c = CallCounter::new();
        let mut t = counting_task(&c, true);
        assert!(t(TaskId(1)));
        assert!(t(TaskId(1)));
        assert_eq!(c.get(), 2);
    }

    #[test]
    fn decrementing_task_decrements() {
        let c = CallCounter::starting_at(0x11);
        let mut t = decrementing_task(&c);
        assert!(t(TaskId(1)));
        assert_eq!(c.get(), 0x10);
    }
}

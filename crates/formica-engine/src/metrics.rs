//! Cumulative engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of an engine's cumulative counters.
///
/// Taken with [`TaskQueue::metrics`](crate::TaskQueue::metrics). Counters
/// are read individually, so a snapshot taken while workers are busy may
/// be off by the tasks in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineMetrics {
    /// Tasks accepted by `enqueue`.
    pub submitted: u64,
    /// Task function invocations, counting each retry attempt.
    pub executed: u64,
    /// Tasks that finished with `Success`.
    pub succeeded: u64,
    /// Tasks that finished with `Fail`.
    pub failed: u64,
    /// Retry re-submissions accepted by the queue.
    pub retried: u64,
    /// Tasks dropped on dequeue because their id was cancelled.
    pub cancelled: u64,
    /// Tasks dropped because a callback returned `false` on Ack or Retry.
    pub aborted: u64,
    /// Retries that could not be re-submitted because the queue was full.
    pub requeue_failures: u64,
    /// Task functions that panicked.
    pub task_panics: u64,
}

#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    pub(crate) submitted: AtomicU64,
    pub(crate) executed: AtomicU64,
    pub(crate) succeeded: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) retried: AtomicU64,
    pub(crate) cancelled: AtomicU64,
    pub(crate) aborted: AtomicU64,
    pub(crate) requeue_failures: AtomicU64,
    pub(crate) task_panics: AtomicU64,
}

impl EngineCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EngineMetrics {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        EngineMetrics {
            submitted: read(&self.submitted),
            executed: read(&self.executed),
            succeeded: read(&self.succeeded),
            failed: read(&self.failed),
            retried: read(&self.retried),
            cancelled: read(&self.cancelled),
            aborted: read(&self.aborted),
            requeue_failures: read(&self.requeue_failures),
            task_panics: read(&self.task_panics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        assert_eq!(EngineCounters::default().snapshot(), EngineMetrics::default());
    }

    #[test]
    fn bump_is_visible_in_snapshot() {
        let counters = EngineCounters::default();
        EngineCounters::bump(&counters.submitted);
        EngineCounters::bump(&counters.submitted);
        EngineCounters::bump(&counters.retried);
        let m = counters.snapshot();
        assert_eq!(m.submitted, 2);
        assert_eq!(m.retried, 1);
        assert_eq!(m.failed, 0);
    }
}

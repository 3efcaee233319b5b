//! Worker loop and the per-task state machine.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use formica_core::{TaskId, TaskItem, TaskStatus};
use formica_queue::LockFreeQueue;
use tracing::{debug, error, trace, warn};

use crate::cancel::CancelSet;
use crate::gate::Gate;
use crate::ids::TaskIdAllocator;
use crate::metrics::EngineCounters;

/// A task item paired with the id it was issued. Moved, never copied,
/// through the queue; a retry re-submits the same cargo.
pub(crate) struct Cargo {
    pub(crate) id: TaskId,
    pub(crate) item: TaskItem,
}

/// State shared between the [`TaskQueue`](crate::TaskQueue) handle and
/// its workers.
pub(crate) struct EngineShared {
    pub(crate) queue: LockFreeQueue<Cargo>,
    pub(crate) gate: Gate,
    pub(crate) cancelled: CancelSet,
    pub(crate) ids: TaskIdAllocator,
    pub(crate) counters: EngineCounters,
}

/// Body of every worker thread. Returns once the gate is closed.
pub(crate) fn worker_loop(shared: Arc<EngineShared>, index: usize) {
    debug!(worker = index, "worker started");
    while let Some(cargo) = shared.gate.wait_for(|| shared.queue.dequeue()) {
        process(&shared, cargo);
    }
    debug!(worker = index, "worker exiting");
}

/// Drive one dequeued cargo through Ack, execution, and its outcome.
pub(crate) fn process(shared: &EngineShared, mut cargo: Cargo) {
    let id = cargo.id;
    let counters = &shared.counters;

    if shared.cancelled.contains(id) {
        trace!(task = %id, "discarding cancelled task");
        EngineCounters::bump(&counters.cancelled);
        return;
    }

    if !notify(&mut cargo, TaskStatus::Ack) {
        trace!(task = %id, "aborted on ack");
        EngineCounters::bump(&counters.aborted);
        return;
    }

    EngineCounters::bump(&counters.executed);
    if run(shared, &mut cargo) {
        notify(&mut cargo, TaskStatus::Success);
        EngineCounters::bump(&counters.succeeded);
        return;
    }

    if cargo.item.retry() == 0 {
        notify(&mut cargo, TaskStatus::Fail);
        EngineCounters::bump(&counters.failed);
        return;
    }

    if !notify(&mut cargo, TaskStatus::Retry) {
        trace!(task = %id, "aborted on retry");
        EngineCounters::bump(&counters.aborted);
        return;
    }

    cargo.item.consume_retry();
    match shared.queue.enqueue(cargo) {
        Ok(()) => {
            EngineCounters::bump(&counters.retried);
            shared.gate.notify_one();
        }
        Err(full) => {
            let mut cargo = full.into_inner();
            warn!(task = %id, "queue full, retry could not be re-submitted");
            EngineCounters::bump(&counters.requeue_failures);
            notify(&mut cargo, TaskStatus::Fail);
            EngineCounters::bump(&counters.failed);
        }
    }
}

/// Run the task function. A panic counts as a failed attempt.
fn run(shared: &EngineShared, cargo: &mut Cargo) -> bool {
    let id = cargo.id;
    match panic::catch_unwind(AssertUnwindSafe(|| cargo.item.run(id))) {
        Ok(done) => done,
        Err(_) => {
            error!(task = %id, "task function panicked");
            EngineCounters::bump(&shared.counters.task_panics);
            false
        }
    }
}

/// Deliver `status`. A panicking callback counts as `false`.
fn notify(cargo: &mut Cargo, status: TaskStatus) -> bool {
    let id = cargo.id;
    match panic::catch_unwind(AssertUnwindSafe(|| cargo.item.notify(id, status))) {
        Ok(accepted) => accepted,
        Err(_) => {
            error!(task = %id, %status, "status callback panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn shared(capacity: usize) -> EngineShared {
        EngineShared {
            queue: LockFreeQueue::with_capacity(capacity).unwrap(),
            gate: Gate::new(false),
            cancelled: CancelSet::for_id_space(),
            ids: TaskIdAllocator::new(),
            counters: EngineCounters::default(),
        }
    }

    fn recorded(log: &Arc<Mutex<Vec<TaskStatus>>>, accept: bool) -> impl FnMut(TaskId, TaskStatus) -> bool + Send + 'static {
        let log = Arc::clone(log);
        move |_, status| {
            log.lock().unwrap().push(status);
            accept
        }
    }

    #[test]
    fn success_path_reports_ack_then_success() {
        let s = shared(4);
        let log = Arc::new(Mutex::new(Vec::new()));
        let item = TaskItem::new(|_| true).with_callback(recorded(&log, true));
        process(&s, Cargo { id: TaskId(1), item });
        assert_eq!(*log.lock().unwrap(), [TaskStatus::Ack, TaskStatus::Success]);
        let m = s.counters.snapshot();
        assert_eq!((m.executed, m.succeeded), (1, 1));
    }

    #[test]
    fn failure_with_retry_requeues_same_id() {
        let s = shared(4);
        let log = Arc::new(Mutex::new(Vec::new()));
        let item = TaskItem::new(|_| false)
            .with_callback(recorded(&log, true))
            .with_retry(1);
        process(&s, Cargo { id: TaskId(9), item });
        assert_eq!(*log.lock().unwrap(), [TaskStatus::Ack, TaskStatus::Retry]);

        let again = s.queue.dequeue().expect("retry was re-submitted");
        assert_eq!(again.id, TaskId(9));
        assert_eq!(again.item.retry(), 0);
        process(&s, again);
        assert_eq!(
            *log.lock().unwrap(),
            [TaskStatus::Ack, TaskStatus::Retry, TaskStatus::Ack, TaskStatus::Fail]
        );
        assert_eq!(s.counters.snapshot().retried, 1);
    }

    #[test]
    fn cancelled_cargo_is_silent() {
        let s = shared(4);
        let runs = Arc::new(AtomicU32::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let counter = Arc::clone(&runs);
        let item = TaskItem::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .with_callback(recorded(&log, true));
        s.cancelled.insert(TaskId(3));
        process(&s, Cargo { id: TaskId(3), item });
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(s.counters.snapshot().cancelled, 1);
    }

    #[test]
    fn ack_refusal_skips_task() {
        let s = shared(4);
        let runs = Arc::new(AtomicU32::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let counter = Arc::clone(&runs);
        let item = TaskItem::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .with_callback(recorded(&log, false));
        process(&s, Cargo { id: TaskId(2), item });
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock().unwrap(), [TaskStatus::Ack]);
        assert_eq!(s.counters.snapshot().aborted, 1);
    }

    #[test]
    fn full_queue_turns_retry_into_fail() {
        let s = shared(1);
        s.queue
            .enqueue(Cargo {
                id: TaskId(100),
                item: TaskItem::new(|_| true),
            })
            .unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let item = TaskItem::new(|_| false)
            .with_callback(recorded(&log, true))
            .with_retry(3);
        process(&s, Cargo { id: TaskId(4), item });
        assert_eq!(
            *log.lock().unwrap(),
            [TaskStatus::Ack, TaskStatus::Retry, TaskStatus::Fail]
        );
        let m = s.counters.snapshot();
        assert_eq!((m.requeue_failures, m.failed, m.retried), (1, 1, 0));
    }

    #[test]
    fn panicking_task_counts_as_failure() {
        let s = shared(4);
        let log = Arc::new(Mutex::new(Vec::new()));
        let item = TaskItem::new(|_| panic!("boom")).with_callback(recorded(&log, true));
        process(&s, Cargo { id: TaskId(5), item });
        assert_eq!(*log.lock().unwrap(), [TaskStatus::Ack, TaskStatus::Fail]);
        assert_eq!(s.counters.snapshot().task_panics, 1);
    }

    #[test]
    fn panicking_callback_aborts() {
        let s = shared(4);
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let item = TaskItem::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .with_callback(|_, _| panic!("callback"));
        process(&s, Cargo { id: TaskId(6), item });
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(s.counters.snapshot().aborted, 1);
    }
}

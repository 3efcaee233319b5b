//! User-facing [`TaskQueue`] handle: construction, lifecycle, submission.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use formica_core::{EngineError, TaskId, TaskItem};
use formica_queue::LockFreeQueue;
use smallvec::SmallVec;
use tracing::{debug, error, info};

use crate::cancel::CancelSet;
use crate::config::{ConfigError, EngineConfig};
use crate::gate::Gate;
use crate::ids::TaskIdAllocator;
use crate::metrics::{EngineCounters, EngineMetrics};
use crate::worker::{self, Cargo, EngineShared};

type Workers = SmallVec<[JoinHandle<()>; 8]>;

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from [`TaskQueue::shutdown`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Total time spent shutting down.
    pub total_ms: u64,
    /// Worker threads joined cleanly.
    pub workers_joined: usize,
    /// Worker threads that ended in a panic.
    pub workers_panicked: usize,
    /// Workers not joined because shutdown ran on them, e.g. when a
    /// task dropped the last handle. Each exits once its task returns.
    pub workers_detached: usize,
    /// Queued tasks dropped without running.
    pub discarded: usize,
}

// ── TaskQueue ────────────────────────────────────────────────────

/// Fixed-capacity task queue served by a fixed set of worker threads.
///
/// All methods take `&self`, so the handle can be shared behind an `Arc`
/// and used from any thread. Dropping the handle shuts the engine down.
pub struct TaskQueue {
    shared: Arc<EngineShared>,
    config: EngineConfig,
    workers: Mutex<Workers>,
}

impl TaskQueue {
    /// Validate `config`, allocate queue storage and spawn the workers.
    ///
    /// The engine starts suspended. If any worker fails to spawn, those
    /// already running are stopped and joined before the error returns.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let shared = Arc::new(EngineShared {
            queue: LockFreeQueue::with_capacity(config.capacity)?,
            gate: Gate::new(true),
            cancelled: CancelSet::for_id_space(),
            ids: TaskIdAllocator::new(),
            counters: EngineCounters::default(),
        });

        let workers = Self::spawn_workers(&shared, config.worker_count)?;
        info!(
            capacity = config.capacity,
            workers = config.worker_count,
            "task queue initialised (suspended)"
        );

        Ok(Self {
            shared,
            config,
            workers: Mutex::new(workers),
        })
    }

    /// Shorthand for [`new`](Self::new) with the two constructor integers.
    pub fn init(capacity: usize, worker_count: usize) -> Result<Self, ConfigError> {
        Self::new(EngineConfig::new(capacity, worker_count))
    }

    fn spawn_workers(shared: &Arc<EngineShared>, count: usize) -> Result<Workers, ConfigError> {
        let mut workers = Workers::with_capacity(count);
        for i in 0..count {
            let worker_shared = Arc::clone(shared);
            let spawned = thread::Builder::new()
                .name(format!("formica-worker-{i}"))
                .spawn(move || worker::worker_loop(worker_shared, i));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker = i, error = %e, "failed to spawn worker, tearing down");
                    shared.gate.close();
                    for handle in workers.drain(..) {
                        let _ = handle.join();
                    }
                    return Err(ConfigError::ThreadSpawnFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(workers)
    }

    /// Let workers pick up queued tasks.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.shared.gate.is_closed() {
            return Err(EngineError::ShutDown);
        }
        self.shared.gate.resume();
        debug!("task queue started");
        Ok(())
    }

    /// Stop handing tasks to workers. Tasks already running finish;
    /// queued tasks wait for the next [`start`](Self::start).
    pub fn stop(&self) -> Result<(), EngineError> {
        if self.shared.gate.is_closed() {
            return Err(EngineError::ShutDown);
        }
        self.shared.gate.suspend();
        debug!("task queue stopped");
        Ok(())
    }

    /// Submit `item` and return the id it was issued.
    ///
    /// Items without a status callback get one that accepts every
    /// transition. The call yields the processor before returning so a
    /// woken worker can get going.
    pub fn enqueue(&self, mut item: TaskItem) -> Result<TaskId, EngineError> {
        if self.shared.gate.is_closed() {
            return Err(EngineError::ShutDown);
        }
        item.ensure_callback();
        let id = self.shared.ids.next();
        self.shared.cancelled.remove(id);
        let pushed = self
            .shared
            .gate
            .admit(|| self.shared.queue.enqueue(Cargo { id, item }));
        match pushed {
            None => return Err(EngineError::ShutDown),
            Some(Err(_)) => {
                return Err(EngineError::QueueFull {
                    capacity: self.config.capacity,
                })
            }
            Some(Ok(())) => {}
        }
        EngineCounters::bump(&self.shared.counters.submitted);
        thread::yield_now();
        Ok(id)
    }

    /// Mark `id` cancelled. Takes effect only if no worker has dequeued
    /// the task yet.
    pub fn cancel(&self, id: TaskId) -> Result<(), EngineError> {
        if !id.is_valid() {
            return Err(EngineError::InvalidTaskId {
                id: i32::from(id.0),
            });
        }
        self.shared.cancelled.insert(id);
        Ok(())
    }

    /// Close the gate, join every worker and drop whatever is still
    /// queued. Idempotent; later calls report nothing joined.
    ///
    /// When called on a worker thread (a task dropping the last handle),
    /// that worker is left to exit on its own after its task returns.
    /// Any other worker running a task that waits on this engine would
    /// block the join.
    pub fn shutdown(&self) -> ShutdownReport {
        let start = Instant::now();
        if self.shared.gate.close() {
            info!("task queue shutting down");
        }

        let handles = mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        let current = thread::current().id();
        let mut report = ShutdownReport::default();
        for handle in handles {
            if handle.thread().id() == current {
                debug!("shutdown running on a worker, not joining it");
                report.workers_detached += 1;
                continue;
            }
            match handle.join() {
                Ok(()) => report.workers_joined += 1,
                Err(_) => report.workers_panicked += 1,
            }
        }
        while self.shared.queue.dequeue().is_some() {
            report.discarded += 1;
        }
        report.total_ms = start.elapsed().as_millis() as u64;
        if report.workers_joined + report.workers_panicked + report.workers_detached > 0 {
            info!(
                joined = report.workers_joined,
                panicked = report.workers_panicked,
                detached = report.workers_detached,
                discarded = report.discarded,
                "task queue shut down"
            );
        }
        report
    }

    // ── Accessors ────────────────────────────────────────────────

    /// Cumulative counters.
    pub fn metrics(&self) -> EngineMetrics {
        self.shared.counters.snapshot()
    }

    /// Whether workers are held back from fetching tasks.
    pub fn is_suspended(&self) -> bool {
        self.shared.gate.is_suspended()
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shared.gate.is_closed()
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Maximum number of pending tasks.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Approximate number of pending tasks.
    pub fn len_hint(&self) -> usize {
        self.shared.queue.len_hint()
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("config", &self.config)
            .field("suspended", &self.is_suspended())
            .field("shut_down", &self.is_shut_down())
            .field("len_hint", &self.len_hint())
            .finish()
    }
}

// Compile-time assertion: TaskQueue must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<TaskQueue>();
};

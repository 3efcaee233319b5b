//! Worker-pool task engine for Formica.
//!
//! A [`TaskQueue`] owns a fixed set of worker threads serving a
//! [`LockFreeQueue`](formica_queue::LockFreeQueue) of submitted tasks.
//! Callers enqueue [`TaskItem`]s from any thread and receive a
//! [`TaskId`]; workers run each task through the Ack / Success / Retry /
//! Fail state machine, reporting every transition to the task's status
//! callback.
//!
//! # Architecture
//!
//! ```text
//! Caller thread(s)                     Worker threads (N)
//!     |                                     |
//!     |--enqueue(item)                      | gate.wait_for(dequeue)
//!     |   ids.next() -> TaskId              |   blocks while suspended
//!     |   cancelled.remove(id)              |   or queue empty
//!     |   queue.enqueue(cargo)              |
//!     |   gate.notify_one()  ---------->    | cancelled? -> discard
//!     |                                     | callback(Ack)
//!     |--cancel(id)                         | task() -> true:  callback(Success)
//!     |   cancelled.insert(id)              |        -> false: callback(Retry),
//!     |                                     |                  re-enqueue at tail
//!     |--start() / stop()                   |                  or callback(Fail)
//!     |   gate.resume() / suspend()         |
//! ```
//!
//! The engine starts suspended: nothing runs until [`TaskQueue::start`].
//! Shutdown is cooperative. [`TaskQueue::shutdown`] closes the gate,
//! lets every worker finish the task it holds, joins them, and drops
//! whatever is still queued without firing callbacks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod config;
mod gate;
pub mod ids;
pub mod metrics;
pub mod task_queue;
mod worker;

pub use cancel::CancelSet;
pub use config::{ConfigError, EngineConfig, WORKER_LIMIT};
pub use ids::TaskIdAllocator;
pub use metrics::EngineMetrics;
pub use task_queue::{ShutdownReport, TaskQueue};

pub use formica_core::{EngineError, TaskId, TaskItem, TaskStatus};

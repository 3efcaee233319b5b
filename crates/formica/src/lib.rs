//! Formica: an asynchronous task queue built on a lock-free core.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Formica sub-crates. For most users, adding `formica` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! use formica::prelude::*;
//!
//! let tq = TaskQueue::init(16, 2).unwrap();
//! tq.start().unwrap();
//!
//! let done = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&done);
//! let id = tq
//!     .enqueue(
//!         TaskItem::new(|_| false)
//!             .with_retry(2)
//!             .with_callback(move |_, status| {
//!                 if status == TaskStatus::Fail {
//!                     counter.fetch_add(1, Ordering::SeqCst);
//!                 }
//!                 true
//!             }),
//!     )
//!     .unwrap();
//! assert_eq!(id, TaskId(1));
//!
//! let deadline = Instant::now() + Duration::from_secs(5);
//! while done.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
//!     std::thread::yield_now();
//! }
//! assert_eq!(tq.metrics().executed, 3);
//! tq.shutdown();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `formica-core` | Task ids, statuses, task items, runtime errors |
//! | [`pool`] | `formica-pool` | Lock-free fixed-block pool and packed references |
//! | [`queue`] | `formica-queue` | Lock-free bounded MPMC queue |
//! | [`engine`] | `formica-engine` | Worker-pool task engine |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Task ids, statuses, task items and runtime errors (`formica-core`).
pub use formica_core as types;

/// Lock-free fixed-block memory pool (`formica-pool`).
///
/// [`pool::MemoryPool`] hands out fragments of a [`pool::PoolBuffer`];
/// [`pool::compact`] holds the 32-bit reference encodings.
pub use formica_pool as pool;

/// Lock-free bounded MPMC queue (`formica-queue`).
pub use formica_queue as queue;

/// Worker-pool task engine (`formica-engine`).
///
/// [`engine::TaskQueue`] is the entry point.
pub use formica_engine as engine;

/// Common imports for typical Formica usage.
///
/// ```rust
/// use formica::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use formica_core::{EngineError, TaskId, TaskItem, TaskStatus};

    // Engine
    pub use formica_engine::{
        ConfigError, EngineConfig, EngineMetrics, ShutdownReport, TaskQueue,
    };

    // Lock-free building blocks
    pub use formica_pool::{MemoryPool, PoolBuffer, PoolError};
    pub use formica_queue::{LockFreeQueue, QueueError, QueueFull};
}

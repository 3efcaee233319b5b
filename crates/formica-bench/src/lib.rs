//! Benchmark helpers for the Formica task queue.
//!
//! - [`drain_profile`]: submit a batch of trivial tasks and wait until
//!   every one has run.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use formica_core::TaskItem;
use formica_engine::{EngineError, TaskQueue};

/// Push `tasks` no-op tasks through a running engine and spin until all
/// have completed. Retries submissions rejected with `QueueFull`.
///
/// Returns the number of submissions that had to be retried.
pub fn drain_profile(tq: &TaskQueue, tasks: u64) -> u64 {
    let done = Arc::new(AtomicU64::new(0));
    let mut rejected = 0;
    for _ in 0..tasks {
        loop {
            let done = Arc::clone(&done);
            let item = TaskItem::new(move |_| {
                done.fetch_add(1, Ordering::Relaxed);
                true
            });
            match tq.enqueue(item) {
                Ok(_) => break,
                Err(EngineError::QueueFull { .. }) => {
                    rejected += 1;
                    std::thread::yield_now();
                }
                Err(e) => panic!("bench engine rejected task: {e}"),
            }
        }
    }
    while done.load(Ordering::Relaxed) < tasks {
        std::thread::yield_now();
    }
    rejected
}

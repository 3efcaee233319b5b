//! Run two jobs asynchronously and wait for both to finish.
//!
//! ```text
//! $ RUST_LOG=debug cargo run -p formica-engine --example async_job
//! ```

use std::time::Duration;

use formica_engine::{TaskItem, TaskQueue, TaskStatus};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let tq = TaskQueue::init(10, 5)?;
    tq.start()?;

    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    for data in [1, 2] {
        let done_tx = done_tx.clone();
        let item = TaskItem::new(move |id| {
            tracing::info!(task = %id, data, "anything to do");
            true
        })
        .with_callback(move |id, status| {
            if status.is_terminal() {
                let _ = done_tx.send((id, status));
            }
            true
        });
        tq.enqueue(item)?;
    }
    drop(done_tx);

    for _ in 0..2 {
        let (id, status) = done_rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(status, TaskStatus::Success);
        tracing::info!(task = %id, %status, "job finished");
    }

    let report = tq.shutdown();
    tracing::info!(workers = report.workers_joined, "done");
    Ok(())
}

//! Core task types and identifiers for the Formica task queue.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the pool, queue, engine and FFI crates:
//! task identifiers, the task item handed to the engine, task status
//! notifications, and the runtime error type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod task;

pub use error::EngineError;
pub use id::{TaskId, MAX_TASK_IDS, TASK_ID_MASK};
pub use task::{StatusFn, TaskFn, TaskItem, TaskStatus};

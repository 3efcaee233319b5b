//! Runtime error type for calls into a running engine.

use std::error::Error;
use std::fmt;

/// Errors returned by `enqueue` and `cancel` on a running task queue.
///
/// Construction failures are reported separately by the engine's
/// `ConfigError`; task failures are never errors (they drive the retry
/// state machine instead).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// The id is negative or outside the id space.
    InvalidTaskId {
        /// The rejected raw id.
        id: i32,
    },
    /// The queue holds `capacity` pending tasks already.
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
    /// The engine has been shut down.
    ShutDown,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTaskId { id } => write!(f, "invalid task id {id}"),
            Self::QueueFull { capacity } => {
                write!(f, "task queue full ({capacity} pending tasks)")
            }
            Self::ShutDown => write!(f, "task queue has been shut down"),
        }
    }
}

impl Error for EngineError {}

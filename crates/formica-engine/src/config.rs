//! Engine configuration, validation, and construction errors.

use std::error::Error;
use std::fmt;

use formica_core::MAX_TASK_IDS;
use formica_queue::QueueError;

/// Hard upper bound on worker threads per engine.
pub const WORKER_LIMIT: usize = 30;

// ── EngineConfig ──────────────────────────────────────────────────

/// Construction parameters for a [`TaskQueue`](crate::TaskQueue).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of pending tasks. Must be in `1..=MAX_TASK_IDS`.
    pub capacity: usize,
    /// Number of worker threads. Must be in `1..=WORKER_LIMIT`.
    pub worker_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            worker_count: 4,
        }
    }
}

impl EngineConfig {
    /// Configuration with the given capacity and worker count.
    pub fn new(capacity: usize, worker_count: usize) -> Self {
        Self {
            capacity,
            worker_count,
        }
    }

    /// Check both values against their compile-time bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_TASK_IDS {
            return Err(ConfigError::CapacityOutOfRange {
                value: self.capacity,
                max: MAX_TASK_IDS,
            });
        }
        if self.worker_count == 0 || self.worker_count > WORKER_LIMIT {
            return Err(ConfigError::WorkerCountOutOfRange {
                value: self.worker_count,
                max: WORKER_LIMIT,
            });
        }
        Ok(())
    }
}

// ── ConfigError ───────────────────────────────────────────────────

/// Errors detected while constructing an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Capacity is zero or exceeds the id space.
    CapacityOutOfRange {
        /// The rejected capacity.
        value: usize,
        /// Largest accepted capacity.
        max: usize,
    },
    /// Worker count is zero or exceeds [`WORKER_LIMIT`].
    WorkerCountOutOfRange {
        /// The rejected worker count.
        value: usize,
        /// Largest accepted worker count.
        max: usize,
    },
    /// Queue storage could not be laid out or bound.
    Queue(QueueError),
    /// The OS refused to start a worker thread. Workers already started
    /// have been joined.
    ThreadSpawnFailed {
        /// OS error text.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOutOfRange { value, max } => {
                write!(f, "capacity {value} out of range 1..={max}")
            }
            Self::WorkerCountOutOfRange { value, max } => {
                write!(f, "worker count {value} out of range 1..={max}")
            }
            Self::Queue(e) => write!(f, "queue storage: {e}"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "failed to spawn worker thread: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Queue(e) => Some(e),
            _ => None,
        }
    }
}

impl From<QueueError> for ConfigError {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.worker_count, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(EngineConfig::new(1, 1).validate().is_ok());
        assert!(EngineConfig::new(MAX_TASK_IDS, WORKER_LIMIT).validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        match EngineConfig::new(0, 1).validate() {
            Err(ConfigError::CapacityOutOfRange { value: 0, .. }) => {}
            other => panic!("expected CapacityOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn oversized_capacity_rejected() {
        match EngineConfig::new(MAX_TASK_IDS + 1, 1).validate() {
            Err(ConfigError::CapacityOutOfRange { max, .. }) => assert_eq!(max, MAX_TASK_IDS),
            other => panic!("expected CapacityOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn worker_count_bounds() {
        for workers in [0, WORKER_LIMIT + 1] {
            match EngineConfig::new(8, workers).validate() {
                Err(ConfigError::WorkerCountOutOfRange { value, max }) => {
                    assert_eq!(value, workers);
                    assert_eq!(max, WORKER_LIMIT);
                }
                other => panic!("expected WorkerCountOutOfRange, got {other:?}"),
            }
        }
    }

    #[test]
    fn queue_error_has_source() {
        let err = ConfigError::from(QueueError::CapacityOverflow);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("queue storage"));
    }
}

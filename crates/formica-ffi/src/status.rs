//! C-compatible status codes.
//!
//! [`FormicaStatus`] is a `repr(i32)` enum: `0` is success and every
//! error is negative. Conversions from the engine's error types are
//! provided.

use formica_engine::{ConfigError, EngineError};

/// Status code returned by every FFI function. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormicaStatus {
    /// Success.
    Ok = 0,
    /// Handle is zero, stale, or was never issued.
    InvalidHandle = -1,
    /// A pointer is null or a value is out of range.
    InvalidArgument = -2,
    /// The queue already holds `capacity` pending tasks.
    QueueFull = -3,
    /// A worker thread could not be started.
    ThreadSpawnFailed = -4,
    /// The engine is shutting down or has shut down.
    ShuttingDown = -5,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -6,
    /// Queue storage could not be allocated.
    AllocationFailed = -7,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&ConfigError> for FormicaStatus {
    fn from(e: &ConfigError) -> Self {
        match e {
            ConfigError::CapacityOutOfRange { .. } | ConfigError::WorkerCountOutOfRange { .. } => {
                FormicaStatus::InvalidArgument
            }
            ConfigError::Queue(_) => FormicaStatus::AllocationFailed,
            ConfigError::ThreadSpawnFailed { .. } => FormicaStatus::ThreadSpawnFailed,
        }
    }
}

impl From<&EngineError> for FormicaStatus {
    fn from(e: &EngineError) -> Self {
        match e {
            EngineError::InvalidTaskId { .. } => FormicaStatus::InvalidArgument,
            EngineError::QueueFull { .. } => FormicaStatus::QueueFull,
            EngineError::ShutDown => FormicaStatus::ShuttingDown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_is_zero_and_errors_negative() {
        assert_eq!(FormicaStatus::Ok as i32, 0);
        for s in [
            FormicaStatus::InvalidHandle,
            FormicaStatus::InvalidArgument,
            FormicaStatus::QueueFull,
            FormicaStatus::ThreadSpawnFailed,
            FormicaStatus::ShuttingDown,
            FormicaStatus::InternalError,
            FormicaStatus::AllocationFailed,
            FormicaStatus::Panicked,
        ] {
            assert!((s as i32) < 0, "{s:?}");
        }
    }

    #[test]
    fn config_errors_map() {
        let e = ConfigError::WorkerCountOutOfRange { value: 0, max: 30 };
        assert_eq!(FormicaStatus::from(&e), FormicaStatus::InvalidArgument);
        let e = ConfigError::ThreadSpawnFailed {
            reason: "no threads".into(),
        };
        assert_eq!(FormicaStatus::from(&e), FormicaStatus::ThreadSpawnFailed);
    }

    #[test]
    fn engine_errors_map() {
        assert_eq!(
            FormicaStatus::from(&EngineError::QueueFull { capacity: 4 }),
            FormicaStatus::QueueFull
        );
        assert_eq!(
            FormicaStatus::from(&EngineError::InvalidTaskId { id: -3 }),
            FormicaStatus::InvalidArgument
        );
        assert_eq!(
            FormicaStatus::from(&EngineError::ShutDown),
            FormicaStatus::ShuttingDown
        );
    }
}

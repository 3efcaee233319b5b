//! Queue error types.

use std::error::Error;
use std::fmt;

use formica_pool::PoolError;

/// Errors from sizing and binding a queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueError {
    /// The underlying pool rejected the layout or buffer.
    Pool(PoolError),
    /// `capacity + 1` node slots do not fit in `usize`.
    CapacityOverflow,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool(e) => write!(f, "node pool: {e}"),
            Self::CapacityOverflow => write!(f, "queue capacity overflows node count"),
        }
    }
}

impl Error for QueueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            Self::CapacityOverflow => None,
        }
    }
}

impl From<PoolError> for QueueError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

/// Returned by [`LockFreeQueue::enqueue`](crate::LockFreeQueue::enqueue)
/// when no node is free. Carries the value back to the caller.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Recover the rejected value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueFull(..)")
    }
}

impl<T> fmt::Display for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue full")
    }
}

impl<T> Error for QueueFull<T> {}

//! Pool error types.

use std::error::Error;
use std::fmt;

/// Errors from sizing, binding, and using a [`MemoryPool`](crate::MemoryPool).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// A fragment must hold at least one byte.
    ZeroValueBytes,
    /// A pool must hold at least one fragment.
    ZeroCapacity,
    /// `fragment_bytes * capacity` does not fit in `usize`, or the capacity
    /// exceeds what a 32-bit slot can name.
    SizeOverflow {
        /// Requested bytes per value.
        value_bytes: usize,
        /// Requested fragment count.
        capacity: usize,
    },
    /// The supplied buffer is smaller than the layout requires.
    BufferTooSmall {
        /// Bytes the layout needs.
        required: usize,
        /// Bytes the buffer has.
        provided: usize,
    },
    /// `bind` was called on a pool that already owns a buffer.
    AlreadyBound,
    /// The pool has no buffer.
    Unbound,
    /// Every fragment is allocated.
    Exhausted,
    /// The pointer or index does not name a fragment of this pool.
    ForeignPointer,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroValueBytes => write!(f, "value size must be at least one byte"),
            Self::ZeroCapacity => write!(f, "pool capacity must be at least one fragment"),
            Self::SizeOverflow {
                value_bytes,
                capacity,
            } => write!(
                f,
                "pool of {capacity} fragments of {value_bytes} bytes is too large"
            ),
            Self::BufferTooSmall { required, provided } => write!(
                f,
                "buffer too small: need {required} bytes, got {provided}"
            ),
            Self::AlreadyBound => write!(f, "pool is already bound to a buffer"),
            Self::Unbound => write!(f, "pool is not bound to a buffer"),
            Self::Exhausted => write!(f, "pool exhausted"),
            Self::ForeignPointer => write!(f, "pointer does not belong to this pool"),
        }
    }
}

impl Error for PoolError {}

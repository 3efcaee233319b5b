//! Queue sizing.

use formica_pool::PoolLayout;

use crate::error::QueueError;
use crate::raw::Node;

/// Geometry of a queue holding up to `capacity` values of type `T`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueLayout {
    capacity: usize,
    pool: PoolLayout,
}

impl QueueLayout {
    /// Layout for `capacity` values of `T`: a pool of `capacity + 1` nodes.
    pub fn new<T>(capacity: usize) -> Result<Self, QueueError> {
        Self::for_value_bytes(size_of::<Node<T>>(), capacity)
    }

    /// Layout for `capacity` nodes of `node_bytes` each, plus the sentinel.
    pub fn for_value_bytes(node_bytes: usize, capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::Pool(formica_pool::PoolError::ZeroCapacity));
        }
        let slots = capacity
            .checked_add(1)
            .ok_or(QueueError::CapacityOverflow)?;
        let pool = PoolLayout::new(node_bytes, slots)?;
        Ok(Self { capacity, pool })
    }

    /// Maximum number of values held at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Layout of the node pool (includes the sentinel slot).
    pub fn pool(&self) -> PoolLayout {
        self.pool
    }

    /// Buffer size the queue needs.
    pub fn total_bytes(&self) -> usize {
        self.pool.total_bytes()
    }
}

/// Buffer size for a queue of `capacity` values of `T`.
pub fn compute_size<T>(capacity: usize) -> Result<usize, QueueError> {
    QueueLayout::new::<T>(capacity).map(|l| l.total_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formica_pool::PoolError;

    #[test]
    fn reserves_sentinel_slot() {
        let layout = QueueLayout::new::<u64>(4).unwrap();
        assert_eq!(layout.capacity(), 4);
        assert_eq!(layout.pool().capacity(), 5);
        assert_eq!(
            layout.total_bytes(),
            layout.pool().fragment_bytes() * 5
        );
    }

    #[test]
    fn node_bytes_delegate_to_pool_sizing() {
        let layout = QueueLayout::for_value_bytes(4, 4).unwrap();
        assert_eq!(layout.total_bytes(), 40);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(
            compute_size::<u32>(0),
            Err(QueueError::Pool(PoolError::ZeroCapacity))
        );
    }

    #[test]
    fn overflow_rejected() {
        assert_eq!(
            QueueLayout::for_value_bytes(8, usize::MAX),
            Err(QueueError::CapacityOverflow)
        );
    }
}

//! Cancellation bitmap: one bit per task id.
//!
//! Cancellation is lazy. Setting a bit never touches the queue; a worker
//! tests the bit right after dequeuing and drops the task silently if it
//! is set. Enqueue clears the bit of every id it issues, so a stale
//! cancellation does not outlive the id's reuse.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use formica_core::{TaskId, TASK_ID_MASK};

const WORD_BITS: usize = u64::BITS as usize;

/// Lock-free set of cancelled task ids.
pub struct CancelSet {
    words: Box<[AtomicU64]>,
    bit_length: usize,
}

impl CancelSet {
    /// A set able to hold ids `0..bit_length`.
    pub fn new(bit_length: usize) -> Self {
        Self {
            words: (0..bit_length.div_ceil(WORD_BITS))
                .map(|_| AtomicU64::new(0))
                .collect(),
            bit_length,
        }
    }

    /// A set covering the whole task id space.
    pub fn for_id_space() -> Self {
        Self::new(TASK_ID_MASK as usize + 1)
    }

    fn locate(&self, id: TaskId) -> Option<(usize, u64)> {
        let index = id.index().filter(|&i| i < self.bit_length)?;
        Some((index / WORD_BITS, 1u64 << (index % WORD_BITS)))
    }

    /// Mark `id` cancelled. Returns `true` if it was not already marked;
    /// out-of-range ids are ignored and return `false`.
    pub fn insert(&self, id: TaskId) -> bool {
        let Some((word, mask)) = self.locate(id) else {
            return false;
        };
        self.words[word].fetch_or(mask, Ordering::Release) & mask == 0
    }

    /// Clear the mark on `id`.
    pub fn remove(&self, id: TaskId) {
        if let Some((word, mask)) = self.locate(id) {
            self.words[word].fetch_and(!mask, Ordering::Release);
        }
    }

    /// Whether `id` is marked cancelled.
    pub fn contains(&self, id: TaskId) -> bool {
        self.locate(id)
            .is_some_and(|(word, mask)| self.words[word].load(Ordering::Acquire) & mask != 0)
    }

    /// Number of addressable ids.
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// Number of ids currently marked. A snapshot under concurrency.
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }
}

impl fmt::Debug for CancelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSet")
            .field("bit_length", &self.bit_length)
            .field("marked", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_full_id_space() {
        let set = CancelSet::for_id_space();
        assert_eq!(set.bit_length(), 32768);
        assert!(set.insert(TaskId(0)));
        assert!(set.insert(TaskId(i16::MAX)));
        assert!(set.contains(TaskId(i16::MAX)));
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn insert_reports_first_marker() {
        let set = CancelSet::new(128);
        assert!(set.insert(TaskId(70)));
        assert!(!set.insert(TaskId(70)));
        assert!(set.contains(TaskId(70)));
        assert!(!set.contains(TaskId(71)));
    }

    #[test]
    fn remove_clears_only_target() {
        let set = CancelSet::new(128);
        set.insert(TaskId(5));
        set.insert(TaskId(6));
        set.remove(TaskId(5));
        assert!(!set.contains(TaskId(5)));
        assert!(set.contains(TaskId(6)));
    }

    #[test]
    fn out_of_range_and_negative_ignored() {
        let set = CancelSet::new(10);
        assert!(!set.insert(TaskId(10)));
        assert!(!set.insert(TaskId::INVALID));
        assert!(!set.contains(TaskId(10)));
        set.remove(TaskId::INVALID);
        assert_eq!(set.count(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            #[test]
            fn matches_hashset_model(
                ops in prop::collection::vec((any::<bool>(), 0i16..200), 1..300),
            ) {
                let set = CancelSet::new(200);
                let mut model = HashSet::new();
                for (insert, raw) in ops {
                    let id = TaskId(raw);
                    if insert {
                        prop_assert_eq!(set.insert(id), model.insert(raw));
                    } else {
                        set.remove(id);
                        model.remove(&raw);
                    }
                    prop_assert_eq!(set.contains(id), model.contains(&raw));
                }
                prop_assert_eq!(set.count(), model.len());
            }
        }
    }
}

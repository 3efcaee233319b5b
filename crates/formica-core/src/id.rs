//! Task identifiers and the bounded id space.

use std::fmt;

/// Largest valid task id, and the largest queue capacity an engine may
/// be configured with.
///
/// Ids are issued by masking a monotonically increasing counter with
/// [`TASK_ID_MASK`], so the id space is `0..=32767`.
pub const MAX_TASK_IDS: usize = i16::MAX as usize;

/// Mask applied to the issuing counter to fold it into the id space.
pub const TASK_ID_MASK: u32 = i16::MAX as u32;

/// Identifier of a submitted task.
///
/// Issued by the engine on enqueue and passed back to the task function
/// and every status callback. Valid ids are non-negative and bounded by
/// [`TASK_ID_MASK`]; [`TaskId::INVALID`] (`-1`) is never issued.
///
/// Ids wrap: after 32768 submissions the counter folds back onto ids
/// that were issued earlier. A cancellation aimed at a task that already
/// finished can therefore land on a later task that received the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub i16);

impl TaskId {
    /// The reserved "no task" id.
    pub const INVALID: TaskId = TaskId(-1);

    /// Fold a raw counter value into the id space.
    pub fn from_counter(counter: u32) -> Self {
        Self((counter & TASK_ID_MASK) as i16)
    }

    /// Whether this id can name an issued task.
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Position of this id in a per-id table (such as the cancellation
    /// bitmap), or `None` for negative ids.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i16> for TaskId {
    fn from(v: i16) -> Self {
        Self(v)
    }
}

impl From<TaskId> for i16 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_folds_into_id_space() {
        assert_eq!(TaskId::from_counter(1), TaskId(1));
        assert_eq!(TaskId::from_counter(32767), TaskId(32767));
        assert_eq!(TaskId::from_counter(32768), TaskId(0));
        assert_eq!(TaskId::from_counter(32769), TaskId(1));
        assert_eq!(TaskId::from_counter(u32::MAX), TaskId(32767));
    }

    #[test]
    fn invalid_id_has_no_index() {
        assert!(!TaskId::INVALID.is_valid());
        assert_eq!(TaskId::INVALID.index(), None);
        assert_eq!(TaskId(7).index(), Some(7));
    }

    #[test]
    fn display_prints_raw_value() {
        assert_eq!(TaskId(42).to_string(), "42");
        assert_eq!(TaskId::INVALID.to_string(), "-1");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn issued_ids_are_always_valid(counter in any::<u32>()) {
                let id = TaskId::from_counter(counter);
                prop_assert!(id.is_valid());
                prop_assert!(id.index().unwrap() <= MAX_TASK_IDS);
            }
        }
    }
}

//! `repr(C)` types shared with C callers.

use std::ffi::c_void;

use formica_core::{TaskId, TaskItem, TaskStatus};
use formica_engine::EngineMetrics;

/// Task function: receives the task id and the item's `arg`. Returns
/// `true` on success.
pub type FormicaTaskFn = extern "C" fn(id: i16, arg: *mut c_void) -> bool;

/// Status callback: receives the task id, a [`TaskStatus`] code
/// (0 = Ack, 1 = Success, 2 = Fail, 3 = Retry) and the item's `arg`.
/// Returning `false` on Ack or Retry aborts the task.
pub type FormicaStatusFn = extern "C" fn(id: i16, status: i32, arg: *mut c_void) -> bool;

/// A task submitted from C. Copied on enqueue; the engine never frees
/// `arg`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FormicaTaskItem {
    /// Required task function.
    pub task: Option<FormicaTaskFn>,
    /// Optional status callback.
    pub callback: Option<FormicaStatusFn>,
    /// Opaque argument passed to both functions, from worker threads.
    pub arg: *mut c_void,
    /// Extra attempts after the first failure. Must be non-negative.
    pub retry: i32,
}

/// Caller-owned `arg` pointer moved onto worker threads.
#[derive(Clone, Copy)]
struct TaskArg(*mut c_void);

// SAFETY: the C caller promises `arg` may be used from any worker thread
// for as long as the task can run; the engine only passes it back.
#[allow(unsafe_code)]
unsafe impl Send for TaskArg {}

impl TaskArg {
    // Closures call this rather than reading `.0`, so they capture the
    // whole `Send` wrapper instead of the bare pointer.
    fn get(self) -> *mut c_void {
        self.0
    }
}

impl FormicaTaskItem {
    /// Convert to an engine item. `None` if `task` is null or `retry`
    /// is negative.
    pub(crate) fn to_task_item(&self) -> Option<TaskItem> {
        let task = self.task?;
        let retry = u32::try_from(self.retry).ok()?;
        let arg = TaskArg(self.arg);

        let mut item = TaskItem::new(move |id: TaskId| task(id.0, arg.get())).with_retry(retry);
        if let Some(callback) = self.callback {
            item = item.with_callback(move |id: TaskId, status: TaskStatus| {
                callback(id.0, status as i32, arg.get())
            });
        }
        Some(item)
    }
}

/// Cumulative engine counters, mirrored from [`EngineMetrics`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormicaMetrics {
    /// Tasks accepted by enqueue.
    pub submitted: u64,
    /// Task function invocations, counting retries.
    pub executed: u64,
    /// Tasks finished with Success.
    pub succeeded: u64,
    /// Tasks finished with Fail.
    pub failed: u64,
    /// Retry re-submissions.
    pub retried: u64,
    /// Tasks dropped because their id was cancelled.
    pub cancelled: u64,
    /// Tasks dropped because a callback returned false.
    pub aborted: u64,
    /// Retries lost to a full queue.
    pub requeue_failures: u64,
    /// Task functions that panicked.
    pub task_panics: u64,
}

impl From<EngineMetrics> for FormicaMetrics {
    fn from(m: EngineMetrics) -> Self {
        Self {
            submitted: m.submitted,
            executed: m.executed,
            succeeded: m.succeeded,
            failed: m.failed,
            retried: m.retried,
            cancelled: m.cancelled,
            aborted: m.aborted,
            requeue_failures: m.requeue_failures,
            task_panics: m.task_panics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    extern "C" fn succeed(_: i16, _: *mut c_void) -> bool {
        true
    }

    extern "C" fn accept(_: i16, _: i32, _: *mut c_void) -> bool {
        true
    }

    fn item(task: Option<FormicaTaskFn>, retry: i32) -> FormicaTaskItem {
        FormicaTaskItem {
            task,
            callback: Some(accept),
            arg: ptr::null_mut(),
            retry,
        }
    }

    #[test]
    fn null_task_rejected() {
        assert!(item(None, 0).to_task_item().is_none());
    }

    #[test]
    fn negative_retry_rejected() {
        assert!(item(Some(succeed), -1).to_task_item().is_none());
    }

    #[test]
    fn conversion_keeps_retry_and_callback() {
        let mut converted = item(Some(succeed), 4).to_task_item().unwrap();
        assert_eq!(converted.retry(), 4);
        assert!(converted.has_callback());
        assert!(converted.run(TaskId(1)));
        assert!(converted.notify(TaskId(1), TaskStatus::Ack));
    }

    #[test]
    fn status_codes_match_c_contract() {
        assert_eq!(TaskStatus::Ack as i32, 0);
        assert_eq!(TaskStatus::Success as i32, 1);
        assert_eq!(TaskStatus::Fail as i32, 2);
        assert_eq!(TaskStatus::Retry as i32, 3);
    }
}

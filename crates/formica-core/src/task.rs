//! Task items and the status notifications delivered while they run.

use std::fmt;

use crate::id::TaskId;

/// Transition reported to a task's status callback.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// A worker picked the task up and is about to run it.
    Ack = 0,
    /// The task function returned `true`. Terminal.
    Success = 1,
    /// The task function returned `false` with no retries left, or a
    /// retry could not be re-submitted. Terminal.
    Fail = 2,
    /// The task function returned `false` and the task will be
    /// re-submitted to the tail of the queue.
    Retry = 3,
}

impl TaskStatus {
    /// Whether no further callbacks follow this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ack => "ack",
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Retry => "retry",
        };
        f.write_str(name)
    }
}

/// The work a task performs. Returns `true` on success.
///
/// The closure owns whatever argument the task needs. It may run more
/// than once when the task is retried, but never concurrently with itself.
pub type TaskFn = Box<dyn FnMut(TaskId) -> bool + Send>;

/// Status callback. Returning `false` from [`TaskStatus::Ack`] or
/// [`TaskStatus::Retry`] aborts the task; the return value of terminal
/// notifications is ignored.
pub type StatusFn = Box<dyn FnMut(TaskId, TaskStatus) -> bool + Send>;

/// A unit of work submitted to the engine.
///
/// Built with [`TaskItem::new`] and refined with
/// [`with_callback`](TaskItem::with_callback) and
/// [`with_retry`](TaskItem::with_retry).
pub struct TaskItem {
    task: TaskFn,
    callback: Option<StatusFn>,
    retry: u32,
}

impl TaskItem {
    /// Create an item that runs `task` once, without a status callback.
    pub fn new<F>(task: F) -> Self
    where
        F: FnMut(TaskId) -> bool + Send + 'static,
    {
        Self {
            task: Box::new(task),
            callback: None,
            retry: 0,
        }
    }

    /// Attach a status callback.
    pub fn with_callback<C>(mut self, callback: C) -> Self
    where
        C: FnMut(TaskId, TaskStatus) -> bool + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Allow `retry` additional attempts after the first failure.
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Remaining retry budget.
    pub fn retry(&self) -> u32 {
        self.retry
    }

    /// Whether a status callback is attached.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Install a callback that accepts every transition if none is set.
    ///
    /// After this call the item always carries a callback, so the worker
    /// loop never has to special-case its absence.
    pub fn ensure_callback(&mut self) {
        self.callback_mut();
    }

    fn callback_mut(&mut self) -> &mut StatusFn {
        self.callback.get_or_insert_with(|| Box::new(|_, _| true))
    }

    /// Run the task function.
    pub fn run(&mut self, id: TaskId) -> bool {
        (self.task)(id)
    }

    /// Deliver a status notification, installing the accepting callback
    /// first if the item has none.
    pub fn notify(&mut self, id: TaskId, status: TaskStatus) -> bool {
        (self.callback_mut())(id, status)
    }

    /// Spend one retry. Returns `false` if the budget was already empty.
    pub fn consume_retry(&mut self) -> bool {
        if self.retry == 0 {
            return false;
        }
        self.retry -= 1;
        true
    }
}

impl fmt::Debug for TaskItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskItem")
            .field("has_callback", &self.has_callback())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

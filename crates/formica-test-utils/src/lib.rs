//! Test utilities and task fixtures for Formica development.
//!
//! [`StatusRecorder`] captures every status notification a task emits
//! through a channel, so tests can block on the sequence instead of
//! sleeping. [`fixtures`] builds task closures that count invocations.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use formica_core::{TaskId, TaskStatus};

pub use fixtures::{counting_task, decrementing_task, failing_task, CallCounter};

/// One recorded notification.
pub type StatusEvent = (TaskId, TaskStatus);

/// Collects status notifications from any number of tasks.
///
/// Each callback handed out sends `(id, status)` on an unbounded channel
/// before returning its verdict.
pub struct StatusRecorder {
    tx: Sender<StatusEvent>,
    rx: Receiver<StatusEvent>,
}

impl StatusRecorder {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// A callback that records and accepts every transition.
    pub fn callback(&self) -> impl FnMut(TaskId, TaskStatus) -> bool + Send + 'static {
        self.callback_with(|_, _| true)
    }

    /// A callback that records every transition and answers with `decide`.
    pub fn callback_with<D>(&self, mut decide: D) -> impl FnMut(TaskId, TaskStatus) -> bool + Send + 'static
    where
        D: FnMut(TaskId, TaskStatus) -> bool + Send + 'static,
    {
        let tx = self.tx.clone();
        move |id, status| {
            let _ = tx.send((id, status));
            decide(id, status)
        }
    }

    /// A callback that rejects the `n`th notification of `status`
    /// (1-based) and accepts everything else.
    pub fn rejecting_nth(
        &self,
        status: TaskStatus,
        n: usize,
    ) -> impl FnMut(TaskId, TaskStatus) -> bool + Send + 'static {
        let mut seen = 0;
        self.callback_with(move |_, s| {
            if s == status {
                seen += 1;
                return seen != n;
            }
            true
        })
    }

    /// Next event, or `None` after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StatusEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Block until `terminals` terminal notifications have arrived and
    /// return everything received up to that point. Stops early after
    /// `timeout`.
    pub fn wait_for_terminals(&self, terminals: usize, timeout: Duration) -> Vec<StatusEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        let mut seen = 0;
        while seen < terminals {
            match self.rx.recv_deadline(deadline) {
                Ok(event) => {
                    if event.1.is_terminal() {
                        seen += 1;
                    }
                    events.push(event);
                }
                Err(_) => break,
            }
        }
        events
    }

    /// Everything received so far, without blocking.
    pub fn drain(&self) -> Vec<StatusEvent> {
        self.rx.try_iter().collect()
    }
}

impl Default for StatusRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statuses only, in arrival order.
pub fn statuses(events: &[StatusEvent]) -> Vec<TaskStatus> {
    events.iter().map(|&(_, s)| s).collect()
}

/// Poll `done` until it returns `true` or `timeout` passes. Returns the
/// final verdict.
pub fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    done()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_captures_in_order() {
        let rec = StatusRecorder::new();
        let mut cb = rec.callback();
        assert!(cb(TaskId(1), TaskStatus::Ack));
        assert!(cb(TaskId(1), TaskStatus::Success));
        let events = rec.wait_for_terminals(1, Duration::from_secs(1));
        assert_eq!(statuses(&events), [TaskStatus::Ack, TaskStatus::Success]);
    }

    #[test]
    fn rejecting_nth_rejects_once() {
        let rec = StatusRecorder::new();
        let mut cb = rec.rejecting_nth(TaskStatus::Retry, 2);
        assert!(cb(TaskId(3), TaskStatus::Retry));
        assert!(!cb(TaskId(3), TaskStatus::Retry));
        assert!(cb(TaskId(3), TaskStatus::Ack));
        assert_eq!(rec.drain().len(), 3);
    }

    #[test]
    fn wait_until_times_out() {
        assert!(!wait_until(Duration::from_millis(5), || false));
        assert!(wait_until(Duration::from_millis(5), || true));
    }
}

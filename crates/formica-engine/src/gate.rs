//! Suspend/resume and shutdown gate shared by workers and enqueuers.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct GateState {
    suspended: bool,
    shutdown: bool,
}

/// One mutex and condition variable guarding the suspended and shutdown
/// flags.
///
/// Workers fetch work only while holding the lock, and enqueuers signal
/// under the same lock. A push that lands between a worker's failed
/// fetch and its wait therefore cannot be missed.
#[derive(Debug)]
pub(crate) struct Gate {
    state: Mutex<GateState>,
    wake: Condvar,
}

impl Gate {
    pub(crate) fn new(suspended: bool) -> Self {
        Self {
            state: Mutex::new(GateState {
                suspended,
                shutdown: false,
            }),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `fetch` yields work while the gate is open, or until
    /// shutdown. `fetch` is only called while running and under the lock.
    pub(crate) fn wait_for<T>(&self, mut fetch: impl FnMut() -> Option<T>) -> Option<T> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if !state.suspended {
                if let Some(work) = fetch() {
                    return Some(work);
                }
            }
            state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stop handing out work. Tasks already fetched keep running.
    pub(crate) fn suspend(&self) {
        self.lock().suspended = true;
    }

    /// Resume handing out work and wake every waiting worker.
    pub(crate) fn resume(&self) {
        self.lock().suspended = false;
        self.wake.notify_all();
    }

    pub(crate) fn is_suspended(&self) -> bool {
        self.lock().suspended
    }

    /// Wake one waiting worker after new work was pushed.
    pub(crate) fn notify_one(&self) {
        let _state = self.lock();
        self.wake.notify_one();
    }

    /// Run `push` under the lock unless the gate is closed, then wake one
    /// worker. `None` means the gate was closed and `push` never ran.
    ///
    /// Shutdown closes under the same lock before draining, so anything
    /// pushed here is either fetched by a worker or drained.
    pub(crate) fn admit<T>(&self, push: impl FnOnce() -> T) -> Option<T> {
        let state = self.lock();
        if state.shutdown {
            return None;
        }
        let pushed = push();
        self.wake.notify_one();
        Some(pushed)
    }

    /// Close the gate for good and wake every worker so it can exit.
    /// Returns `true` on the first call.
    pub(crate) fn close(&self) -> bool {
        let first = !std::mem::replace(&mut self.lock().shutdown, true);
        self.wake.notify_all();
        first
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().shutdown
    }
}

//! Engine lifecycle and submission over the C ABI.
//!
//! Each engine sits behind an `Arc` in the global `QUEUES` table. The
//! table lock is held only for handle lookup, so calls on different
//! engines (and enqueues racing on the same engine) never serialise on
//! it.

use std::sync::{Arc, Mutex};

use formica_core::TaskId;
use formica_engine::TaskQueue;
use tracing::debug;

use crate::handle::HandleTable;
use crate::status::FormicaStatus;
use crate::types::{FormicaMetrics, FormicaTaskItem};

type QueueArc = Arc<TaskQueue>;

static QUEUES: Mutex<HandleTable<QueueArc>> = Mutex::new(HandleTable::new());

/// Clone the `Arc` behind a handle, briefly locking the table.
fn get_queue(handle: u64) -> Option<QueueArc> {
    QUEUES.lock().ok()?.get(handle).cloned()
}

macro_rules! queue_or_return {
    ($handle:expr) => {
        match get_queue($handle) {
            Some(q) => q,
            None => return FormicaStatus::InvalidHandle as i32,
        }
    };
}

/// Create an engine with `capacity` pending-task slots and `workers`
/// threads. The engine starts stopped; call `formica_start` to run tasks.
///
/// On success writes the engine handle to `handle_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn formica_init(capacity: usize, workers: usize, handle_out: *mut u64) -> i32 {
    ffi_guard!({
        if handle_out.is_null() {
            return FormicaStatus::InvalidArgument as i32;
        }
        let queue = match TaskQueue::init(capacity, workers) {
            Ok(q) => q,
            Err(e) => return FormicaStatus::from(&e) as i32,
        };
        let handle = ffi_lock!(QUEUES).insert(Arc::new(queue));
        debug!(handle, "engine registered");
        // SAFETY: handle_out is non-null and valid per caller contract.
        unsafe { *handle_out = handle };
        FormicaStatus::Ok as i32
    })
}

/// Shut an engine down and release it. Joins every worker; tasks still
/// queued are dropped without callbacks.
///
/// Must not be called from a task or callback running on the same engine.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn formica_term(handle: u64) -> i32 {
    ffi_guard!({
        let queue = {
            let mut table = ffi_lock!(QUEUES);
            let Some(queue) = table.remove(handle) else {
                return FormicaStatus::InvalidHandle as i32;
            };
            debug!(handle, live = table.len(), "engine unregistered");
            queue
        };
        queue.shutdown();
        FormicaStatus::Ok as i32
    })
}

/// Let workers pick up queued tasks.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn formica_start(handle: u64) -> i32 {
    ffi_guard!({
        let queue = queue_or_return!(handle);
        match queue.start() {
            Ok(()) => FormicaStatus::Ok as i32,
            Err(e) => FormicaStatus::from(&e) as i32,
        }
    })
}

/// Stop handing tasks to workers. Running tasks finish.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn formica_stop(handle: u64) -> i32 {
    ffi_guard!({
        let queue = queue_or_return!(handle);
        match queue.stop() {
            Ok(()) => FormicaStatus::Ok as i32,
            Err(e) => FormicaStatus::from(&e) as i32,
        }
    })
}

/// Submit a copy of `*item`. `item->task` must be non-null and
/// `item->retry` non-negative. On success writes the issued task id to
/// `id_out` when it is non-null.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn formica_enqueue(
    handle: u64,
    item: *const FormicaTaskItem,
    id_out: *mut i16,
) -> i32 {
    ffi_guard!({
        let queue = queue_or_return!(handle);
        if item.is_null() {
            return FormicaStatus::InvalidArgument as i32;
        }
        // SAFETY: item is non-null and points to a valid FormicaTaskItem
        // per caller contract.
        let item = unsafe { *item };
        let Some(task) = item.to_task_item() else {
            return FormicaStatus::InvalidArgument as i32;
        };
        match queue.enqueue(task) {
            Ok(id) => {
                if !id_out.is_null() {
                    // SAFETY: id_out is non-null and valid per caller contract.
                    unsafe { *id_out = id.0 };
                }
                FormicaStatus::Ok as i32
            }
            Err(e) => FormicaStatus::from(&e) as i32,
        }
    })
}

/// Cancel task `id` if no worker has picked it up yet.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn formica_cancel(handle: u64, id: i32) -> i32 {
    ffi_guard!({
        let queue = queue_or_return!(handle);
        let Ok(raw) = i16::try_from(id) else {
            return FormicaStatus::InvalidArgument as i32;
        };
        match queue.cancel(TaskId(raw)) {
            Ok(()) => FormicaStatus::Ok as i32,
            Err(e) => FormicaStatus::from(&e) as i32,
        }
    })
}

/// Write the engine's cumulative counters to `metrics_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn formica_metrics(handle: u64, metrics_out: *mut FormicaMetrics) -> i32 {
    ffi_guard!({
        let queue = queue_or_return!(handle);
        if metrics_out.is_null() {
            return FormicaStatus::InvalidArgument as i32;
        }
        // SAFETY: metrics_out is non-null and valid per caller contract.
        unsafe { *metrics_out = FormicaMetrics::from(queue.metrics()) };
        FormicaStatus::Ok as i32
    })
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use std::ffi::c_void;
    use std::ptr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use formica_test_utils::wait_until;

    use crate::types::FormicaTaskFn;

    const OK: i32 = FormicaStatus::Ok as i32;
    const TIMEOUT: Duration = Duration::from_secs(5);

    extern "C" fn bump(_: i16, arg: *mut c_void) -> bool {
        // SAFETY: tests pass a pointer to an AtomicU32 that outlives the engine.
        let counter = unsafe { &*(arg as *const AtomicU32) };
        counter.fetch_add(1, Ordering::SeqCst);
        true
    }

    extern "C" fn fail(_: i16, arg: *mut c_void) -> bool {
        // SAFETY: as in `bump`.
        let counter = unsafe { &*(arg as *const AtomicU32) };
        counter.fetch_add(1, Ordering::SeqCst);
        false
    }

    fn init(capacity: usize, workers: usize) -> u64 {
        let mut h = 0u64;
        assert_eq!(formica_init(capacity, workers, &mut h), OK);
        h
    }

    fn item(task: FormicaTaskFn, counter: &AtomicU32, retry: i32) -> FormicaTaskItem {
        FormicaTaskItem {
            task: Some(task),
            callback: None,
            arg: counter as *const AtomicU32 as *mut c_void,
            retry,
        }
    }

    #[test]
    fn lifecycle_round_trip() {
        let h = init(8, 2);
        assert_eq!(formica_start(h), OK);
        assert_eq!(formica_stop(h), OK);
        assert_eq!(formica_term(h), OK);
        assert_eq!(formica_start(h), FormicaStatus::InvalidHandle as i32);
        assert_eq!(formica_term(h), FormicaStatus::InvalidHandle as i32);
    }

    #[test]
    fn init_validates_arguments() {
        let mut h = 0u64;
        assert_eq!(
            formica_init(0, 1, &mut h),
            FormicaStatus::InvalidArgument as i32
        );
        assert_eq!(
            formica_init(4, 0, &mut h),
            FormicaStatus::InvalidArgument as i32
        );
        assert_eq!(
            formica_init(4, 1, ptr::null_mut()),
            FormicaStatus::InvalidArgument as i32
        );
        assert_eq!(h, 0);
    }

    #[test]
    fn zero_handle_is_invalid() {
        assert_eq!(formica_start(0), FormicaStatus::InvalidHandle as i32);
        assert_eq!(formica_cancel(0, 1), FormicaStatus::InvalidHandle as i32);
    }

    #[test]
    fn enqueue_runs_task_and_reports_id() {
        let counter = AtomicU32::new(0);
        let h = init(4, 1);
        let it = item(bump, &counter, 0);
        let mut id = -1i16;
        assert_eq!(formica_enqueue(h, &it, &mut id), OK);
        assert_eq!(id, 1);
        assert_eq!(formica_start(h), OK);
        assert!(wait_until(TIMEOUT, || counter.load(Ordering::SeqCst) == 1));
        assert_eq!(formica_term(h), OK);
    }

    #[test]
    fn retries_run_through_c_callbacks() {
        let counter = AtomicU32::new(0);
        let h = init(4, 2);
        assert_eq!(formica_start(h), OK);
        let it = item(fail, &counter, 3);
        assert_eq!(formica_enqueue(h, &it, ptr::null_mut()), OK);
        let mut m = FormicaMetrics::default();
        assert!(wait_until(TIMEOUT, || {
            formica_metrics(h, &mut m) == OK && m.failed == 1
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(m.retried, 3);
        assert_eq!(formica_term(h), OK);
    }

    #[test]
    fn enqueue_rejects_bad_items() {
        let counter = AtomicU32::new(0);
        let h = init(4, 1);
        assert_eq!(
            formica_enqueue(h, ptr::null(), ptr::null_mut()),
            FormicaStatus::InvalidArgument as i32
        );
        let mut no_task = item(bump, &counter, 0);
        no_task.task = None;
        assert_eq!(
            formica_enqueue(h, &no_task, ptr::null_mut()),
            FormicaStatus::InvalidArgument as i32
        );
        let negative = item(bump, &counter, -2);
        assert_eq!(
            formica_enqueue(h, &negative, ptr::null_mut()),
            FormicaStatus::InvalidArgument as i32
        );
        assert_eq!(formica_term(h), OK);
    }

    #[test]
    fn full_queue_reported() {
        let counter = AtomicU32::new(0);
        let h = init(1, 1);
        let it = item(bump, &counter, 0);
        assert_eq!(formica_enqueue(h, &it, ptr::null_mut()), OK);
        assert_eq!(
            formica_enqueue(h, &it, ptr::null_mut()),
            FormicaStatus::QueueFull as i32
        );
        assert_eq!(formica_term(h), OK);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_validates_id_range() {
        let h = init(2, 1);
        assert_eq!(formica_cancel(h, -1), FormicaStatus::InvalidArgument as i32);
        assert_eq!(
            formica_cancel(h, i32::from(i16::MAX) + 1),
            FormicaStatus::InvalidArgument as i32
        );
        assert_eq!(formica_cancel(h, 5), OK);
        assert_eq!(formica_term(h), OK);
    }

    #[test]
    fn cancelled_task_never_runs() {
        let counter = AtomicU32::new(0);
        let h = init(4, 1);
        let it = item(bump, &counter, 0);
        let mut id = 0i16;
        assert_eq!(formica_enqueue(h, &it, &mut id), OK);
        assert_eq!(formica_cancel(h, i32::from(id)), OK);
        assert_eq!(formica_start(h), OK);
        let mut m = FormicaMetrics::default();
        assert!(wait_until(TIMEOUT, || {
            formica_metrics(h, &mut m) == OK && m.cancelled == 1
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(formica_term(h), OK);
    }
}

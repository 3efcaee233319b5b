//! C FFI bindings for the Formica task queue.
//!
//! Exposes the engine lifecycle (`formica_init`, `formica_term`,
//! `formica_start`, `formica_stop`) and task submission
//! (`formica_enqueue`, `formica_cancel`) through a C ABI. Engines live
//! in a global handle table; C code holds opaque `uint64_t` handles.
//! Every entry point returns a [`FormicaStatus`] code and catches panics
//! before they can unwind into C. This crate is one of three that may
//! contain `unsafe` code (along with `formica-pool` and `formica-queue`).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, turning a panic into [`FormicaStatus::Panicked`].
macro_rules! ffi_guard {
    ($body:block) => {
        match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(status) => status,
            Err(_) => {
                ::tracing::error!("panic caught at FFI boundary");
                $crate::status::FormicaStatus::Panicked as i32
            }
        }
    };
}

/// Lock a mutex or return [`FormicaStatus::InternalError`] if poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::FormicaStatus::InternalError as i32,
        }
    };
}

mod handle;
pub mod queue;
pub mod status;
pub mod types;

pub use queue::{
    formica_cancel, formica_enqueue, formica_init, formica_metrics, formica_start, formica_stop,
    formica_term,
};
pub use status::FormicaStatus;
pub use types::{FormicaMetrics, FormicaTaskItem};

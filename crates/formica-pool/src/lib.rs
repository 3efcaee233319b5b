//! Lock-free fixed-block memory pool for the Formica task queue.
//!
//! A [`MemoryPool`] carves a caller-supplied [`PoolBuffer`] into
//! `capacity` equally sized fragments and hands them out through a
//! compare-and-swap free list. Allocation and release are O(1), never
//! block, and are safe to call from any number of threads. This crate
//! is one of two that may contain `unsafe` code (along with
//! `formica-queue`), and all of it lives in `raw.rs`.
//!
//! # Architecture
//!
//! ```text
//! MemoryPool
//! ├── PoolLayout      (value_bytes, capacity, fragment_bytes)
//! ├── PoolBuffer      (owned, 8-byte aligned backing storage)
//! ├── links[capacity] (AtomicU32 per fragment: next free slot)
//! └── head            (AtomicTagged: slot + generation counter)
//! ```
//!
//! # Packed references
//!
//! Every free-list word is a [`Tagged`] pair: a 32-bit slot (fragment
//! index + 1, with 0 meaning "none") and a 32-bit counter that is bumped
//! on every successful head swing. Both halves share one `AtomicU64`, so
//! a single CAS compares pointer and counter together and a recycled
//! fragment can never satisfy a stale comparison. The address-based
//! compactor ([`compact::pack`] / [`compact::unpack`]) squeezes a native
//! pointer into 32 bits relative to a base address.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod compact;
pub mod error;
pub mod layout;
pub mod pool;
mod raw;

pub use buffer::PoolBuffer;
pub use compact::{AtomicTagged, Tagged};
pub use error::PoolError;
pub use layout::{compute_size, PoolLayout, FRAGMENT_ALIGN};
pub use pool::MemoryPool;

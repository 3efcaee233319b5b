//! Lock-free bounded MPMC queue for Formica.
//!
//! [`LockFreeQueue`] is the Michael & Scott two-pointer queue with its nodes
//! carved from a [`MemoryPool`](formica_pool::MemoryPool) sized for
//! `capacity + 1` nodes (one permanent sentinel). Head, tail and every
//! node's `next` link are [`Tagged`](formica_pool::Tagged) words, so each
//! CAS compares slot and generation counter together.
//!
//! Values are moved in and out, never copied: `enqueue` takes ownership and
//! `dequeue` hands it back. A full queue returns the rejected value inside
//! [`QueueFull`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod error;
pub mod layout;
pub mod queue;
mod raw;

pub use error::{QueueError, QueueFull};
pub use layout::{compute_size, QueueLayout};
pub use queue::LockFreeQueue;

#![warn(missing_debug_implementations, rust_2018_idioms)]

//! Backpressure-free building blocks for event pipelines.
//!
//! Freeflow provides two independent primitives for decoupling producers from
//! consumers without ever making a producer wait on a slow consumer:
//!
//! - [`unbounded`]: an async channel whose background dispatcher task buffers
//!   without limit, delivers in send order, and drains everything sent before
//!   its one-shot close.
//! - [`queue`]: a lock-free, multi-producer multi-consumer FIFO queue
//!   (Michael–Scott) with epoch-based node reclamation and node reuse.

pub mod error;

pub mod queue;
pub mod unbounded;

// Internal utilities - not part of public API but exposed for crate use
mod internal;

pub use error::{CloseError, SendError, TryRecvError};
pub use queue::Queue;
pub use unbounded::{Receiver, Sender, Unbounded, UnboundedBuilder};

// Helper function to check if a type is Send + Sync.
#[allow(dead_code)]
fn assert_send_sync<T: Send + Sync>() {}

#[allow(dead_code)]
fn primitives_are_send_sync() {
  assert_send_sync::<Queue<String>>();
  assert_send_sync::<Unbounded<String>>();
  assert_send_sync::<Sender<String>>();
  assert_send_sync::<Receiver<String>>();
}

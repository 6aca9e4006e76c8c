// src/unbounded/mod.rs

//! An unbounded channel that never pushes back on its producers.
//!
//! The channel is a pair of small bounded staging channels joined by a
//! dispatcher task. The dispatcher owns an internal buffer of unlimited size:
//! it keeps pulling values off the send side while offering the oldest
//! buffered value to the receive side, so a slow or momentarily busy consumer
//! never stalls a producer.
//!
//! The channel is closed exactly once, by its owner. Values sent before the
//! close are still delivered, in order, before receivers observe the end of the
//! stream; sending afterwards is a misuse reported as [`SendError::Closed`].
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use freeflow::unbounded::Unbounded;
//!
//! let ch = Unbounded::new();
//! let tx = ch.send_endpoint();
//! let rx = ch.receive_endpoint();
//!
//! for i in 0..3 {
//!   tx.send(i).await.unwrap();
//! }
//! ch.close().unwrap();
//!
//! assert_eq!(rx.recv().await, Some(0));
//! assert_eq!(rx.recv().await, Some(1));
//! assert_eq!(rx.recv().await, Some(2));
//! assert_eq!(rx.recv().await, None);
//! # }
//! ```

mod backlog;
mod dispatcher;
mod endpoints;

pub use crate::error::{CloseError, SendError, TryRecvError};
pub use endpoints::{Receiver, Sender};

use backlog::Backlog;
use dispatcher::Dispatcher;
use endpoints::ChannelState;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tracing::{debug, warn};

/// Slots in each staging channel. Values are small handles, so sixteen of
/// them stay within a couple of cache lines.
pub const DEFAULT_STAGING_CAPACITY: usize = 16;
/// Initial size of the dispatcher's buffer, and the size it is reset to after
/// a burst.
pub const DEFAULT_BLOCK_CAPACITY: usize = 1 << 10;
/// Spare capacity beyond one block that a drained buffer may keep before it is
/// reallocated.
pub const DEFAULT_SHRINK_THRESHOLD: usize = 1 << 5;

/// Configures and spawns an [`Unbounded`] channel.
#[derive(Debug, Clone)]
pub struct UnboundedBuilder {
  staging_capacity: usize,
  block_capacity: usize,
  shrink_threshold: usize,
}

impl Default for UnboundedBuilder {
  fn default() -> Self {
    UnboundedBuilder {
      staging_capacity: DEFAULT_STAGING_CAPACITY,
      block_capacity: DEFAULT_BLOCK_CAPACITY,
      shrink_threshold: DEFAULT_SHRINK_THRESHOLD,
    }
  }
}

impl UnboundedBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Slots in the staging channels on either side of the dispatcher. Clamped
  /// to at least one.
  pub fn staging_capacity(mut self, capacity: usize) -> Self {
    self.staging_capacity = capacity.max(1);
    self
  }

  /// Capacity the dispatcher's buffer is allocated with. Clamped to at least
  /// one.
  pub fn block_capacity(mut self, capacity: usize) -> Self {
    self.block_capacity = capacity.max(1);
    self
  }

  /// How much spare capacity beyond one block a drained buffer may keep.
  pub fn shrink_threshold(mut self, threshold: usize) -> Self {
    self.shrink_threshold = threshold;
    self
  }

  /// Builds the channel, spawning its dispatcher on the current tokio runtime.
  ///
  /// # Panics
  ///
  /// Panics if called outside of a tokio runtime, like `tokio::spawn`.
  pub fn build<T: Send + 'static>(self) -> Unbounded<T> {
    self.build_on(&Handle::current())
  }

  /// Builds the channel, spawning its dispatcher on `handle`.
  pub fn build_on<T: Send + 'static>(self, handle: &Handle) -> Unbounded<T> {
    let (inbound_tx, inbound_rx) = mpsc::channel(self.staging_capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(self.staging_capacity);
    let (close_tx, close_rx) = oneshot::channel();

    let backlog = Backlog::new(self.block_capacity, self.shrink_threshold);
    handle.spawn(Dispatcher::new(inbound_rx, outbound_tx, close_rx, backlog).run());
    debug!(
      staging = self.staging_capacity,
      block = self.block_capacity,
      "unbounded channel created"
    );

    Unbounded {
      inbound: inbound_tx,
      outbound: Arc::new(AsyncMutex::new(outbound_rx)),
      close: Mutex::new(Some(close_tx)),
      state: Arc::new(ChannelState::default()),
    }
  }
}

/// An unbounded channel with a background dispatcher. See the
/// [module docs](self).
///
/// The `Unbounded` value is the owner: it hands out endpoints and is the only
/// thing that can close the channel. Dropping it without calling
/// [`close`](Self::close) closes the channel the same way.
///
/// Buffered values stay put while the owner lives, even if every [`Receiver`]
/// has been dropped: a receiver handed out later picks up where the last one
/// left off.
pub struct Unbounded<T> {
  inbound: mpsc::Sender<T>,
  outbound: Arc<AsyncMutex<mpsc::Receiver<T>>>,
  close: Mutex<Option<oneshot::Sender<()>>>,
  state: Arc<ChannelState>,
}

impl<T: Send + 'static> Unbounded<T> {
  /// Creates a channel with default settings on the current tokio runtime.
  ///
  /// # Panics
  ///
  /// Panics if called outside of a tokio runtime.
  pub fn new() -> Self {
    UnboundedBuilder::default().build()
  }

  /// Creates a channel with default settings on the given runtime.
  pub fn with_handle(handle: &Handle) -> Self {
    UnboundedBuilder::default().build_on(handle)
  }
}

impl<T> Unbounded<T> {
  /// Returns a handle for sending values into the channel.
  pub fn send_endpoint(&self) -> Sender<T> {
    Sender {
      inbound: self.inbound.clone(),
      state: Arc::clone(&self.state),
    }
  }

  /// Returns a handle for receiving values from the channel.
  pub fn receive_endpoint(&self) -> Receiver<T> {
    Receiver {
      outbound: Arc::clone(&self.outbound),
    }
  }

  /// Closes the channel.
  ///
  /// Sends made after this returns fail with [`SendError::Closed`]. Values
  /// already sent are still delivered, in order, and receivers see `None` after
  /// the last of them. This returns immediately; draining happens in the
  /// dispatcher. Closing twice is a misuse and yields [`CloseError`].
  pub fn close(&self) -> Result<(), CloseError> {
    if !self.state.mark_closed() {
      warn!("close called on an already closed unbounded channel");
      return Err(CloseError);
    }
    if let Some(close) = self.close.lock().take() {
      // The dispatcher only exits after a close request, so it is still there.
      let _ = close.send(());
    }
    debug!("unbounded channel close requested");
    Ok(())
  }

  /// Returns `true` once [`close`](Self::close) has been called.
  pub fn is_closed(&self) -> bool {
    self.state.is_closed()
  }
}

impl<T> Drop for Unbounded<T> {
  fn drop(&mut self) {
    // Dropping the close sender is itself a close request to the dispatcher.
    if self.state.mark_closed() {
      debug!("unbounded channel dropped without close, draining");
    }
  }
}

impl<T> fmt::Debug for Unbounded<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Unbounded")
      .field("closed", &self.state.is_closed())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn delivers_in_send_order() {
    let ch = Unbounded::new();
    let tx = ch.send_endpoint();
    let rx = ch.receive_endpoint();
    for i in 0..100 {
      tx.send(i).await.unwrap();
    }
    for i in 0..100 {
      assert_eq!(rx.recv().await, Some(i));
    }
  }

  #[tokio::test]
  async fn buffers_far_beyond_staging_capacity() {
    let ch = UnboundedBuilder::new().staging_capacity(1).block_capacity(2).build();
    let tx = ch.send_endpoint();
    // Nobody reads while sending: the dispatcher must absorb all of it.
    for i in 0..5_000u32 {
      tx.send(i).await.unwrap();
    }
    ch.close().unwrap();

    let rx = ch.receive_endpoint();
    let mut expected = 0;
    while let Some(v) = rx.recv().await {
      assert_eq!(v, expected);
      expected += 1;
    }
    assert_eq!(expected, 5_000);
  }

  #[tokio::test]
  async fn close_twice_is_reported() {
    let ch = Unbounded::<u8>::new();
    assert!(!ch.is_closed());
    assert_eq!(ch.close(), Ok(()));
    assert!(ch.is_closed());
    assert_eq!(ch.close(), Err(CloseError));
  }

  #[tokio::test]
  async fn send_after_close_returns_value() {
    let ch = Unbounded::new();
    let tx = ch.send_endpoint();
    ch.close().unwrap();
    assert!(tx.is_closed());
    assert_eq!(tx.send("late").await, Err(SendError::Closed("late")));
  }

  #[tokio::test]
  async fn try_recv_reports_empty_then_disconnected() {
    let ch = Unbounded::new();
    let tx = ch.send_endpoint();
    let rx = ch.receive_endpoint();
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

    tx.send(9).await.unwrap();
    let got = tokio::time::timeout(Duration::from_secs(1), async {
      loop {
        match rx.try_recv() {
          Ok(v) => break v,
          Err(TryRecvError::Empty) => tokio::task::yield_now().await,
          Err(TryRecvError::Disconnected) => panic!("disconnected early"),
        }
      }
    })
    .await
    .unwrap();
    assert_eq!(got, 9);

    ch.close().unwrap();
    assert_eq!(rx.recv().await, None);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
  }

  #[tokio::test]
  async fn builder_clamps_zero_capacities() {
    let builder = UnboundedBuilder::new().staging_capacity(0).block_capacity(0);
    assert_eq!(builder.staging_capacity, 1);
    assert_eq!(builder.block_capacity, 1);
    let ch = builder.build();
    let tx = ch.send_endpoint();
    let rx = ch.receive_endpoint();
    tx.send(1).await.unwrap();
    tx.send(2).await.unwrap();
    assert_eq!(rx.recv().await, Some(1));
    assert_eq!(rx.recv().await, Some(2));
  }
}

// src/unbounded/endpoints.rs

use crate::error::{SendError, TryRecvError};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::warn;

/// State shared between the owner of a channel and its send endpoints.
#[derive(Debug, Default)]
pub(crate) struct ChannelState {
  closed: AtomicBool,
}

impl ChannelState {
  #[inline]
  pub(crate) fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  /// Flips the channel to closed. Returns `false` if it already was.
  #[inline]
  pub(crate) fn mark_closed(&self) -> bool {
    !self.closed.swap(true, Ordering::AcqRel)
  }
}

/// The write half of an [`Unbounded`](super::Unbounded) channel.
///
/// Cloning is cheap; every clone feeds the same dispatcher.
pub struct Sender<T> {
  pub(crate) inbound: mpsc::Sender<T>,
  pub(crate) state: Arc<ChannelState>,
}

impl<T> Sender<T> {
  /// Hands `value` to the channel.
  ///
  /// This only waits for a free slot in the small staging area in front of the
  /// dispatcher, never for a receiver. It fails only when the owner has already
  /// closed the channel, which is a bug in the calling code.
  pub async fn send(&self, value: T) -> Result<(), SendError<T>> {
    if self.state.is_closed() {
      return Err(misuse(value));
    }
    self.inbound.send(value).await.map_err(|e| misuse(e.0))
  }

  /// Synchronous variant of [`send`](Self::send) for producers outside of an
  /// async context.
  ///
  /// # Panics
  ///
  /// Panics if called from within an asynchronous execution context, like
  /// `tokio::sync::mpsc::Sender::blocking_send`.
  pub fn blocking_send(&self, value: T) -> Result<(), SendError<T>> {
    if self.state.is_closed() {
      return Err(misuse(value));
    }
    self.inbound.blocking_send(value).map_err(|e| misuse(e.0))
  }

  /// Returns `true` once the owner has closed the channel.
  pub fn is_closed(&self) -> bool {
    self.state.is_closed()
  }
}

#[cold]
fn misuse<T>(value: T) -> SendError<T> {
  warn!("send attempted on a closed unbounded channel");
  SendError::Closed(value)
}

impl<T> Clone for Sender<T> {
  fn clone(&self) -> Self {
    Sender {
      inbound: self.inbound.clone(),
      state: Arc::clone(&self.state),
    }
  }
}

impl<T> fmt::Debug for Sender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Sender")
      .field("closed", &self.state.is_closed())
      .finish_non_exhaustive()
  }
}

/// The read half of an [`Unbounded`](super::Unbounded) channel.
///
/// Clones share one stream of values: each value is delivered to exactly one
/// caller, and concurrent callers are served one at a time in the order they
/// started waiting.
pub struct Receiver<T> {
  pub(crate) outbound: Arc<AsyncMutex<mpsc::Receiver<T>>>,
}

impl<T> Receiver<T> {
  /// Waits for the next value.
  ///
  /// Returns `None` once the channel has been closed and every value sent
  /// before the close has been delivered.
  pub async fn recv(&self) -> Option<T> {
    self.outbound.lock().await.recv().await
  }

  /// Synchronous variant of [`recv`](Self::recv).
  ///
  /// # Panics
  ///
  /// Panics if called from within an asynchronous execution context.
  pub fn blocking_recv(&self) -> Option<T> {
    self.outbound.blocking_lock().blocking_recv()
  }

  /// Takes a value if one is ready right now.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    let mut outbound = self.outbound.try_lock().map_err(|_| TryRecvError::Empty)?;
    outbound.try_recv().map_err(|e| match e {
      mpsc::error::TryRecvError::Empty => TryRecvError::Empty,
      mpsc::error::TryRecvError::Disconnected => TryRecvError::Disconnected,
    })
  }

  /// Turns this handle into a [`Stream`] that ends with the channel.
  pub fn into_stream(self) -> impl Stream<Item = T> {
    futures_util::stream::unfold(self, |rx| async move {
      let value = rx.recv().await?;
      Some((value, rx))
    })
  }
}

impl<T> Clone for Receiver<T> {
  fn clone(&self) -> Self {
    Receiver {
      outbound: Arc::clone(&self.outbound),
    }
  }
}

impl<T> fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Receiver").finish_non_exhaustive()
  }
}

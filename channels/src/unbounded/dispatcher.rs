// src/unbounded/dispatcher.rs

//! The task that owns an unbounded channel's buffer.
//!
//! Senders hand values to the dispatcher through a small bounded staging
//! channel; the dispatcher appends them to its [`Backlog`] and feeds the
//! receive side through a second small staging channel. Nothing but this task
//! ever touches the backlog, so it needs no synchronization.

use super::backlog::Backlog;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

pub(crate) struct Dispatcher<T> {
  inbound: mpsc::Receiver<T>,
  outbound: mpsc::Sender<T>,
  close: oneshot::Receiver<()>,
  backlog: Backlog<T>,
  accepted: u64,
  delivered: u64,
  discarded: u64,
}

enum Step<T> {
  Received(Option<T>),
  Delivered,
  Close,
  Idle,
}

impl<T: Send + 'static> Dispatcher<T> {
  pub(crate) fn new(
    inbound: mpsc::Receiver<T>,
    outbound: mpsc::Sender<T>,
    close: oneshot::Receiver<()>,
    backlog: Backlog<T>,
  ) -> Self {
    Dispatcher {
      inbound,
      outbound,
      close,
      backlog,
      accepted: 0,
      delivered: 0,
      discarded: 0,
    }
  }

  /// Runs the forwarding loop until close is requested, then drains.
  pub(crate) async fn run(mut self) {
    debug!("unbounded channel dispatcher started");

    loop {
      let step = tokio::select! {
        received = self.inbound.recv() => Step::Received(received),
        // The owner holds the receive side for as long as it lives, so this
        // only fails once the owner is gone and a close is already pending.
        permit = self.outbound.reserve(), if !self.backlog.is_empty() => match permit {
          Ok(permit) => match self.backlog.pop_front() {
            Some(value) => {
              permit.send(value);
              Step::Delivered
            }
            None => Step::Idle,
          },
          Err(_) => Step::Close,
        },
        // Either an explicit close or the owner being dropped.
        _ = &mut self.close => Step::Close,
      };

      match step {
        Step::Received(Some(value)) => self.accept(value),
        // Every send handle, the owner's included, is gone.
        Step::Received(None) | Step::Close => break,
        Step::Delivered => self.delivered += 1,
        Step::Idle => {}
      }

      if self.backlog.is_empty() {
        self.backlog.recycle();
      }
    }

    self.drain().await;
  }

  fn accept(&mut self, value: T) {
    self.accepted += 1;
    self.backlog.push(value);
  }

  /// Stops intake, flushes whatever is still staged on the send side, then
  /// hands every buffered value to the receivers in order. The outbound
  /// sender is dropped at the end, which is what receivers observe as
  /// end-of-stream once they have read the last value.
  async fn drain(mut self) {
    self.inbound.close();
    while let Some(value) = self.inbound.recv().await {
      self.accept(value);
    }
    debug!(pending = self.backlog.len(), "unbounded channel draining");

    while let Some(value) = self.backlog.pop_front() {
      if self.outbound.send(value).await.is_err() {
        let dropped = 1 + self.backlog.discard();
        self.discarded += dropped as u64;
        debug!(dropped, "receivers dropped while draining");
        break;
      }
      self.delivered += 1;
    }

    debug!(
      accepted = self.accepted,
      delivered = self.delivered,
      discarded = self.discarded,
      "unbounded channel dispatcher stopped"
    );
  }
}

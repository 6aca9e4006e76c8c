// src/unbounded/backlog.rs

use std::collections::VecDeque;

use tracing::trace;

/// The dispatcher's private buffer of values waiting for a receiver.
///
/// Storage is allocated in blocks. Once a burst has been fully delivered, a
/// buffer that grew past one block plus the shrink threshold is thrown away and
/// replaced by a fresh block, so a single spike does not pin its peak memory
/// for the rest of the channel's life.
#[derive(Debug)]
pub(crate) struct Backlog<T> {
  items: VecDeque<T>,
  block_capacity: usize,
  shrink_threshold: usize,
}

impl<T> Backlog<T> {
  pub(crate) fn new(block_capacity: usize, shrink_threshold: usize) -> Self {
    Backlog {
      items: VecDeque::with_capacity(block_capacity),
      block_capacity,
      shrink_threshold,
    }
  }

  #[inline]
  pub(crate) fn push(&mut self, value: T) {
    self.items.push_back(value);
  }

  #[inline]
  pub(crate) fn pop_front(&mut self) -> Option<T> {
    self.items.pop_front()
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.items.len()
  }

  /// Drops every pending value, returning how many there were.
  pub(crate) fn discard(&mut self) -> usize {
    let dropped = self.items.len();
    self.items.clear();
    dropped
  }

  /// Swaps an oversized, empty buffer for a fresh block.
  pub(crate) fn recycle(&mut self) {
    if self.items.is_empty() && self.items.capacity() > self.block_capacity + self.shrink_threshold {
      trace!(
        retained = self.items.capacity(),
        block = self.block_capacity,
        "reallocating drained backlog"
      );
      self.items = VecDeque::with_capacity(self.block_capacity);
    }
  }

  #[cfg(test)]
  fn capacity(&self) -> usize {
    self.items.capacity()
  }
}

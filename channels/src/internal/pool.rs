// src/internal/pool.rs

//! A small, bounded free list of heap allocations.
//!
//! The pool only ever uses `try_lock`: when another thread is already inside,
//! `take` reports a miss and `give` frees the allocation instead of waiting.
//! Callers therefore never block on it, which keeps the lock-free guarantees
//! of whoever uses it intact. Reuse is purely an allocation optimization.

use std::fmt;

use parking_lot::Mutex;

pub(crate) const DEFAULT_POOL_CAPACITY: usize = 256;

pub(crate) struct NodePool<N> {
  free: Mutex<Vec<Box<N>>>,
  capacity: usize,
}

impl<N> NodePool<N> {
  pub(crate) fn new(capacity: usize) -> Self {
    NodePool {
      free: Mutex::new(Vec::with_capacity(capacity.min(DEFAULT_POOL_CAPACITY))),
      capacity,
    }
  }

  /// Returns a recycled allocation, or `None` if the pool is empty or busy.
  #[inline]
  pub(crate) fn take(&self) -> Option<Box<N>> {
    self.free.try_lock()?.pop()
  }

  /// Hands an allocation back. It is dropped if the pool is full or busy.
  #[inline]
  pub(crate) fn give(&self, node: Box<N>) {
    if let Some(mut free) = self.free.try_lock() {
      if free.len() < self.capacity {
        free.push(node);
      }
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.free.lock().len()
  }
}

impl<N> fmt::Debug for NodePool<N> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NodePool")
      .field("capacity", &self.capacity)
      .finish_non_exhaustive()
  }
}

// src/queue/mod.rs

//! An unbounded, lock-free, multi-producer multi-consumer FIFO queue.
//!
//! This is the Michael–Scott queue: a singly linked list anchored by a sentinel
//! node, with `head` pointing at the sentinel and `tail` pointing at the last
//! node (or, while an enqueue is half done, the one before it). Any thread that
//! observes a lagging `tail` helps move it forward, so a thread stalled between
//! its two CAS steps never blocks the others.
//!
//! Removed sentinels are reclaimed through `crossbeam-epoch`: a retired node is
//! only recycled into the queue's node pool once every thread that might still
//! hold a pointer to it has left its epoch.
//!
//! ```
//! use freeflow::queue::Queue;
//!
//! let q = Queue::new();
//! q.enqueue("a");
//! q.enqueue("b");
//! assert_eq!(q.len(), 2);
//! assert_eq!(q.dequeue(), Some("a"));
//! assert_eq!(q.dequeue(), Some("b"));
//! assert_eq!(q.dequeue(), None);
//! ```

use crate::internal::pool::{NodePool, DEFAULT_POOL_CAPACITY};

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use crossbeam_utils::{Backoff, CachePadded};

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

struct Node<T> {
  /// Initialized for every node except the sentinel. Ownership of the value
  /// passes to whichever dequeue makes this node the new sentinel.
  value: MaybeUninit<T>,
  next: Atomic<Node<T>>,
}

impl<T> Node<T> {
  fn sentinel() -> Self {
    Node {
      value: MaybeUninit::uninit(),
      next: Atomic::null(),
    }
  }
}

/// A lock-free unbounded FIFO queue. See the [module docs](self).
pub struct Queue<T> {
  head: CachePadded<Atomic<Node<T>>>,
  tail: CachePadded<Atomic<Node<T>>>,
  // Signed so that a dequeue overtaking its enqueuer's increment cannot wrap.
  len: AtomicIsize,
  pool: Arc<NodePool<Node<T>>>,
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
  /// Creates an empty queue holding only its sentinel node.
  pub fn new() -> Self {
    Self::with_pool_capacity(DEFAULT_POOL_CAPACITY)
  }

  /// Creates an empty queue that keeps at most `capacity` retired nodes
  /// around for reuse. A capacity of zero disables node reuse.
  pub fn with_pool_capacity(capacity: usize) -> Self {
    let sentinel = Owned::new(Node::sentinel());
    // SAFETY: the queue is not shared yet, nothing can observe the sentinel.
    let sentinel = sentinel.into_shared(unsafe { epoch::unprotected() });
    Queue {
      head: CachePadded::new(Atomic::from(sentinel)),
      tail: CachePadded::new(Atomic::from(sentinel)),
      len: AtomicIsize::new(0),
      pool: Arc::new(NodePool::new(capacity)),
    }
  }

  /// Appends `value` at the tail. Never fails and never blocks.
  pub fn enqueue(&self, value: T) {
    let guard = &epoch::pin();
    self.push(value, guard);
  }

  /// Removes and returns the oldest value, or `None` if the queue is empty.
  pub fn dequeue(&self) -> Option<T> {
    let guard = &epoch::pin();
    self.pop(guard)
  }

  /// Approximate number of values in the queue.
  ///
  /// The counter is updated after the structural change it reflects, so under
  /// concurrent use it may briefly lag. Once all operations have returned it is
  /// exact.
  pub fn len(&self) -> usize {
    self.len.load(Ordering::Acquire).max(0) as usize
  }

  /// Returns `true` if the queue holds no values at this instant.
  ///
  /// Unlike [`len`](Self::len) this inspects the list itself.
  pub fn is_empty(&self) -> bool {
    let guard = &epoch::pin();
    let head = self.head.load(Ordering::Acquire, guard);
    // SAFETY: head is never null and the guard keeps it alive.
    unsafe { head.deref() }.next.load(Ordering::Acquire, guard).is_null()
  }

  fn node_for(&self, value: T) -> Owned<Node<T>> {
    match self.pool.take() {
      Some(mut node) => {
        node.value = MaybeUninit::new(value);
        node.next = Atomic::null();
        Owned::from(node)
      }
      None => Owned::new(Node {
        value: MaybeUninit::new(value),
        next: Atomic::null(),
      }),
    }
  }

  fn push(&self, value: T, guard: &Guard) {
    let node = self.node_for(value).into_shared(guard);
    let backoff = Backoff::new();

    loop {
      let tail = self.tail.load(Ordering::Acquire, guard);
      // SAFETY: tail is never null and the guard keeps it alive.
      let tail_ref = unsafe { tail.deref() };
      let next = tail_ref.next.load(Ordering::Acquire, guard);

      if tail != self.tail.load(Ordering::Acquire, guard) {
        continue;
      }

      if next.is_null() {
        if tail_ref
          .next
          .compare_exchange(Shared::null(), node, Ordering::Release, Ordering::Relaxed, guard)
          .is_ok()
        {
          // Losing this race only means someone already swung the tail for us.
          let _ = self
            .tail
            .compare_exchange(tail, node, Ordering::Release, Ordering::Relaxed, guard);
          self.len.fetch_add(1, Ordering::Release);
          return;
        }
      } else {
        // Tail is lagging behind a half-finished enqueue; help it along.
        let _ = self
          .tail
          .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
      }
      backoff.snooze();
    }
  }

  fn pop(&self, guard: &Guard) -> Option<T> {
    let backoff = Backoff::new();

    loop {
      let head = self.head.load(Ordering::Acquire, guard);
      let tail = self.tail.load(Ordering::Acquire, guard);
      // SAFETY: head is never null and the guard keeps it alive.
      let next = unsafe { head.deref() }.next.load(Ordering::Acquire, guard);

      if head != self.head.load(Ordering::Acquire, guard) {
        continue;
      }

      if head == tail {
        if next.is_null() {
          return None;
        }
        let _ = self
          .tail
          .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
      } else if self
        .head
        .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
        .is_ok()
      {
        // SAFETY: winning the CAS makes `next` the new sentinel and hands us
        // sole ownership of its value; sentinel values are never read again.
        // `next` stays allocated at least until our guard is dropped.
        let value = unsafe { ptr::read(next.deref().value.as_ptr()) };
        self.len.fetch_sub(1, Ordering::Release);

        let pool = Arc::clone(&self.pool);
        // SAFETY: `head` is unlinked. Other threads may still be reading it,
        // so it only goes back to the pool once their epochs have advanced.
        // Its value slot is already moved out (or was never written), so
        // recycling or freeing the box never touches a `T`.
        unsafe {
          guard.defer_unchecked(move || pool.give(head.into_owned().into_box()));
        }
        return Some(value);
      }
      backoff.snooze();
    }
  }
}

impl<T> Default for Queue<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Drop for Queue<T> {
  fn drop(&mut self) {
    // SAFETY: `&mut self` proves no other thread can touch the list, so an
    // unprotected guard is sound and deferred closures run immediately.
    unsafe {
      let guard = epoch::unprotected();
      while self.pop(guard).is_some() {}
      let sentinel = self.head.load(Ordering::Relaxed, guard);
      drop(sentinel.into_owned());
    }
  }
}

impl<T> fmt::Debug for Queue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Queue")
      .field("len", &self.len())
      .field("pooled_nodes", &self.pool.len())
      .finish_non_exhaustive()
  }
}

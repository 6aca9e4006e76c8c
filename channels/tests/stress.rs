mod common;
use common::*;

use freeflow::queue::Queue;
use freeflow::unbounded::Unbounded;

use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[serial]
async fn unbounded_stress_thousands_of_producers_and_consumers() {
  init_tracing();
  let ch = Unbounded::new();
  let producers = 2000;
  let consumers = 1000;
  let per_producer = 10;
  let received = Arc::new(AtomicUsize::new(0));
  let checksum = Arc::new(AtomicUsize::new(0));

  let mut consumer_handles = Vec::with_capacity(consumers);
  for _ in 0..consumers {
    let rx = ch.receive_endpoint();
    let received = received.clone();
    let checksum = checksum.clone();
    consumer_handles.push(tokio::spawn(async move {
      while let Some(v) = rx.recv().await {
        received.fetch_add(1, Ordering::Relaxed);
        checksum.fetch_add(v, Ordering::Relaxed);
      }
    }));
  }

  let mut producer_handles = Vec::with_capacity(producers);
  for p in 0..producers {
    let tx = ch.send_endpoint();
    producer_handles.push(tokio::spawn(async move {
      for i in 0..per_producer {
        tx.send(p * per_producer + i).await.unwrap();
      }
    }));
  }

  tokio::time::timeout(STRESS_TIMEOUT, async {
    for h in producer_handles {
      h.await.unwrap();
    }
    ch.close().unwrap();
    for h in consumer_handles {
      h.await.unwrap();
    }
  })
  .await
  .expect("unbounded channel stress run deadlocked");

  let total = producers * per_producer;
  assert_eq!(received.load(Ordering::Relaxed), total);
  assert_eq!(checksum.load(Ordering::Relaxed), total * (total - 1) / 2);
}

#[test]
#[serial]
fn queue_stress_many_producers_and_consumers() {
  let q = Arc::new(Queue::new());
  let threads = 64;
  let per_thread = 20_000;
  let dequeued = Arc::new(AtomicUsize::new(0));
  let checksum = Arc::new(AtomicUsize::new(0));

  let handles: Vec<_> = (0..threads)
    .map(|t| {
      let q = q.clone();
      let dequeued = dequeued.clone();
      let checksum = checksum.clone();
      thread::spawn(move || {
        for i in 0..per_thread {
          if t % 2 == 0 {
            q.enqueue(t * per_thread + i);
          } else if let Some(v) = q.dequeue() {
            dequeued.fetch_add(1, Ordering::Relaxed);
            checksum.fetch_add(v, Ordering::Relaxed);
          }
          if i % 64 == 0 {
            thread::yield_now();
          }
        }
      })
    })
    .collect();
  for h in handles {
    h.join().unwrap();
  }

  while let Some(v) = q.dequeue() {
    dequeued.fetch_add(1, Ordering::Relaxed);
    checksum.fetch_add(v, Ordering::Relaxed);
  }

  let expected_sum: usize = (0..threads)
    .filter(|t| t % 2 == 0)
    .flat_map(|t| (0..per_thread).map(move |i| t * per_thread + i))
    .sum();
  assert_eq!(dequeued.load(Ordering::Relaxed), threads / 2 * per_thread);
  assert_eq!(checksum.load(Ordering::Relaxed), expected_sum);
  assert_eq!(q.len(), 0);
}

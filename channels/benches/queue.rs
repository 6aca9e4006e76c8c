// benches/queue.rs

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use freeflow::queue::Queue;
use std::sync::{Arc, Barrier};
use std::thread;

const ITEMS: usize = 100_000;

fn bench_single_thread(c: &mut Criterion) {
  let mut group = c.benchmark_group("queue/single_thread");
  group.throughput(Throughput::Elements(ITEMS as u64));
  group.bench_function("enqueue_then_dequeue", |b| {
    let q = Queue::new();
    b.iter(|| {
      for i in 0..ITEMS {
        q.enqueue(i);
      }
      while q.dequeue().is_some() {}
    });
  });
  group.finish();
}

fn bench_mpmc(c: &mut Criterion) {
  let mut group = c.benchmark_group("queue/mpmc");
  group.throughput(Throughput::Elements(ITEMS as u64));
  for pairs in [1usize, 2, 4] {
    group.bench_with_input(BenchmarkId::from_parameter(pairs), &pairs, |b, &pairs| {
      b.iter(|| {
        let q = Arc::new(Queue::new());
        let barrier = Arc::new(Barrier::new(pairs * 2));
        let per_thread = ITEMS / pairs;
        let mut handles = Vec::with_capacity(pairs * 2);
        for _ in 0..pairs {
          let (q, barrier) = (q.clone(), barrier.clone());
          handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..per_thread {
              q.enqueue(i);
            }
          }));
          let (q, barrier) = (q.clone(), barrier.clone());
          handles.push(thread::spawn(move || {
            barrier.wait();
            let mut taken = 0;
            while taken < per_thread {
              if q.dequeue().is_some() {
                taken += 1;
              } else {
                std::hint::spin_loop();
              }
            }
          }));
        }
        for h in handles {
          h.join().unwrap();
        }
      });
    });
  }
  group.finish();
}

criterion_group!(benches, bench_single_thread, bench_mpmc);
criterion_main!(benches);

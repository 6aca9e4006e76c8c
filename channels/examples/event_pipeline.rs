// examples/event_pipeline.rs
//
// An input source that must never stall feeds a deliberately slow consumer
// through an unbounded channel, while a worker pool shares a lock-free queue.

use freeflow::queue::Queue;
use freeflow::unbounded::Unbounded;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
enum Event {
  Key(char),
  Click { x: i32, y: i32 },
}

#[tokio::main]
async fn main() {
  println!("--- Unbounded channel: fast producer, slow consumer ---");
  {
    let ch = Unbounded::new();
    let events = ch.send_endpoint();
    let rx = ch.receive_endpoint();

    let consumer = tokio::spawn(async move {
      let (mut handled, mut keys, mut travel) = (0, 0, 0);
      while let Some(event) = rx.recv().await {
        if handled < 3 {
          println!("[Consumer] Handling {:?}", event);
        }
        match event {
          Event::Key(c) if c.is_ascii_lowercase() => keys += 1,
          Event::Key(_) => {}
          Event::Click { x, y } => travel += x.abs() + y.abs(),
        }
        tokio::time::sleep(Duration::from_micros(50)).await;
        handled += 1;
      }
      println!("[Consumer] {} key presses, {} pixels of click travel", keys, travel);
      handled
    });

    let started = Instant::now();
    for i in 0..500 {
      let event = if i % 2 == 0 {
        Event::Key(char::from(b'a' + (i % 26) as u8))
      } else {
        Event::Click { x: i, y: -i }
      };
      events.send(event).await.expect("channel closed early");
    }
    println!("[Producer] Sent 500 events in {:?} without waiting on the consumer", started.elapsed());

    ch.close().expect("closed twice");
    println!("[Consumer] Handled {} events before end-of-stream", consumer.await.unwrap());
  }

  println!("\n--- Lock-free queue: producer threads, worker threads ---");
  {
    let jobs = Arc::new(Queue::new());
    let producers: Vec<_> = (0..4)
      .map(|p| {
        let jobs = jobs.clone();
        thread::spawn(move || {
          for j in 0..250 {
            jobs.enqueue(p * 1000 + j);
          }
        })
      })
      .collect();
    for p in producers {
      p.join().unwrap();
    }
    println!("[Queue] {} jobs queued", jobs.len());

    let workers: Vec<_> = (0..3)
      .map(|_| {
        let jobs = jobs.clone();
        thread::spawn(move || {
          let mut done = 0;
          while jobs.dequeue().is_some() {
            done += 1;
          }
          done
        })
      })
      .collect();
    let total: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    println!("[Queue] Workers processed {} jobs, {} left", total, jobs.len());
  }
}

//! C3 — bounded worker pool.
//!
//! A fixed N OS threads draining one bounded FIFO, per spec.md §4.3. This generalizes
//! `ryanseipp-rask-old`'s `worker::Worker`/`crossbeam_channel` pairing: there, one
//! `Worker` per thread blocked on `Receiver::recv()` for `Event<S>` items; here the
//! pool owns the channel and the join handles so shutdown can drain and join cleanly.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// A unit of work: a boxed closure pairing one phase (read or write) with one
/// connection handle, per spec.md §3's "work item". Each item runs to completion with
/// no suspension (spec.md §4.3).
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads consuming a bounded FIFO of [`WorkItem`]s.
pub struct WorkerPool {
    sender: Sender<WorkItem>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `num_workers` threads, each looping on `recv()` from a FIFO bounded at
    /// `queue_capacity`. Submissions beyond capacity block the producer (the reactor),
    /// per spec.md §4.3's "producers block" policy.
    pub fn new(num_workers: usize, queue_capacity: usize) -> Self {
        assert!(num_workers > 0, "worker pool requires at least one thread");
        let (sender, receiver) = bounded::<WorkItem>(queue_capacity.max(1));

        let handles = (0..num_workers)
            .map(|i| spawn_worker(i, receiver.clone()))
            .collect();

        Self { sender, handles }
    }

    /// Submits a work item, blocking if the queue is full. Panics if every worker has
    /// already exited (i.e. after [`WorkerPool::shutdown`] has been called) — the
    /// reactor must not submit after initiating shutdown.
    pub fn submit(&self, item: WorkItem) {
        self.sender
            .send(item)
            .expect("worker pool submission after shutdown");
    }

    /// Stops accepting new work, lets every already-queued item drain, then joins every
    /// worker thread. Matches spec.md §4.3's "all pending items drain first; new
    /// submissions are rejected" shutdown contract.
    pub fn shutdown(self) {
        drop(self.sender);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn spawn_worker(index: usize, receiver: Receiver<WorkItem>) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("reactord-worker-{index}"))
        .spawn(move || {
            while let Ok(item) = receiver.recv() {
                if std::panic::catch_unwind(std::panic::AssertUnwindSafe(item)).is_err() {
                    tracing::error!(worker = index, "work item panicked, worker continuing");
                }
            }
            tracing::debug!(worker = index, "worker pool thread exiting, queue drained");
        })
        .expect("failed to spawn worker thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn submitted_items_run_exactly_once() {
        let pool = WorkerPool::new(4, 16);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = counter.clone();
            pool.submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        pool.shutdown();
        assert_eq!(100, counter.load(Ordering::SeqCst));
    }

    #[test]
    fn panicking_item_does_not_kill_the_worker() {
        let pool = WorkerPool::new(1, 8);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit(Box::new(|| panic!("boom")));

        let after = counter.clone();
        pool.submit(Box::new(move || {
            after.fetch_add(1, Ordering::SeqCst);
        }));

        pool.shutdown();
        assert_eq!(1, counter.load(Ordering::SeqCst));
    }

    #[test]
    fn shutdown_drains_pending_items_before_joining() {
        let pool = WorkerPool::new(1, 8);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let counter = counter.clone();
            pool.submit(Box::new(move || {
                thread::sleep(Duration::from_millis(1));
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        pool.shutdown();
        assert_eq!(8, counter.load(Ordering::SeqCst));
    }
}

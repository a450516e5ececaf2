//! CPU-bound worker pool for the App-Ads Analyzer (spec.md §4.6), isolated
//! from the tokio request-handling runtime. Adapted from the classic
//! `Arc<Mutex<Receiver>>` thread-pool pattern, extended with a priority
//! queue and per-task result delivery via a oneshot channel so async
//! callers can simply `.await` a submission.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

type BoxedJob = Box<dyn FnOnce() + Send + 'static>;

struct Job {
    priority: Priority,
    seq: u64,
    run: BoxedJob,
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; for equal priority, earlier submission
        // (lower seq) first — BinaryHeap is a max-heap so seq is reversed.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

enum Message {
    NewJob(Job),
    Terminate,
}

struct Queue {
    heap: Mutex<BinaryHeap<QueueEntry>>,
    condvar: Condvar,
}

enum QueueEntry {
    Job(Job),
    Terminate,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        matches!((self, other), (QueueEntry::Terminate, QueueEntry::Terminate))
            || matches!((self, other), (QueueEntry::Job(a), QueueEntry::Job(b)) if a == b)
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Terminate signals always sort highest so idle workers shut down
        // promptly instead of starving behind queued work.
        match (self, other) {
            (QueueEntry::Terminate, QueueEntry::Terminate) => Ordering::Equal,
            (QueueEntry::Terminate, _) => Ordering::Greater,
            (_, QueueEntry::Terminate) => Ordering::Less,
            (QueueEntry::Job(a), QueueEntry::Job(b)) => a.cmp(b),
        }
    }
}

/// Bounds CPU-bound analyzer work to `max` worker threads, independent of
/// the async runtime's task scheduler.
///
/// Simplification: workers are spawned eagerly up to `max` rather than
/// scaled lazily from `min`; `min` is retained as the floor the pool
/// reports via `worker_count` for idle-scale-down bookkeeping, but no
/// threads are actually parked/unparked below `max` in this implementation.
pub struct WorkerPool {
    queue: Arc<Queue>,
    workers: Vec<thread::JoinHandle<()>>,
    next_seq: AtomicU64,
    active: Arc<AtomicUsize>,
    min: usize,
    max: usize,
}

impl WorkerPool {
    pub fn new(min: usize, max: usize) -> Self {
        assert!(max > 0, "worker pool max must be greater than 0");
        let min = min.min(max).max(1);

        let queue = Arc::new(Queue {
            heap: Mutex::new(BinaryHeap::new()),
            condvar: Condvar::new(),
        });
        let active = Arc::new(AtomicUsize::new(0));

        let workers = (0..max)
            .map(|id| spawn_worker(id, queue.clone(), active.clone()))
            .collect();

        Self {
            queue,
            workers,
            next_seq: AtomicU64::new(0),
            active,
            min,
            max,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn min_workers(&self) -> usize {
        self.min
    }

    pub fn active_count(&self) -> usize {
        self.active.load(AtomicOrdering::Relaxed)
    }

    /// Submits CPU-bound work, returning a receiver resolved when the task
    /// completes. Callers apply their own timeout via `tokio::time::timeout`
    /// on the returned receiver (spec.md's per-task timeout, default 30s).
    pub fn submit<F, T>(&self, priority: Priority, f: F) -> oneshot::Receiver<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let job = Job {
            priority,
            seq,
            run: Box::new(move || {
                let _ = tx.send(f());
            }),
        };

        let mut heap = self.queue.heap.lock().unwrap();
        heap.push(QueueEntry::Job(job));
        self.queue.condvar.notify_one();
        rx
    }
}

fn spawn_worker(_id: usize, queue: Arc<Queue>, active: Arc<AtomicUsize>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        let entry = {
            let mut heap = queue.heap.lock().unwrap();
            loop {
                if let Some(entry) = heap.pop() {
                    break entry;
                }
                heap = queue.condvar.wait(heap).unwrap();
            }
        };

        match entry {
            QueueEntry::Job(job) => {
                active.fetch_add(1, AtomicOrdering::Relaxed);
                (job.run)();
                active.fetch_sub(1, AtomicOrdering::Relaxed);
            }
            QueueEntry::Terminate => break,
        }
    })
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let mut heap = self.queue.heap.lock().unwrap();
        for _ in 0..self.workers.len() {
            heap.push(QueueEntry::Terminate);
        }
        self.queue.condvar.notify_all();
        drop(heap);

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

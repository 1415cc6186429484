//! Bounded queues and a small worker pool for the daemon's single-threaded
//! cooperative event loop plus bounded worker tasks (hashing large files,
//! computing proofs). Backpressure drops a watcher notification for a path
//! already queued, keeping only the latest state.

use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// A bounded multi-producer single-consumer queue. `send` never blocks
/// indefinitely past the bound; callers needing backpressure feedback use
/// `try_send`.
pub struct BoundedQueue<T> {
    tx: SyncSender<T>,
    rx: Mutex<Receiver<T>>,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = sync_channel(capacity.max(1));
        Self { tx, rx: Mutex::new(rx) }
    }

    pub fn sender(&self) -> SyncSender<T> {
        self.tx.clone()
    }

    pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
        self.tx.try_send(item)
    }

    pub fn recv(&self) -> Option<T> {
        self.rx.lock().expect("queue mutex poisoned").recv().ok()
    }
}

/// Deduplicates watcher notifications by path: a new notification for a path
/// already queued overwrites the pending one rather than growing the queue.
pub struct DedupQueue<K, V> {
    pending: Mutex<HashMap<K, V>>,
}

impl<K: std::hash::Hash + Eq + Clone, V> DedupQueue<K, V> {
    pub fn new() -> Self {
        Self { pending: Mutex::new(HashMap::new()) }
    }

    pub fn push(&self, key: K, value: V) {
        self.pending.lock().expect("dedup queue mutex poisoned").insert(key, value);
    }

    pub fn drain(&self) -> Vec<(K, V)> {
        self.pending
            .lock()
            .expect("dedup queue mutex poisoned")
            .drain()
            .collect()
    }
}

impl<K: std::hash::Hash + Eq + Clone, V> Default for DedupQueue<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// A small fixed-size pool of worker threads draining a shared bounded
/// queue of closures. Used for long operations (hashing, proof generation)
/// kept off the event loop's own thread. Owns the only sender, so dropping
/// it on `shutdown` is what lets workers observe the channel closing and
/// exit — a worker loop can never hold the sender that would unblock it.
pub struct WorkerPool {
    tx: SyncSender<Job>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(size: usize, capacity: usize) -> Self {
        let (tx, rx) = sync_channel::<Job>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let handles = (0..size.max(1))
            .map(|_| {
                let rx = Arc::clone(&rx);
                std::thread::spawn(move || loop {
                    let job = rx.lock().expect("worker pool mutex poisoned").recv();
                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                })
            })
            .collect();
        Self { tx, handles }
    }

    pub fn submit(&self, job: Job) -> Result<(), TrySendError<Job>> {
        self.tx.try_send(job)
    }

    pub fn shutdown(self) {
        drop(self.tx);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn bounded_queue_round_trips() {
        let q: BoundedQueue<i32> = BoundedQueue::new(4);
        q.sender().send(7).unwrap();
        assert_eq!(q.recv(), Some(7));
    }

    #[test]
    fn dedup_queue_keeps_latest_per_key() {
        let q: DedupQueue<String, i32> = DedupQueue::new();
        q.push("a.txt".into(), 1);
        q.push("a.txt".into(), 2);
        let drained = q.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].1, 2);
    }

    #[test]
    fn worker_pool_runs_submitted_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::spawn(2, 8);
        for _ in 0..5 {
            let c = Arc::clone(&counter);
            pool.submit(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}

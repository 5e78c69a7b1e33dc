//! Pending-candidate queue

use tokio::sync::{Mutex, MutexGuard};

/// Mutex-guarded FIFO of values waiting on an external precondition
///
/// Enqueue and drain share one lock, so a drain observes every prior
/// enqueue in order and no enqueue can interleave with a running drain.
pub(crate) struct PendingQueue<T> {
    queue: Mutex<Vec<T>>,
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
        }
    }

    pub async fn push(&self, value: T) {
        self.queue.lock().await.push(value);
    }

    /// Take the lock for a flush; the caller drains the guard in place
    pub async fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.queue.lock().await
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

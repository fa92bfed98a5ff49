//! Bounded multi-consumer task queue
//!
//! The submission loop is the only producer; every worker pulls from the same
//! receiver. The receiver sits behind an async mutex so that each item is
//! handed to exactly one worker. `push` waits while the queue is full, which
//! is the run's backpressure point.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::error::{BenchError, BenchResult};
use crate::task::QueueItem;

/// Create a queue holding at most `capacity` items
///
/// # Panics
/// Panics if `capacity` is zero, like [`tokio::sync::mpsc::channel`].
pub fn task_queue(capacity: usize) -> (TaskQueue, TaskReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        TaskQueue { tx },
        TaskReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side, owned by the dispatch engine
#[derive(Debug)]
pub struct TaskQueue {
    tx: mpsc::Sender<QueueItem>,
}

impl TaskQueue {
    /// Enqueue an item, waiting for space if the queue is full
    ///
    /// Fails once every [`TaskReceiver`] has been dropped.
    pub async fn push(&self, item: QueueItem) -> BenchResult<()> {
        self.tx
            .send(item)
            .await
            .map_err(|_| BenchError::queue_closed())
    }

    /// Number of items currently waiting
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Check if no item is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of waiting items
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Check if every consumer is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, cloned into every worker
#[derive(Debug, Clone)]
pub struct TaskReceiver {
    rx: Arc<Mutex<mpsc::Receiver<QueueItem>>>,
}

impl TaskReceiver {
    /// Take the next item
    ///
    /// Returns `None` once the producer is dropped and the queue is empty.
    pub async fn pull(&self) -> Option<QueueItem> {
        self.rx.lock().await.recv().await
    }
}

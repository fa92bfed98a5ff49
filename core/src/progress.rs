//! Completion tracking shared by the dispatch engine and its workers

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Lifecycle phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Spawning workers
    Starting,
    /// Admitting tasks into the queue
    Submitting,
    /// Waiting for every submitted task to be acknowledged
    Draining,
    /// Sending one shutdown sentinel per worker and joining them
    ShuttingDown,
    /// All workers joined
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Starting => write!(f, "starting"),
            RunPhase::Submitting => write!(f, "submitting"),
            RunPhase::Draining => write!(f, "draining"),
            RunPhase::ShuttingDown => write!(f, "shutting_down"),
            RunPhase::Done => write!(f, "done"),
        }
    }
}

/// Snapshot of a run's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolProgress {
    /// Current phase
    pub phase: RunPhase,

    /// Tasks pushed into the queue so far
    pub submitted: u64,

    /// Tasks whose outcome has been reported
    pub acknowledged: u64,

    /// Workers that have not exited yet
    pub live_workers: usize,
}

impl PoolProgress {
    fn new(live_workers: usize) -> Self {
        Self {
            phase: RunPhase::Starting,
            submitted: 0,
            acknowledged: 0,
            live_workers,
        }
    }

    /// Check if the drain barrier for `submitted` tasks is satisfied
    ///
    /// Holds once every submitted task is acknowledged, or once no worker is
    /// left that could acknowledge the rest.
    pub fn is_drained(&self, submitted: u64) -> bool {
        self.acknowledged >= submitted || self.live_workers == 0
    }
}

/// Cloneable handle over the run's [`PoolProgress`]
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    tx: Arc<watch::Sender<PoolProgress>>,
}

impl ProgressTracker {
    /// Start tracking a pool of `workers` workers
    pub fn new(workers: usize) -> Self {
        let (tx, _) = watch::channel(PoolProgress::new(workers));
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PoolProgress {
        *self.tx.borrow()
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<PoolProgress> {
        self.tx.subscribe()
    }

    /// Enter a new phase
    pub fn set_phase(&self, phase: RunPhase) {
        self.tx.send_modify(|p| p.phase = phase);
    }

    /// Record one task admitted into the queue
    pub fn submitted(&self) {
        self.tx.send_modify(|p| p.submitted += 1);
    }

    /// Record one task whose outcome has been reported
    pub fn acknowledge(&self) {
        self.tx.send_modify(|p| p.acknowledged += 1);
    }

    /// Record a worker exit
    pub fn worker_exited(&self) {
        self.tx
            .send_modify(|p| p.live_workers = p.live_workers.saturating_sub(1));
    }

    /// Guard that records a worker exit when dropped, including on panic
    pub fn worker_guard(&self) -> LiveWorkerGuard {
        LiveWorkerGuard {
            tracker: self.clone(),
        }
    }

    /// Wait for the drain barrier of `submitted` tasks
    pub async fn wait_drained(&self, submitted: u64) -> PoolProgress {
        let mut rx = self.subscribe();
        let progress = match rx.wait_for(|p| p.is_drained(submitted)).await {
            Ok(progress) => *progress,
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.snapshot(),
        };
        progress
    }
}

/// Decrements the live worker count on drop
#[derive(Debug)]
pub struct LiveWorkerGuard {
    tracker: ProgressTracker,
}

impl Drop for LiveWorkerGuard {
    fn drop(&mut self) {
        self.tracker.worker_exited();
    }
}

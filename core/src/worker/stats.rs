//! Worker statistics tracking

use std::time::{Duration, Instant};

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Worker that produced these stats
    pub worker_id: usize,

    /// Number of messages the server accepted
    pub sent: usize,

    /// Number of failed sends
    pub errors: usize,

    /// Sum of successful send latencies
    pub total_latency: Duration,

    /// Whether the worker exited on a shutdown sentinel
    pub shutdown_observed: bool,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats for a worker
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Get total number of processed tasks (sent + errors)
    pub fn total_tasks(&self) -> usize {
        self.sent + self.errors
    }

    /// Get success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_tasks() == 0 {
            0.0
        } else {
            self.sent as f64 / self.total_tasks() as f64
        }
    }

    /// Mean latency of successful sends
    pub fn mean_latency(&self) -> Option<Duration> {
        u32::try_from(self.sent)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.total_latency / n)
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Record a successful send
    pub fn record_success(&mut self, latency: Duration) {
        self.sent += 1;
        self.total_latency += latency;
    }

    /// Record a failed send
    pub fn record_error(&mut self) {
        self.errors += 1;
    }
}

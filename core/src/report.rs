//! Final run report and the metrics records derived from it

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A worker that never got a usable connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupFailure {
    /// Worker that failed
    pub worker_id: usize,
    /// Description of the failure
    pub error: String,
}

/// Tallies for one completed run
///
/// Produced once by [`ReportAggregator`](crate::ReportAggregator) after the
/// engine reaches `Done`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Messages the server accepted
    pub sent: u64,

    /// Tasks that ended in a failure
    pub errors: u64,

    /// Configured worker pool size
    pub concurrency: usize,

    /// Wall-clock time from run start to aggregation
    pub elapsed: Duration,

    /// One description per failed task, in arrival order
    pub failures: Vec<String>,

    /// Workers whose connection setup failed
    pub setup_failures: Vec<SetupFailure>,

    /// Whether the run was cancelled before every task was processed
    pub cancelled: bool,

    /// Sum of successful send latencies
    pub total_latency: Duration,
}

impl RunReport {
    /// Number of tasks accounted for
    pub fn total(&self) -> u64 {
        self.sent + self.errors
    }

    /// Average accepted messages per second
    pub fn rate_avg(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.sent as f64 / secs
        } else {
            0.0
        }
    }

    /// Mean latency of successful sends
    pub fn mean_latency(&self) -> Option<Duration> {
        u32::try_from(self.sent)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.total_latency / n)
    }

    /// Metrics records in output order: setup errors, send errors, summary
    pub fn records(&self) -> Vec<MetricsRecord> {
        let mut records =
            Vec::with_capacity(self.setup_failures.len() + self.failures.len() + 1);

        records.extend(self.setup_failures.iter().map(|f| MetricsRecord::SetupError {
            worker: f.worker_id,
            error: f.error.clone(),
        }));
        records.extend(
            self.failures
                .iter()
                .map(|e| MetricsRecord::Error { error: e.clone() }),
        );
        records.push(self.summary_record());

        records
    }

    /// The closing summary record
    pub fn summary_record(&self) -> MetricsRecord {
        MetricsRecord::Summary {
            sent: self.sent,
            errors: self.errors,
            concurrency: self.concurrency,
            elapsed_sec: self.elapsed.as_secs_f64(),
            rate_avg: self.rate_avg(),
        }
    }
}

/// One line of the newline-delimited metrics log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricsRecord {
    /// A worker failed to connect, upgrade or authenticate
    SetupError {
        /// Worker that failed
        worker: usize,
        /// Description of the failure
        error: String,
    },

    /// One failed task
    Error {
        /// Description of the failure
        error: String,
    },

    /// Run totals, always the last record
    Summary {
        /// Messages the server accepted
        sent: u64,
        /// Failed tasks
        errors: u64,
        /// Worker pool size
        concurrency: usize,
        /// Run duration in seconds
        elapsed_sec: f64,
        /// Accepted messages per second
        rate_avg: f64,
    },
}

//! Result aggregation after a run reaches `Done`

use std::time::Duration;

use crate::outcome::{OutcomeStatus, WorkerEvent};
use crate::report::{RunReport, SetupFailure};
use crate::worker::WorkerStats;

use super::executor::CompletedRun;

/// Folds the outcome stream of a completed run into a [`RunReport`]
///
/// Every worker has been joined by the time a [`CompletedRun`] exists, so no
/// writer is left on the outcome channel and plain counters suffice.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    sent: u64,
    errors: u64,
    failures: Vec<String>,
    setup_failures: Vec<SetupFailure>,
    total_latency: Duration,
}

impl ReportAggregator {
    /// Drain the outcome stream and compute the final report
    ///
    /// Elapsed time is measured from run start to this call.
    pub fn finalize(run: CompletedRun) -> RunReport {
        let CompletedRun {
            mut events,
            started_at,
            concurrency,
            summary,
        } = run;

        let mut agg = Self::default();
        while let Ok(event) = events.try_recv() {
            agg.record(event);
        }

        let report = RunReport {
            sent: agg.sent,
            errors: agg.errors,
            concurrency,
            elapsed: started_at.elapsed(),
            failures: agg.failures,
            setup_failures: agg.setup_failures,
            cancelled: summary.cancelled,
            total_latency: agg.total_latency,
        };

        tracing::info!(
            sent = report.sent,
            errors = report.errors,
            setup_failures = report.setup_failures.len(),
            elapsed_secs = report.elapsed.as_secs_f64(),
            rate_avg = report.rate_avg(),
            mean_latency_ms = ?report.mean_latency().map(|d| d.as_secs_f64() * 1000.0),
            "Run report finalized"
        );

        report
    }

    fn record(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Outcome(outcome) => match outcome.status {
                OutcomeStatus::Success { latency } => {
                    self.sent += 1;
                    self.total_latency += latency;
                }
                OutcomeStatus::Failure { error } => {
                    self.errors += 1;
                    self.failures.push(error);
                }
            },
            WorkerEvent::SetupFailed { worker_id, error } => {
                self.setup_failures.push(SetupFailure { worker_id, error });
            }
            WorkerEvent::Unprocessed { tasks, reason } => {
                self.errors += tasks;
                self.failures
                    .extend(std::iter::repeat(reason).take(tasks as usize));
            }
        }
    }
}

/// Aggregated statistics from all workers
#[derive(Debug, Clone, Default)]
pub struct AggregatedStats {
    /// Number of workers that returned stats
    pub total_workers: usize,

    /// Total accepted messages
    pub total_sent: usize,

    /// Total failed sends
    pub total_errors: usize,

    /// Workers that exited on a shutdown sentinel
    pub shutdowns_observed: usize,

    /// Maximum duration across all workers
    pub total_duration: Duration,

    /// Overall accepted messages per second
    pub messages_per_second: f64,
}

impl AggregatedStats {
    /// Get the total number of processed tasks (sent + errors)
    pub fn total_tasks(&self) -> usize {
        self.total_sent + self.total_errors
    }

    /// Get the success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.total_tasks();
        if total > 0 {
            self.total_sent as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let total_sent: usize = stats.iter().map(|s| s.sent).sum();
    let total_errors: usize = stats.iter().map(|s| s.errors).sum();
    let shutdowns_observed = stats.iter().filter(|s| s.shutdown_observed).count();

    // Use the maximum elapsed time across all workers
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let messages_per_second = if secs > 0.0 {
        total_sent as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_workers: stats.len(),
        total_sent,
        total_errors,
        shutdowns_observed,
        total_duration,
        messages_per_second,
    }
}

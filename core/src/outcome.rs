//! Per-task outcomes and the events workers report to the aggregator

use std::time::Duration;

/// Result of attempting one send
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeStatus {
    /// The server accepted the message
    Success {
        /// Time spent building and sending the message
        latency: Duration,
    },

    /// Building or sending failed
    Failure {
        /// Description of the failure
        error: String,
    },
}

/// Outcome of one [`SendTask`](crate::task::SendTask)
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// Index of the task this outcome belongs to
    pub index: u64,

    /// Worker that processed the task
    pub worker_id: usize,

    /// Success or failure
    pub status: OutcomeStatus,
}

impl SendOutcome {
    /// Successful send
    pub fn success(index: u64, worker_id: usize, latency: Duration) -> Self {
        Self {
            index,
            worker_id,
            status: OutcomeStatus::Success { latency },
        }
    }

    /// Failed send
    pub fn failure(index: u64, worker_id: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            worker_id,
            status: OutcomeStatus::Failure {
                error: error.into(),
            },
        }
    }

    /// Check if the send succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    /// Failure description, if the send failed
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failure { error } => Some(error),
            OutcomeStatus::Success { .. } => None,
        }
    }
}

/// Everything the dispatch engine and its workers report for aggregation
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// One task was processed
    Outcome(SendOutcome),

    /// A worker could not connect, upgrade or authenticate and never pulled a task
    SetupFailed {
        /// Worker that failed
        worker_id: usize,
        /// Description of the failure
        error: String,
    },

    /// Submitted tasks no worker was left to process
    Unprocessed {
        /// Number of tasks affected
        tasks: u64,
        /// Why they could not be processed
        reason: String,
    },
}

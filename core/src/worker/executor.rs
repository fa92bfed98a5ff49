//! Worker execution loop

use crate::error::{BenchError, BenchResult};
use crate::outcome::{OutcomeStatus, SendOutcome, WorkerEvent};
use crate::progress::ProgressTracker;
use crate::queue::TaskReceiver;
use crate::task::{QueueItem, SendTask};
use crate::traits::{MailConnection, MailConnector, MessageSource};

use super::stats::WorkerStats;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};

/// Worker pulls tasks in a loop: pull -> build -> send -> report -> repeat
///
/// Each worker opens its own connection before pulling anything and keeps it
/// for its whole lifetime. The connector and message source are shared via
/// Arc; the connection never leaves this worker.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// Opens this worker's connection
    connector: Arc<dyn MailConnector>,

    /// Builds the message for each task
    source: Arc<dyn MessageSource>,

    /// Shared task queue
    tasks: TaskReceiver,

    /// Outcome channel to the aggregator
    events_tx: mpsc::UnboundedSender<WorkerEvent>,

    /// Acknowledgement and liveness tracking
    progress: ProgressTracker,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        id: usize,
        connector: Arc<dyn MailConnector>,
        source: Arc<dyn MessageSource>,
        tasks: TaskReceiver,
        events_tx: mpsc::UnboundedSender<WorkerEvent>,
        progress: ProgressTracker,
    ) -> Self {
        Self {
            id,
            connector,
            source,
            tasks,
            events_tx,
            progress,
        }
    }

    /// Run the worker loop
    ///
    /// Returns WorkerStats after a shutdown sentinel, a cancellation signal or
    /// queue closure. Returns a setup error without pulling any task when the
    /// connection cannot be established.
    pub async fn run(self, mut cancel: broadcast::Receiver<()>) -> BenchResult<WorkerStats> {
        let _live = self.progress.worker_guard();
        let mut stats = WorkerStats::new(self.id);
        stats.start();

        let mut conn = match self.connector.open(self.id).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(worker_id = self.id, error = %e, "Connection setup failed");
                let _ = self.events_tx.send(WorkerEvent::SetupFailed {
                    worker_id: self.id,
                    error: e.to_string(),
                });
                return Err(BenchError::setup(self.id, e.to_string()));
            }
        };

        tracing::debug!(
            worker_id = self.id,
            transport = self.connector.transport_name(),
            "Worker connected"
        );

        loop {
            // A task already pulled is always finished; cancellation is only
            // honored between tasks.
            let item = tokio::select! {
                biased;

                Ok(()) = cancel.recv() => {
                    tracing::debug!(worker_id = self.id, "Worker received cancellation");
                    break;
                }

                item = self.tasks.pull() => item,
            };

            match item {
                Some(QueueItem::Task(task)) => {
                    let outcome = self.process(task, conn.as_mut()).await;
                    match &outcome.status {
                        OutcomeStatus::Success { latency } => stats.record_success(*latency),
                        OutcomeStatus::Failure { error } => {
                            stats.record_error();
                            tracing::warn!(
                                worker_id = self.id,
                                index = task.index(),
                                error = %error,
                                "Send failed"
                            );
                        }
                    }

                    // The outcome is queued before the acknowledgement so the
                    // drain barrier never releases ahead of it.
                    let _ = self.events_tx.send(WorkerEvent::Outcome(outcome));
                    self.progress.acknowledge();
                }
                Some(QueueItem::Shutdown) => {
                    stats.shutdown_observed = true;
                    break;
                }
                None => {
                    tracing::debug!(worker_id = self.id, "Task queue closed, worker stopping");
                    break;
                }
            }
        }

        if let Err(e) = conn.close().await {
            tracing::debug!(worker_id = self.id, error = %e, "Ignoring error on close");
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            sent = stats.sent,
            errors = stats.errors,
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        Ok(stats)
    }

    /// Build and send the message for one task
    async fn process(&self, task: SendTask, conn: &mut dyn MailConnection) -> SendOutcome {
        let start = Instant::now();

        let mail = match self.source.build() {
            Ok(mail) => mail,
            Err(e) => return SendOutcome::failure(task.index(), self.id, e.to_string()),
        };

        match conn.send(&mail).await {
            Ok(()) => SendOutcome::success(task.index(), self.id, start.elapsed()),
            Err(e) => SendOutcome::failure(task.index(), self.id, e.to_string()),
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("transport", &self.connector.transport_name())
            .field("source", &self.source.name())
            .finish()
    }
}

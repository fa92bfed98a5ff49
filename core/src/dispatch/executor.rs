//! Dispatch engine execution logic

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};

use crate::config::RunConfig;
use crate::error::BenchResult;
use crate::outcome::WorkerEvent;
use crate::progress::{ProgressTracker, RunPhase};
use crate::queue::{task_queue, TaskQueue};
use crate::task::{QueueItem, SendTask};
use crate::traits::{MailConnector, MessageSource};
use crate::worker::{WorkerBuilder, WorkerStats};

use super::aggregator::aggregate_worker_stats;
use super::rate_controller::RateController;

/// Buffered cancellation signals; a handful are ever sent per run
const CANCEL_BUFFER: usize = 16;

/// DispatchEngine drives one run: `Starting -> Submitting -> Draining -> ShuttingDown -> Done`
///
/// It is the only producer on the task queue and the only caller of the
/// rate controller. Workers own their connections; the engine only owns the
/// queue, the outcome channel and the completion tracker.
pub struct DispatchEngine {
    /// Run configuration
    config: RunConfig,

    /// Opens one connection per worker
    connector: Arc<dyn MailConnector>,

    /// Builds messages (shared across workers)
    source: Arc<dyn MessageSource>,

    /// Admission pacer
    rate: RateController,

    /// Phase, submission and acknowledgement tracking
    progress: ProgressTracker,

    /// Cancellation fan-out to workers
    cancel_tx: broadcast::Sender<()>,

    /// Subscribed at construction so a cancel issued before `run` is not lost
    cancel_rx: broadcast::Receiver<()>,
}

/// Cancels a running engine from another task
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: broadcast::Sender<()>,
}

impl CancelHandle {
    /// Stop submitting; workers finish their current task and exit
    pub fn cancel(&self) {
        let _ = self.tx.send(());
    }
}

/// What the engine itself observed during a run
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    /// Tasks pushed into the queue
    pub submitted: u64,

    /// Shutdown sentinels pushed into the queue
    pub sentinels_enqueued: usize,

    /// Stats of every worker that got a connection
    pub worker_stats: Vec<WorkerStats>,

    /// Workers that failed connection setup
    pub setup_failures: usize,

    /// Tasks reported as unprocessed because no worker was left
    pub unprocessed: u64,

    /// Whether the run was cancelled
    pub cancelled: bool,
}

/// A run that has reached `Done`
///
/// Holds the outcome stream; the only way to read it is
/// [`ReportAggregator::finalize`](super::ReportAggregator::finalize), so
/// aggregation cannot start before every worker has been joined.
#[derive(Debug)]
pub struct CompletedRun {
    pub(crate) events: mpsc::UnboundedReceiver<WorkerEvent>,
    pub(crate) started_at: Instant,
    pub(crate) concurrency: usize,
    pub(crate) summary: DispatchSummary,
}

impl CompletedRun {
    /// Engine-side summary of the run
    pub fn summary(&self) -> &DispatchSummary {
        &self.summary
    }

    /// When the run started
    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

impl DispatchEngine {
    /// Create a new engine
    ///
    /// Use `DispatchEngineBuilder` for a validated construction.
    pub fn new(
        config: RunConfig,
        connector: Arc<dyn MailConnector>,
        source: Arc<dyn MessageSource>,
    ) -> Self {
        let rate = RateController::new(config.rate_limit());
        let progress = ProgressTracker::new(config.concurrency);
        let (cancel_tx, cancel_rx) = broadcast::channel(CANCEL_BUFFER);

        Self {
            config,
            connector,
            source,
            rate,
            progress,
            cancel_tx,
            cancel_rx,
        }
    }

    /// Handle that cancels this engine's run
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Shared progress tracker (phase, submitted, acknowledged, live workers)
    pub fn progress(&self) -> ProgressTracker {
        self.progress.clone()
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the batch to completion
    ///
    /// Per-send and setup failures never abort the run; they are reported
    /// through the returned [`CompletedRun`].
    pub async fn run(mut self) -> BenchResult<CompletedRun> {
        let started_at = Instant::now();
        let concurrency = self.config.concurrency;
        let total = self.config.messages;

        tracing::info!(
            messages = total,
            concurrency,
            rate = ?self.rate.rate(),
            queue_capacity = self.config.queue_capacity(),
            transport = self.connector.transport_name(),
            "Starting run"
        );

        // ---- Starting ------------------------------------------------------
        self.progress.set_phase(RunPhase::Starting);
        let (queue, tasks) = task_queue(self.config.queue_capacity());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(concurrency);
        for worker_id in 0..concurrency {
            let worker = WorkerBuilder::new(worker_id)
                .connector(Arc::clone(&self.connector))
                .source(Arc::clone(&self.source))
                .tasks(tasks.clone())
                .events_tx(events_tx.clone())
                .progress(self.progress.clone())
                .build()?;
            let cancel_rx = self.cancel_tx.subscribe();

            handles.push(tokio::spawn(async move { worker.run(cancel_rx).await }));
        }
        // Workers hold the only receivers, so the queue closes once they all exit.
        drop(tasks);

        // ---- Submitting ----------------------------------------------------
        self.progress.set_phase(RunPhase::Submitting);
        let mut submitted = 0u64;
        let mut cancelled = false;

        for index in 0..total {
            let admitted = tokio::select! {
                biased;

                Ok(()) = self.cancel_rx.recv() => {
                    cancelled = true;
                    break;
                }

                admitted = admit(&self.rate, &self.progress, &queue, SendTask::new(index)) => admitted,
            };

            if !admitted {
                tracing::warn!(
                    submitted,
                    remaining = total - submitted,
                    "No live worker left, stopping submission"
                );
                break;
            }
            submitted += 1;
        }

        tracing::debug!(submitted, cancelled, "Submission finished");

        // ---- Draining ------------------------------------------------------
        self.progress.set_phase(RunPhase::Draining);
        if !cancelled {
            tokio::select! {
                biased;

                Ok(()) = self.cancel_rx.recv() => cancelled = true,

                drained = self.progress.wait_drained(submitted) => {
                    tracing::debug!(
                        acknowledged = drained.acknowledged,
                        live_workers = drained.live_workers,
                        "Drain barrier released"
                    );
                }
            }
        }

        // ---- ShuttingDown --------------------------------------------------
        self.progress.set_phase(RunPhase::ShuttingDown);
        let mut sentinels_enqueued = 0;
        if cancelled {
            tracing::info!("Run cancelled, waiting for in-flight sends");
            // Reach workers even if the original signal predates their subscription
            let _ = self.cancel_tx.send(());
        } else {
            for _ in 0..concurrency {
                if queue.push(QueueItem::Shutdown).await.is_err() {
                    break;
                }
                sentinels_enqueued += 1;
            }
        }

        let mut worker_stats = Vec::with_capacity(handles.len());
        let mut setup_failures = 0;
        let mut last_setup_error = None;
        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(stats)) => {
                    tracing::debug!(
                        worker_id = idx,
                        sent = stats.sent,
                        errors = stats.errors,
                        "Worker joined"
                    );
                    worker_stats.push(stats);
                }
                Ok(Err(e)) if e.is_setup() => {
                    setup_failures += 1;
                    last_setup_error = Some(e.message);
                }
                Ok(Err(e)) => {
                    tracing::error!(worker_id = idx, error = %e, "Worker returned error");
                }
                Err(e) => {
                    tracing::error!(worker_id = idx, error = %e, "Worker task panicked");
                }
            }
        }
        // Anything still queued is discarded here.
        drop(queue);

        let acknowledged = self.progress.snapshot().acknowledged;
        let mut unprocessed = 0;
        if !cancelled && acknowledged < total {
            unprocessed = total - acknowledged;
            let reason = format!(
                "no worker available: {}",
                last_setup_error.as_deref().unwrap_or("worker pool exited early")
            );
            tracing::error!(tasks = unprocessed, reason = %reason, "Tasks left unprocessed");
            let _ = events_tx.send(WorkerEvent::Unprocessed {
                tasks: unprocessed,
                reason,
            });
        }
        drop(events_tx);

        // ---- Done ----------------------------------------------------------
        self.progress.set_phase(RunPhase::Done);

        let aggregated = aggregate_worker_stats(&worker_stats);
        tracing::info!(
            elapsed_secs = started_at.elapsed().as_secs_f64(),
            submitted,
            sent = aggregated.total_sent,
            errors = aggregated.total_errors,
            setup_failures,
            cancelled,
            "Run completed"
        );

        Ok(CompletedRun {
            events: events_rx,
            started_at,
            concurrency,
            summary: DispatchSummary {
                submitted,
                sentinels_enqueued,
                worker_stats,
                setup_failures,
                unprocessed,
                cancelled,
            },
        })
    }

    /// Run with Ctrl+C signal handling
    ///
    /// Ctrl+C cancels the run; the partial results are still returned.
    pub async fn run_with_signal_handling(self) -> BenchResult<CompletedRun> {
        let cancel = self.cancel_handle();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, cancelling run...");
                    cancel.cancel();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run().await;

        signal_handle.abort();

        result
    }
}

/// Wait for the rate controller, then push one task
///
/// Returns false once no worker is left to consume the queue.
async fn admit(
    rate: &RateController,
    progress: &ProgressTracker,
    queue: &TaskQueue,
    task: SendTask,
) -> bool {
    rate.acquire().await;
    match queue.push(QueueItem::Task(task)).await {
        Ok(()) => {
            progress.submitted();
            true
        }
        Err(_) => false,
    }
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("config", &self.config)
            .field("transport", &self.connector.transport_name())
            .field("source", &self.source.name())
            .field("rate", &self.rate)
            .finish()
    }
}

//! Builder pattern for Worker construction

use crate::error::{BenchError, BenchResult};
use crate::outcome::WorkerEvent;
use crate::progress::ProgressTracker;
use crate::queue::TaskReceiver;
use crate::traits::{MailConnector, MessageSource};

use super::executor::Worker;

use std::sync::Arc;
use tokio::sync::mpsc;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .connector(connector)
///     .source(source)
///     .tasks(receiver)
///     .events_tx(tx)
///     .progress(tracker)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    connector: Option<Arc<dyn MailConnector>>,
    source: Option<Arc<dyn MessageSource>>,
    tasks: Option<TaskReceiver>,
    events_tx: Option<mpsc::UnboundedSender<WorkerEvent>>,
    progress: Option<ProgressTracker>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            connector: None,
            source: None,
            tasks: None,
            events_tx: None,
            progress: None,
        }
    }

    /// Set the connector used to open this worker's connection
    pub fn connector(mut self, connector: Arc<dyn MailConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Set the message source
    pub fn source(mut self, source: Arc<dyn MessageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the shared task queue receiver
    pub fn tasks(mut self, tasks: TaskReceiver) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Set the outcome channel sender
    pub fn events_tx(mut self, tx: mpsc::UnboundedSender<WorkerEvent>) -> Self {
        self.events_tx = Some(tx);
        self
    }

    /// Set the progress tracker
    pub fn progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> BenchResult<Worker> {
        let connector = self
            .connector
            .ok_or_else(|| BenchError::missing_config("connector"))?;
        let source = self
            .source
            .ok_or_else(|| BenchError::missing_config("source"))?;
        let tasks = self
            .tasks
            .ok_or_else(|| BenchError::missing_config("tasks"))?;
        let events_tx = self
            .events_tx
            .ok_or_else(|| BenchError::missing_config("events_tx"))?;
        let progress = self
            .progress
            .ok_or_else(|| BenchError::missing_config("progress"))?;

        Ok(Worker::new(
            self.id, connector, source, tasks, events_tx, progress,
        ))
    }
}

//! Builder pattern for DispatchEngine construction

use std::sync::Arc;

use crate::config::RunConfig;
use crate::error::{BenchError, BenchResult};
use crate::traits::{MailConnector, MessageSource};

use super::executor::DispatchEngine;

/// Builder for creating a DispatchEngine with proper configuration
///
/// # Example
///
/// ```ignore
/// let engine = DispatchEngineBuilder::new()
///     .messages(1000)
///     .concurrency(10)
///     .rate(7.0)
///     .connector(connector)
///     .source(source)
///     .build()?;
/// ```
pub struct DispatchEngineBuilder {
    config: RunConfig,
    connector: Option<Arc<dyn MailConnector>>,
    source: Option<Arc<dyn MessageSource>>,
}

impl DispatchEngineBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            connector: None,
            source: None,
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of messages to send
    pub fn messages(mut self, messages: u64) -> Self {
        self.config.messages = messages;
        self
    }

    /// Set the worker pool size
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set the admission rate (messages per second, 0 for unlimited)
    pub fn rate(mut self, rate: f64) -> Self {
        self.config.rate = rate;
        self
    }

    /// Override the task queue capacity
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.config.queue_depth = Some(depth);
        self
    }

    /// Set the connector every worker opens its connection with
    pub fn connector(mut self, connector: Arc<dyn MailConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Set the message source
    pub fn source(mut self, source: Arc<dyn MessageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    ///
    /// Returns an error if the connector or source is not set, or if
    /// configuration validation fails.
    pub fn build(self) -> BenchResult<DispatchEngine> {
        let connector = self
            .connector
            .ok_or_else(|| BenchError::missing_config("connector"))?;

        let source = self
            .source
            .ok_or_else(|| BenchError::missing_config("source"))?;

        self.config
            .validate()
            .map_err(|e| BenchError::config(e.to_string()))?;

        Ok(DispatchEngine::new(self.config, connector, source))
    }
}

impl Default for DispatchEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

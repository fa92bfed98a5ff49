//! Error types for smtp-bench-core

use std::fmt;

use thiserror::Error;

/// Broad classification of a [`BenchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid run configuration
    Config,
    /// A required builder field was never set
    MissingConfig,
    /// A worker could not establish its transport connection
    Setup,
    /// The task queue was closed while the engine still needed it
    QueueClosed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "configuration error",
            ErrorKind::MissingConfig => "missing configuration",
            ErrorKind::Setup => "connection setup failed",
            ErrorKind::QueueClosed => "task queue closed",
        };
        f.write_str(name)
    }
}

/// Core error type
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct BenchError {
    /// Error classification
    pub kind: ErrorKind,

    /// Human readable detail
    pub message: String,
}

impl BenchError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Invalid configuration
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// A builder was missing a required field
    pub fn missing_config(field: &str) -> Self {
        Self::new(ErrorKind::MissingConfig, format!("{field} is required"))
    }

    /// Connect, STARTTLS or authentication failed for a worker
    pub fn setup(worker_id: usize, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Setup,
            format!("worker {worker_id}: {}", message.into()),
        )
    }

    /// Every consumer of the task queue is gone
    pub fn queue_closed() -> Self {
        Self::new(ErrorKind::QueueClosed, "no worker is consuming the task queue")
    }

    /// Check if this is a worker setup failure
    pub fn is_setup(&self) -> bool {
        self.kind == ErrorKind::Setup
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_kind() {
        let err = BenchError::config("concurrency must be at least 1");
        assert_eq!(
            err.to_string(),
            "configuration error: concurrency must be at least 1"
        );
    }

    #[test]
    fn test_setup_error_names_worker() {
        let err = BenchError::setup(3, "connection refused");
        assert!(err.is_setup());
        assert!(err.message.contains("worker 3"));
        assert!(err.message.contains("connection refused"));
    }

    #[test]
    fn test_missing_config_message() {
        let err = BenchError::missing_config("connector");
        assert_eq!(err.kind, ErrorKind::MissingConfig);
        assert!(err.message.contains("connector"));
    }
}

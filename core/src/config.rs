//! Run configuration types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::MessageShape;

/// Slowest accepted pacing rate (one admission per ~11.6 days)
pub const MIN_RATE: f64 = 1e-6;

/// Connection settings shared by every worker's transport connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// SMTP server host
    pub host: String,

    /// SMTP server port
    pub port: u16,

    /// Optional login user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Optional login password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Upgrade to TLS with STARTTLS before authenticating
    #[serde(default)]
    pub starttls: bool,

    /// Skip certificate verification during STARTTLS
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Timeout for establishing the connection
    pub connect_timeout: Duration,

    /// Name announced in EHLO; the local hostname when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hello_name: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1025,
            username: None,
            password: None,
            starttls: false,
            accept_invalid_certs: false,
            connect_timeout: Duration::from_secs(10),
            hello_name: None,
        }
    }
}

impl TransportConfig {
    /// Login credentials, only when both user and password are non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

/// Immutable snapshot of every tunable of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Server endpoint and session options
    pub transport: TransportConfig,

    /// Envelope and header sender
    pub mail_from: String,

    /// Envelope and header recipient
    pub mail_to: String,

    /// Total number of messages to send
    pub messages: u64,

    /// Number of workers, each with its own connection
    pub concurrency: usize,

    /// Maximum admissions per second across the run; 0 disables pacing
    pub rate: f64,

    /// Shape of every synthetic message
    pub shape: MessageShape,

    /// Task queue capacity; `2 * concurrency` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<usize>,

    /// Where the metrics log is written
    pub metrics_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            mail_from: "test@local.test".into(),
            mail_to: "sink@local.test".into(),
            messages: 1000,
            concurrency: 10,
            rate: 7.0,
            shape: MessageShape::default(),
            queue_depth: None,
            metrics_path: PathBuf::from("metrics.jsonl"),
        }
    }
}

impl RunConfig {
    /// Effective task queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.queue_depth
            .unwrap_or_else(|| self.concurrency.saturating_mul(2))
    }

    /// Pacing rate if one applies
    pub fn rate_limit(&self) -> Option<f64> {
        (self.rate > 0.0).then_some(self.rate)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "concurrency must be at least 1".into(),
            ));
        }

        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(ConfigError::InvalidRate(format!(
                "rate must be a finite value >= 0, got {}",
                self.rate
            )));
        }

        if self.rate > 0.0 && self.rate < MIN_RATE {
            return Err(ConfigError::InvalidRate(format!(
                "rate must be 0 (unlimited) or at least {MIN_RATE}, got {}",
                self.rate
            )));
        }

        if self.queue_depth == Some(0) {
            return Err(ConfigError::InvalidQueueDepth(
                "queue depth must be at least 1".into(),
            ));
        }

        if self.transport.host.trim().is_empty() {
            return Err(ConfigError::InvalidEndpoint("host is empty".into()));
        }

        if self.transport.port == 0 {
            return Err(ConfigError::InvalidEndpoint("port must be non-zero".into()));
        }

        if self.mail_from.trim().is_empty() || self.mail_to.trim().is_empty() {
            return Err(ConfigError::InvalidAddress(
                "sender and recipient are required".into(),
            ));
        }

        self.shape.validate()
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid concurrency value
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid rate
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    /// Invalid queue depth
    #[error("Invalid queue depth: {0}")]
    InvalidQueueDepth(String),

    /// Invalid host or port
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Missing sender or recipient
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Inconsistent message size bounds
    #[error("Invalid message shape: {0}")]
    InvalidShape(String),
}

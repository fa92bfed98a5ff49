//! Core traits for message sources and mail transports
//!
//! These traits are defined in core to avoid circular dependencies.
//! Implementations live in their respective crates (mailgen/, transport/).

use std::time::Duration;

use async_trait::async_trait;

use crate::message::SyntheticMail;

// ============================================================================
// Mail Transport Traits
// ============================================================================

/// Opens transport connections, one per worker
///
/// Shared by all workers via `Arc`. Every call to [`open`](Self::open) must
/// return a fresh connection; connections are never shared between workers.
#[async_trait]
pub trait MailConnector: Send + Sync {
    /// Transport identifier (e.g., "smtp")
    fn transport_name(&self) -> &str;

    /// Connect, optionally upgrade to TLS and authenticate
    ///
    /// Any error returned here is a setup failure for the calling worker.
    async fn open(&self, worker_id: usize) -> Result<Box<dyn MailConnection>, TransportError>;
}

/// A single established connection, owned exclusively by one worker
#[async_trait]
pub trait MailConnection: Send {
    /// Send one message over this connection
    async fn send(&mut self, mail: &SyntheticMail) -> Result<(), TransportError>;

    /// End the session
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// TCP connect or greeting failed
    #[error("connection failed: {0}")]
    Connect(String),

    /// STARTTLS upgrade failed
    #[error("STARTTLS failed: {0}")]
    Tls(String),

    /// Server rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Server refused the message
    #[error("{0}")]
    Rejected(String),

    /// The operation timed out
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The message could not be encoded for the wire
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The connection is no longer usable
    #[error("connection closed")]
    Closed,

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Check if this error happened while establishing the session
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Connect(_) | TransportError::Tls(_) | TransportError::Auth(_)
        )
    }
}

// ============================================================================
// Message Source Trait
// ============================================================================

/// Produces synthetic messages
///
/// Called concurrently by every worker, so implementations must be safe to
/// share and must not hand out the same random state twice.
pub trait MessageSource: Send + Sync {
    /// Source name for identification
    fn name(&self) -> &str;

    /// Build one message
    fn build(&self) -> Result<SyntheticMail, ComposeError>;
}

/// Message source errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    /// The requested shape cannot be produced
    #[error("invalid message shape: {0}")]
    InvalidShape(String),
}

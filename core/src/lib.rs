//! smtp-bench-core: Dispatch engine and rate control for SMTP load runs
//!
//! This crate provides the pieces shared by every smtp-bench component,
//! including:
//!
//! - Run configuration and error types
//! - Collaborator traits (MailConnector, MailConnection, MessageSource)
//! - The bounded task queue, workers and the dispatch engine
//! - Rate control and the final run report

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod outcome;
pub mod progress;
pub mod queue;
pub mod report;
pub mod task;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use config::*;
pub use dispatch::{
    aggregate_worker_stats, AggregatedStats, CancelHandle, CompletedRun, DispatchEngine,
    DispatchEngineBuilder, DispatchSummary, RateController, ReportAggregator,
};
pub use error::*;
pub use message::*;
pub use outcome::*;
pub use progress::{PoolProgress, ProgressTracker, RunPhase};
pub use report::*;
pub use task::*;
pub use traits::*;
pub use worker::{Worker, WorkerBuilder, WorkerStats};

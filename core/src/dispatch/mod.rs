//! Dispatch engine for run lifecycle management
//!
//! The DispatchEngine coordinates one bounded batch of sends:
//! - Spawning one worker per configured connection
//! - Pacing admissions through the RateController
//! - Backpressure via the bounded task queue
//! - Draining, sentinel shutdown and optional cancellation
//!
//! Outcomes are handed to the ReportAggregator only once the run is `Done`.
//!
//! # Example
//!
//! ```ignore
//! use smtp_bench_core::{DispatchEngineBuilder, ReportAggregator};
//!
//! let engine = DispatchEngineBuilder::new()
//!     .config(config)
//!     .connector(connector)
//!     .source(source)
//!     .build()?;
//!
//! let completed = engine.run_with_signal_handling().await?;
//! let report = ReportAggregator::finalize(completed);
//! ```

mod aggregator;
mod builder;
mod executor;
mod rate_controller;

pub use aggregator::{aggregate_worker_stats, AggregatedStats, ReportAggregator};
pub use builder::DispatchEngineBuilder;
pub use executor::{CancelHandle, CompletedRun, DispatchEngine, DispatchSummary};
pub use rate_controller::RateController;

//! Worker module for sending messages
//!
//! A Worker is one execution unit of the dispatch pool, responsible for the
//! loop: **pull -> build -> send -> report -> repeat**.
//!
//! Each Worker is a tokio task that:
//!
//! 1. Opens its own connection through a MailConnector (connect, optional
//!    STARTTLS, optional login). On failure it reports `SetupFailed` and exits
//!    without pulling any task.
//! 2. Pulls the next item from the shared task queue
//! 3. Builds a message via the MessageSource and sends it on its connection
//! 4. Sends the outcome to the aggregator channel and acknowledges the task
//! 5. Repeats until it pulls a shutdown sentinel or the run is cancelled,
//!    then closes its connection (ignoring close errors)
//!
//! # Example
//!
//! ```ignore
//! use smtp_bench_core::worker::WorkerBuilder;
//!
//! let worker = WorkerBuilder::new(0)
//!     .connector(connector)
//!     .source(source)
//!     .tasks(receiver)
//!     .events_tx(tx)
//!     .progress(tracker)
//!     .build()?;
//!
//! let stats = worker.run(cancel_rx).await?;
//! println!("Sent: {}", stats.sent);
//! ```

mod builder;
mod executor;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use stats::WorkerStats;

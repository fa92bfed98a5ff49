//! CLI argument parsing and run orchestration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use smtp_bench_core::{
    DispatchEngineBuilder, MessageShape, ProgressTracker, ReportAggregator, RunConfig, RunPhase,
    TransportConfig,
};
use smtp_bench_mailgen::MessageFactory;
use smtp_bench_report::{console_summary, MetricsLog};
use smtp_bench_transport::SmtpConnector;
use tokio::task::JoinHandle;

/// Safe local email load tester - for your own test systems only
#[derive(Parser, Debug)]
#[command(name = "smtp-bench")]
#[command(
    author,
    version,
    about = "Safe local email load tester - for your own test systems only",
    long_about = None
)]
pub struct Cli {
    /// SMTP server host
    #[arg(long, env = "SMTP_HOST", default_value = "127.0.0.1")]
    pub smtp_host: String,

    /// SMTP server port
    #[arg(long, env = "SMTP_PORT", default_value_t = 1025)]
    pub smtp_port: u16,

    /// Login user (used only together with --smtp-pass)
    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    /// Login password (used only together with --smtp-user)
    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    pub smtp_pass: Option<String>,

    /// Use STARTTLS if your local test server supports it
    #[arg(long)]
    pub smtp_starttls: bool,

    /// Accept invalid certificates during STARTTLS
    #[arg(long)]
    pub smtp_insecure_tls: bool,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,

    /// Sender address of every message
    #[arg(long, env = "MAIL_FROM", default_value = "test@local.test")]
    pub mail_from: String,

    /// Recipient address of every message
    #[arg(long, env = "MAIL_TO", default_value = "sink@local.test")]
    pub mail_to: String,

    /// Number of messages to send
    #[arg(long, env = "MESSAGES", default_value_t = 1000)]
    pub messages: u64,

    /// Number of workers, each with its own connection
    #[arg(long, env = "CONCURRENCY", default_value_t = 10)]
    pub concurrency: usize,

    /// Max messages per second overall, 0 = unlimited
    #[arg(long, env = "RATE", default_value_t = 7.0)]
    pub rate: f64,

    /// Subject length in characters
    #[arg(long, env = "SUBJECT_LEN", default_value_t = 32)]
    pub subject_len: usize,

    /// Minimum body size in bytes
    #[arg(long, env = "MIN_BYTES", default_value_t = 200)]
    pub min_bytes: usize,

    /// Maximum body size in bytes
    #[arg(long, env = "MAX_BYTES", default_value_t = 2000)]
    pub max_bytes: usize,

    /// Add a random binary attachment
    #[arg(long)]
    pub attachment: bool,

    /// Path to the metrics JSONL file
    #[arg(long, env = "METRICS", default_value = "metrics.jsonl")]
    pub metrics: PathBuf,

    /// Task queue capacity (default: 2 x concurrency)
    #[arg(long)]
    pub queue_depth: Option<usize>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the run configuration from the parsed arguments
    pub fn to_config(&self) -> RunConfig {
        RunConfig {
            transport: TransportConfig {
                host: self.smtp_host.clone(),
                port: self.smtp_port,
                username: self.smtp_user.clone(),
                password: self.smtp_pass.clone(),
                starttls: self.smtp_starttls,
                accept_invalid_certs: self.smtp_insecure_tls,
                connect_timeout: Duration::from_secs(self.connect_timeout),
                hello_name: None,
            },
            mail_from: self.mail_from.clone(),
            mail_to: self.mail_to.clone(),
            messages: self.messages,
            concurrency: self.concurrency,
            rate: self.rate,
            shape: MessageShape {
                subject_len: self.subject_len,
                min_bytes: self.min_bytes,
                max_bytes: self.max_bytes,
                attachment: self.attachment,
            },
            queue_depth: self.queue_depth,
            metrics_path: self.metrics.clone(),
        }
    }

    /// Run one batch and write its metrics
    pub async fn run(&self) -> Result<()> {
        let config = self.to_config();
        config.validate().context("Invalid configuration")?;

        tracing::info!(
            host = %config.transport.host,
            port = config.transport.port,
            starttls = config.transport.starttls,
            messages = config.messages,
            concurrency = config.concurrency,
            rate = config.rate,
            attachment = config.shape.attachment,
            "smtp-bench starting"
        );

        // Fail on an unwritable metrics path before anything is sent
        let mut metrics = MetricsLog::create(&config.metrics_path).with_context(|| {
            format!(
                "Failed to create metrics file: {}",
                config.metrics_path.display()
            )
        })?;

        let connector = Arc::new(SmtpConnector::new(config.transport.clone()));
        let source = Arc::new(
            MessageFactory::new(&config.mail_from, &config.mail_to, config.shape)
                .context("Invalid message shape")?,
        );

        let engine = DispatchEngineBuilder::new()
            .config(config.clone())
            .connector(connector)
            .source(source)
            .build()
            .context("Failed to build dispatch engine")?;

        let progress_bar = self
            .progress
            .then(|| spawn_progress_bar(engine.progress(), config.messages));

        let completed = engine
            .run_with_signal_handling()
            .await
            .context("Run failed")?;

        if let Some(handle) = progress_bar {
            let _ = handle.await;
        }

        let report = ReportAggregator::finalize(completed);

        metrics
            .write_report(&report)
            .context("Failed to write metrics")?;
        let path = metrics.finish().context("Failed to write metrics")?;

        println!("{}", console_summary(&report));
        if report.cancelled {
            println!(
                "run interrupted: {} of {} messages processed",
                report.total(),
                config.messages
            );
        }
        println!("metrics written to {}", path.display());

        Ok(())
    }
}

/// Draw acknowledged tasks on stderr until the run is done
fn spawn_progress_bar(tracker: ProgressTracker, total: u64) -> JoinHandle<()> {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut rx = tracker.subscribe();
    drop(tracker);

    tokio::spawn(async move {
        loop {
            let progress = *rx.borrow_and_update();
            pb.set_position(progress.acknowledged);
            pb.set_message(progress.phase.to_string());

            if progress.phase == RunPhase::Done || rx.changed().await.is_err() {
                break;
            }
        }
        pb.finish();
    })
}

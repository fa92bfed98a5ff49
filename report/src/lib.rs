//! Metrics output for smtp-bench
//!
//! This crate writes the results of a run:
//!
//! - The newline-delimited JSON metrics log (one record per line)
//! - The one-line console summary

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use smtp_bench_core::{MetricsRecord, RunReport};

/// Errors while writing metrics
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The metrics file could not be created or written
    #[error("metrics file {path}: {source}")]
    Io {
        /// Path of the metrics file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized
    #[error("failed to serialize metrics record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias
pub type ReportResult<T> = Result<T, ReportError>;

/// Newline-delimited JSON metrics log
///
/// The file is created (truncating any previous log) when the log is opened,
/// so an unwritable path is reported before the run starts.
#[derive(Debug)]
pub struct MetricsLog {
    path: PathBuf,
    writer: BufWriter<File>,
    records: usize,
}

impl MetricsLog {
    /// Create or truncate the log at `path`
    pub fn create(path: impl AsRef<Path>) -> ReportResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    /// Append one record as a single line
    pub fn append(&mut self, record: &MetricsRecord) -> ReportResult<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(|e| {
            if e.is_io() {
                self.io_error(e.into())
            } else {
                ReportError::Serialize(e)
            }
        })?;
        self.writer.write_all(b"\n").map_err(|e| self.io_error(e))?;
        self.records += 1;
        Ok(())
    }

    /// Append every record of a finished run, summary last
    pub fn write_report(&mut self, report: &RunReport) -> ReportResult<()> {
        for record in report.records() {
            self.append(&record)?;
        }
        Ok(())
    }

    /// Flush to disk and return the log path
    pub fn finish(mut self) -> ReportResult<PathBuf> {
        self.writer.flush().map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), records = self.records, "Metrics log written");
        Ok(self.path)
    }

    /// Path of the log
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended so far
    pub fn records(&self) -> usize {
        self.records
    }

    fn io_error(&self, source: std::io::Error) -> ReportError {
        ReportError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// One-line human readable summary
///
/// `sent=<n> errors=<n> elapsed_sec=<f> avg_msgs_per_sec=<f>`
pub fn console_summary(report: &RunReport) -> String {
    format!(
        "sent={} errors={} elapsed_sec={:.2} avg_msgs_per_sec={:.2}",
        report.sent,
        report.errors,
        report.elapsed.as_secs_f64(),
        report.rate_avg()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use smtp_bench_core::SetupFailure;
    use std::time::Duration;
    use tempfile::TempDir;

    fn report() -> RunReport {
        RunReport {
            sent: 3,
            errors: 2,
            concurrency: 2,
            elapsed: Duration::from_millis(1500),
            failures: vec!["refused".into(), "refused".into()],
            ..RunReport::default()
        }
    }

    fn write_log(path: &Path, report: &RunReport) -> PathBuf {
        let mut log = MetricsLog::create(path).unwrap();
        log.write_report(report).unwrap();
        log.finish().unwrap()
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_console_summary_format() {
        assert_eq!(
            console_summary(&report()),
            "sent=3 errors=2 elapsed_sec=1.50 avg_msgs_per_sec=2.00"
        );
    }

    #[test]
    fn test_console_summary_zero_elapsed() {
        let report = RunReport {
            elapsed: Duration::ZERO,
            ..report()
        };
        assert_eq!(
            console_summary(&report),
            "sent=3 errors=2 elapsed_sec=0.00 avg_msgs_per_sec=0.00"
        );
    }

    #[test]
    fn test_write_metrics_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.jsonl");

        let written = write_log(&path, &report());
        assert_eq!(written, path);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], serde_json::json!({"event": "error", "error": "refused"}));
        assert_eq!(lines[1]["event"], "error");

        let summary = &lines[2];
        assert_eq!(summary["event"], "summary");
        assert_eq!(summary["sent"], 3);
        assert_eq!(summary["errors"], 2);
        assert_eq!(summary["concurrency"], 2);
        assert_eq!(summary["elapsed_sec"], 1.5);
        assert_eq!(summary["rate_avg"], 2.0);
    }

    #[test]
    fn test_setup_errors_precede_send_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.jsonl");
        let report = RunReport {
            setup_failures: vec![SetupFailure {
                worker_id: 3,
                error: "authentication failed: 535".into(),
            }],
            ..report()
        };

        write_log(&path, &report);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["event"], "setup_error");
        assert_eq!(lines[0]["worker"], 3);
        assert_eq!(lines[3]["event"], "summary");
    }

    #[test]
    fn test_create_truncates_previous_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.jsonl");
        std::fs::write(&path, "stale\nstale\n").unwrap();

        let log = MetricsLog::create(&path).unwrap();
        assert_eq!(log.records(), 0);
        log.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_append_counts_records() {
        let dir = TempDir::new().unwrap();
        let mut log = MetricsLog::create(dir.path().join("m.jsonl")).unwrap();

        log.append(&MetricsRecord::Error {
            error: "timed out after 10s".into(),
        })
        .unwrap();
        log.write_report(&RunReport::default()).unwrap();

        assert_eq!(log.records(), 2);
        let path = log.finish().unwrap();
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_reports_path() {
        // Larger than the write buffer, so the device error surfaces while serializing
        let mut log = MetricsLog::create("/dev/full").unwrap();
        let err = log
            .append(&MetricsRecord::Error {
                error: "x".repeat(64 * 1024),
            })
            .unwrap_err();

        assert!(matches!(err, ReportError::Io { .. }), "got {err:?}");
        assert!(err.to_string().contains("/dev/full"));
    }

    #[test]
    fn test_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("metrics.jsonl");

        let err = MetricsLog::create(&path).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
        assert!(err.to_string().contains("missing"));
    }
}

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::StatsError;

use super::json::DecodeStats;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (cancellation).
    Warning,
    /// Error-level event (malformed input, task failure).
    Error,
    /// Critical error (the file could not be opened or read).
    Critical,
}

impl IngestionSeverity {
    /// Severity of a per-file failure.
    pub fn for_error(e: &StatsError) -> Self {
        match e {
            StatsError::FileOpen { .. } | StatsError::Read { .. } | StatsError::Io(_) => {
                IngestionSeverity::Critical
            }
            StatsError::Cancelled { .. } => IngestionSeverity::Warning,
            _ => IngestionSeverity::Error,
        }
    }
}

/// Context about one decoded file.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// The input file.
    pub path: PathBuf,
}

/// Observer interface for per-file outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts. Callbacks run on worker threads.
pub trait IngestionObserver: Send + Sync {
    /// Called when a file decodes to the end.
    fn on_success(&self, _ctx: &IngestionContext, _stats: DecodeStats) {}

    /// Called when a file fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &StatsError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &StatsError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Report a file outcome to `observer`, alerting at or above `alert_at_or_above`.
pub fn report_outcome(
    observer: &dyn IngestionObserver,
    alert_at_or_above: IngestionSeverity,
    ctx: &IngestionContext,
    outcome: Result<DecodeStats, &StatsError>,
) {
    match outcome {
        Ok(stats) => observer.on_success(ctx, stats),
        Err(e) => {
            let sev = IngestionSeverity::for_error(e);
            observer.on_failure(ctx, sev, e);
            if sev >= alert_at_or_above {
                observer.on_alert(ctx, sev, e);
            }
        }
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: DecodeStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &StatsError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &StatsError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs file outcomes through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: DecodeStats) {
        tracing::debug!(
            path = %ctx.path.display(),
            records = stats.records,
            invalid_records = stats.invalid_records,
            "file decoded"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &StatsError) {
        tracing::warn!(path = %ctx.path.display(), ?severity, %error, "file failed");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &StatsError) {
        tracing::error!(path = %ctx.path.display(), ?severity, %error, "file failed (alert)");
    }
}

/// Appends file outcomes to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: DecodeStats) {
        self.append_line(&format!(
            "{} ok path={} records={} invalid={}",
            unix_ts(),
            ctx.path.display(),
            stats.records,
            stats.invalid_records
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &StatsError) {
        self.append_line(&format!(
            "{} fail severity={:?} path={} err={}",
            unix_ts(),
            severity,
            ctx.path.display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &StatsError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} path={} err={}",
            unix_ts(),
            severity,
            ctx.path.display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_observer_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("ingest.log");
        let obs = FileObserver::new(&log);
        let ctx = IngestionContext {
            path: PathBuf::from("books.json"),
        };

        obs.on_success(&ctx, DecodeStats { records: 3, invalid_records: 1 });
        let err = StatsError::Cancelled {
            path: ctx.path.clone(),
        };
        report_outcome(&obs, IngestionSeverity::Warning, &ctx, Err(&err));

        let text = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("ok path=books.json records=3 invalid=1"));
        assert!(lines[1].contains("fail severity=Warning"));
        assert!(lines[2].contains("ALERT"));
    }

    #[test]
    fn severity_ranks_open_failures_highest() {
        let open = StatsError::FileOpen {
            path: PathBuf::from("x.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(IngestionSeverity::for_error(&open), IngestionSeverity::Critical);
        let parse = StatsError::JsonParse {
            path: PathBuf::from("x.json"),
            source: serde_json::from_str::<serde_json::Value>("[").unwrap_err(),
        };
        assert_eq!(IngestionSeverity::for_error(&parse), IngestionSeverity::Error);
        assert!(IngestionSeverity::Critical > IngestionSeverity::Error);
    }
}

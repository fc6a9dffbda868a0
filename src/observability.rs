//! Stage observers: the pipeline's logging hooks.
//!
//! Every stage reports its start, progress messages, success (with row stats) and failure
//! (with a computed [`Severity`]) to an optional [`PipelineObserver`]. Failures at or above the
//! configured alert threshold are additionally sent to [`PipelineObserver::on_alert`].

use std::error::Error as StdError;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;
use crate::ingestion::csv::write_csv_to_writer;
use crate::pipeline::Stage;
use crate::types::DataSet;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (stage failed).
    Error,
    /// Critical error (I/O, missing inputs, unreachable database).
    Critical,
}

/// Context about a stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageContext {
    /// Stage being run.
    pub stage: Stage,
}

/// Stats reported when a stage succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Rows produced or checked by the stage.
    pub rows: usize,
    /// Files written by the stage.
    pub artifacts: Vec<PathBuf>,
}

/// Observer interface for stage outcomes.
///
/// Implementors can record logs or trigger alerts. All methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    /// Called before a stage starts.
    fn on_start(&self, _ctx: &StageContext) {}

    /// Free-form progress message from inside a stage.
    fn on_message(&self, _ctx: &StageContext, _message: &str) {}

    /// Called when a stage succeeds.
    fn on_success(&self, _ctx: &StageContext, _stats: &StageStats) {}

    /// Called when a stage fails.
    fn on_failure(&self, _ctx: &StageContext, _severity: Severity, _error: &Error) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &Error) {
        self.on_failure(ctx, severity, error)
    }
}

/// Severity of a stage failure.
pub fn severity_for_error(e: &Error) -> Severity {
    match e {
        Error::Io(_) | Error::FileNotFound { .. } | Error::Connection { .. } => Severity::Critical,
        Error::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        Error::Json(err) if error_chain_contains_io(err) => Severity::Critical,
        _ => Severity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }

    /// Add one more observer.
    pub fn push(&mut self, observer: Arc<dyn PipelineObserver>) {
        self.observers.push(observer);
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_start(&self, ctx: &StageContext) {
        for o in &self.observers {
            o.on_start(ctx);
        }
    }

    fn on_message(&self, ctx: &StageContext, message: &str) {
        for o in &self.observers {
            o.on_message(ctx, message);
        }
    }

    fn on_success(&self, ctx: &StageContext, stats: &StageStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &Error) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &Error) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Forwards stage events to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_start(&self, ctx: &StageContext) {
        tracing::info!(stage = %ctx.stage, "stage started");
    }

    fn on_message(&self, ctx: &StageContext, message: &str) {
        tracing::info!(stage = %ctx.stage, "{message}");
    }

    fn on_success(&self, ctx: &StageContext, stats: &StageStats) {
        tracing::info!(
            stage = %ctx.stage,
            rows = stats.rows,
            artifacts = ?stats.artifacts,
            "stage completed"
        );
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &Error) {
        tracing::error!(stage = %ctx.stage, ?severity, error = %error, "stage failed");
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &Error) {
        tracing::error!(stage = %ctx.stage, ?severity, error = %error, alert = true, "stage failed");
    }
}

/// Appends stage events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored. The parent
    /// directory is created on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_start(&self, ctx: &StageContext) {
        self.append_line(&format!("{} start stage={}", unix_ts(), ctx.stage));
    }

    fn on_message(&self, ctx: &StageContext, message: &str) {
        self.append_line(&format!("{} info stage={} {}", unix_ts(), ctx.stage, message));
    }

    fn on_success(&self, ctx: &StageContext, stats: &StageStats) {
        self.append_line(&format!(
            "{} ok stage={} rows={} artifacts={:?}",
            unix_ts(),
            ctx.stage,
            stats.rows,
            stats.artifacts
        ));
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &Error) {
        self.append_line(&format!(
            "{} fail severity={:?} stage={} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            error
        ));
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &Error) {
        self.append_line(&format!(
            "{} ALERT severity={:?} stage={} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            error
        ));
    }
}

/// First `n` rows of `dataset` rendered as CSV (header included), for log messages.
pub fn preview(dataset: &DataSet, n: usize) -> String {
    let head: Vec<usize> = (0..dataset.row_count().min(n)).collect();
    let mut wtr = ::csv::Writer::from_writer(Vec::new());
    if write_csv_to_writer(&mut wtr, &dataset.take_rows(&head)).is_err() {
        return String::new();
    }
    wtr.into_inner()
        .map(|bytes| String::from_utf8_lossy(&bytes).trim_end().to_string())
        .unwrap_or_default()
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

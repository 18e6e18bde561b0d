//! Sweep progress events and where they go.
//!
//! The sweep never prints. It reports to an injected [`EventSink`]:
//!
//! - [`LogSink`] forwards to the `log` facade
//! - [`JournalSink`] also appends timestamped lines to a run log file
//! - [`MemorySink`] keeps events in memory (tests, embedding)

use std::fmt;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Local;
use log::{debug, info, warn};

use crate::domain::{EvaluationResult, FoldFailure};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    ConfigStarted {
        label: String,
        folds: usize,
    },
    FoldFinished {
        label: String,
        fold: usize,
        test_groups: Vec<String>,
        n_test: usize,
    },
    FoldFailed {
        label: String,
        failure: FoldFailure,
    },
    ConfigScored {
        label: String,
        folds_ok: usize,
        folds_total: usize,
        evaluation: EvaluationResult,
    },
    ConfigFailed {
        label: String,
        reason: String,
    },
    SweepFinished {
        scored: usize,
        failed: usize,
        best: Option<(String, f64)>,
        elapsed: Duration,
    },
}

impl SweepEvent {
    fn level(&self) -> log::Level {
        match self {
            SweepEvent::FoldFinished { .. } => log::Level::Debug,
            SweepEvent::FoldFailed { .. } | SweepEvent::ConfigFailed { .. } => log::Level::Warn,
            _ => log::Level::Info,
        }
    }
}

impl fmt::Display for SweepEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepEvent::ConfigStarted { label, folds } => {
                write!(f, "[{label}] started: {folds} folds")
            }
            SweepEvent::FoldFinished {
                label,
                fold,
                test_groups,
                n_test,
            } => write!(
                f,
                "[{label}] fold {fold} done: {n_test} test samples from {}",
                test_groups.join(",")
            ),
            SweepEvent::FoldFailed { label, failure } => write!(
                f,
                "[{label}] fold {} skipped ({:?} failed, test groups {}): {}",
                failure.fold,
                failure.stage,
                failure.test_groups.join(","),
                failure.message
            ),
            SweepEvent::ConfigScored {
                label,
                folds_ok,
                folds_total,
                evaluation: e,
            } => write!(
                f,
                "[{label}] n={} folds={folds_ok}/{folds_total} CI={:.4} spearman={:.4} (p={:.3e}) pearson={:.4} (p={:.3e})",
                e.n_samples,
                e.concordance_index,
                e.spearman_corr,
                e.spearman_pvalue,
                e.pearson_corr,
                e.pearson_pvalue
            ),
            SweepEvent::ConfigFailed { label, reason } => write!(f, "[{label}] failed: {reason}"),
            SweepEvent::SweepFinished {
                scored,
                failed,
                best,
                elapsed,
            } => {
                write!(
                    f,
                    "sweep finished in {:.2}s: {scored} scored, {failed} failed",
                    elapsed.as_secs_f64()
                )?;
                if let Some((label, ci)) = best {
                    write!(f, "; best {label} (CI={ci:.4})")?;
                }
                Ok(())
            }
        }
    }
}

/// Receiver of sweep events. Called from worker threads in parallel mode.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SweepEvent);
}

/// Forwards every event to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: &SweepEvent) {
        match event.level() {
            log::Level::Warn => warn!("{event}"),
            log::Level::Debug => debug!("{event}"),
            _ => info!("{event}"),
        }
    }
}

/// Appends `[timestamp] message` lines to a run log and forwards to [`LogSink`].
pub struct JournalSink {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl JournalSink {
    pub fn create(path: &Path) -> Result<Self, AppError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir)
                .map_err(|e| AppError::new(4, format!("Failed to create log dir: {e}")))?;
        }
        let file = File::create(path)
            .map_err(|e| AppError::new(4, format!("Failed to create run log: {e}")))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a free-form line (run header, config echo).
    pub fn note(&self, line: &str) {
        self.write_line(line);
    }

    fn write_line(&self, line: &str) {
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(file, "[{ts}] {line}").and_then(|_| file.flush()) {
            warn!("Failed to write run log {}: {e}", self.path.display());
        }
    }
}

impl EventSink for JournalSink {
    fn record(&self, event: &SweepEvent) {
        // Per-fold successes only go to the terminal at debug level.
        if event.level() != log::Level::Debug {
            self.write_line(&event.to_string());
        }
        LogSink.record(event);
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SweepEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SweepEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &SweepEvent) {
        // A panicking recorder must not hide later events.
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

//! Batch driver: single-file mode and the worker-pool fan-out.
//!
//! Every binary is an independent task. Outcomes are reported in the order
//! they complete, failures never stop the batch, and an interrupt cancels
//! the tasks that have not started yet.

pub mod cancel;

pub use cancel::{install_interrupt_handler, CancelToken};

use crate::config::{DatasetConfig, MANIFEST_FILE_NAME};
use crate::dataset::manifest::{Manifest, ManifestEntry};
use crate::dataset::{process_file, FileReport};
use crate::error::{DatasetError, Result};
use crate::io::{file_name_of, list_files};
use indicatif::{ProgressBar, ProgressStyle};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Printed once when an interrupt is observed.
pub const INTERRUPT_MESSAGE: &str = "Process interrupted by user. Cancelling remaining tasks...";

/// What happened to one file.
#[derive(Debug)]
pub enum TaskStatus {
    /// `process_file` returned, successfully or with an error
    Done(Result<FileReport>),
    /// Skipped because cancellation was requested before it started
    Cancelled,
    /// The worker panicked
    Panicked(String),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub status: TaskStatus,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Done(Ok(_)))
    }
}

/// Totals of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub reports: Vec<FileReport>,
    /// `(file name, error text)`
    pub failed: Vec<(String, String)>,
    /// `(file name, panic message)`
    pub panicked: Vec<(String, String)>,
    pub cancelled: usize,
    pub interrupted: bool,
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `job` for one file, turning panics into an outcome instead of unwinding.
fn run_task<F>(path: &Path, config: &DatasetConfig, cancel: &CancelToken, job: &F) -> FileOutcome
where
    F: Fn(&Path, &Path, &DatasetConfig) -> Result<FileReport>,
{
    let file_name = file_name_of(path);
    if cancel.is_cancelled() {
        debug!(binary = %file_name, "Cancelled before start");
        return FileOutcome {
            file_name,
            status: TaskStatus::Cancelled,
        };
    }
    let output = config.output_path_for(path);
    let status = match panic::catch_unwind(AssertUnwindSafe(|| job(path, &output, config)))
    {
        Ok(result) => TaskStatus::Done(result),
        Err(payload) => TaskStatus::Panicked(panic_message(payload)),
    };
    FileOutcome { file_name, status }
}

/// Status line for an outcome; `position` is `(completed, total)` in batch mode.
pub fn status_line(outcome: &FileOutcome, position: Option<(usize, usize)>) -> Option<String> {
    let name = &outcome.file_name;
    match &outcome.status {
        TaskStatus::Done(Ok(_)) => Some(match position {
            Some((idx, total)) => format!("[{}/{}] Successfully processed {}", idx, total, name),
            None => format!("Successfully processed {}", name),
        }),
        TaskStatus::Done(Err(e)) => Some(format!("[ERROR] Error processing {}: {}", name, e)),
        TaskStatus::Panicked(msg) => Some(format!(
            "[EXCEPTION] Unhandled exception processing {}: {}",
            name, msg
        )),
        TaskStatus::Cancelled => None,
    }
}

fn log_outcome(outcome: &FileOutcome) {
    match &outcome.status {
        TaskStatus::Done(Ok(_)) => {}
        TaskStatus::Done(Err(e)) => warn!(binary = %outcome.file_name, error = %e, "Binary failed"),
        TaskStatus::Panicked(msg) => error!(binary = %outcome.file_name, panic = %msg, "Worker panicked"),
        TaskStatus::Cancelled => debug!(binary = %outcome.file_name, "Binary cancelled"),
    }
}

/// Process one binary without the pool.
pub fn run_single(file: &Path, config: &DatasetConfig) -> Result<FileOutcome> {
    println!("Processing single file: {}", file.display());
    std::fs::create_dir_all(&config.label_output_dir)?;
    let outcome = run_task(file, config, &CancelToken::new(), &process_file);
    log_outcome(&outcome);
    if let Some(line) = status_line(&outcome, None) {
        println!("{}", line);
    }
    Ok(outcome)
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::with_template("Processing: {percent:>3}%|{wide_bar}| {pos}/{len} [{elapsed_precise}<{eta_precise}]")
    {
        pb.set_style(style);
    }
    pb
}

/// Process every regular file in `config.binary_dir` on a worker pool.
///
/// Only an output directory that cannot be created is an error. A binary
/// directory that cannot be listed is an empty batch.
pub fn run_batch(config: &DatasetConfig, cancel: &CancelToken) -> Result<BatchSummary> {
    run_batch_with(config, cancel, process_file)
}

/// `run_batch` with a custom per-file job, called as `job(input, csv, config)`.
pub fn run_batch_with<F>(
    config: &DatasetConfig,
    cancel: &CancelToken,
    job: F,
) -> Result<BatchSummary>
where
    F: Fn(&Path, &Path, &DatasetConfig) -> Result<FileReport> + Send + Sync + 'static,
{
    std::fs::create_dir_all(&config.label_output_dir)?;
    let files = match list_files(&config.binary_dir) {
        Ok(files) => files,
        Err(e) => {
            warn!(
                dir = %config.binary_dir.display(),
                error = %e,
                "Cannot list binary directory, nothing to process"
            );
            Vec::new()
        }
    };
    let total = files.len();
    let workers = config.effective_workers();
    info!(
        dir = %config.binary_dir.display(),
        files = total,
        workers,
        "Starting batch"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("mipsgt-worker-{}", i))
        .build()
        .map_err(|e| DatasetError::InvalidInput(format!("thread pool: {}", e)))?;

    let shared = Arc::new(config.clone());
    let job = Arc::new(job);
    let (tx, rx) = mpsc::channel::<FileOutcome>();
    for path in files {
        let tx = tx.clone();
        let config = Arc::clone(&shared);
        let cancel = cancel.clone();
        let job = Arc::clone(&job);
        pool.spawn(move || {
            let outcome = run_task(&path, &config, &cancel, &*job);
            // receiver outlives every task
            let _ = tx.send(outcome);
        });
    }
    drop(tx);

    let pb = progress_bar(total);
    let mut summary = BatchSummary {
        total,
        ..Default::default()
    };
    let mut completed = 0usize;
    let mut entries = Vec::new();

    loop {
        let outcome = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() && !summary.interrupted {
                    summary.interrupted = true;
                    pb.suspend(|| println!("{}", INTERRUPT_MESSAGE));
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if cancel.is_cancelled() && !summary.interrupted {
            summary.interrupted = true;
            pb.suspend(|| println!("{}", INTERRUPT_MESSAGE));
        }

        log_outcome(&outcome);
        if !matches!(outcome.status, TaskStatus::Cancelled) {
            completed += 1;
            pb.inc(1);
        }
        if let Some(line) = status_line(&outcome, Some((completed, total))) {
            pb.suspend(|| println!("{}", line));
        }

        let FileOutcome { file_name, status } = outcome;
        match status {
            TaskStatus::Done(Ok(report)) => {
                entries.push(ManifestEntry {
                    file: file_name,
                    report: Some(report.clone()),
                    error: None,
                });
                summary.reports.push(report);
            }
            TaskStatus::Done(Err(e)) => {
                entries.push(ManifestEntry {
                    file: file_name.clone(),
                    report: None,
                    error: Some(e.to_string()),
                });
                summary.failed.push((file_name, e.to_string()));
            }
            TaskStatus::Panicked(msg) => {
                entries.push(ManifestEntry {
                    file: file_name.clone(),
                    report: None,
                    error: Some(msg.clone()),
                });
                summary.panicked.push((file_name, msg));
            }
            TaskStatus::Cancelled => summary.cancelled += 1,
        }
    }
    pb.finish_and_clear();

    if config.write_manifest {
        let path = config.label_output_dir.join(MANIFEST_FILE_NAME);
        Manifest::new(entries).write_to(&path)?;
        debug!(path = %path.display(), "Wrote manifest");
    }

    info!(
        succeeded = summary.reports.len(),
        failed = summary.failed.len(),
        panicked = summary.panicked.len(),
        cancelled = summary.cancelled,
        "Batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: TaskStatus) -> FileOutcome {
        FileOutcome {
            file_name: "ls".to_string(),
            status,
        }
    }

    #[test]
    fn status_lines() {
        let err = outcome(TaskStatus::Done(Err(DatasetError::NoAllocatableSections)));
        assert_eq!(
            status_line(&err, Some((1, 3))).unwrap(),
            "[ERROR] Error processing ls: No section(s) in main memory."
        );
        let p = outcome(TaskStatus::Panicked("boom".to_string()));
        assert_eq!(
            status_line(&p, None).unwrap(),
            "[EXCEPTION] Unhandled exception processing ls: boom"
        );
        assert!(status_line(&outcome(TaskStatus::Cancelled), None).is_none());
    }

    #[test]
    fn panic_payloads() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7u32)), "unknown panic");
    }

    #[test]
    fn cancelled_token_skips_work() {
        let token = CancelToken::new();
        token.cancel();
        let cfg = DatasetConfig::default();
        let o = run_task(Path::new("/nonexistent/bin/ls"), &cfg, &token, &process_file);
        assert!(matches!(o.status, TaskStatus::Cancelled));
        assert!(!o.is_success());
    }

    #[test]
    fn missing_file_is_error_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DatasetConfig {
            label_output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let o = run_task(
            &dir.path().join("missing"),
            &cfg,
            &CancelToken::new(),
            &process_file,
        );
        assert!(matches!(o.status, TaskStatus::Done(Err(DatasetError::Io(_)))));
        assert!(!dir.path().join("missing.csv").exists());
    }

    #[test]
    fn panicking_job_becomes_outcome() {
        let cfg = DatasetConfig::default();
        let job = |_: &Path, _: &Path, _: &DatasetConfig| -> Result<FileReport> {
            panic!("decoder state corrupted")
        };
        let o = run_task(Path::new("/bins/ls"), &cfg, &CancelToken::new(), &job);
        assert_eq!(o.file_name, "ls");
        assert!(matches!(o.status, TaskStatus::Panicked(ref m) if m == "decoder state corrupted"));
    }
}

//! Concurrent batch scanning of a directory tree.
//!
//! Discovery walks the root once, then a fixed pool of worker threads pulls
//! file indices from a shared counter and streams [`ScanEvent`]s back over an
//! mpsc channel. The receiver side owns pacing; workers never block on a full
//! channel because the channel is unbounded.

use crate::cancel::CancelFlag;
use crate::config::{AuditConfig, ConfigError};
use crate::rules::{CompiledRules, Diagnostic, RuleOptions};
use crate::validator::{validate_file, FileResult, FileStatus};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const NO_FILES_MESSAGE: &str = "No spreadsheet files found.";

/// Streamed output of one batch scan.
#[derive(Debug)]
pub enum ScanEvent {
    /// One file finished validating.
    Result(FileResult),
    /// Running completion count, emitted after each result.
    Progress { completed: usize, total: usize },
    /// The scan is over; no further events follow. Fires exactly once.
    Finished,
}

/// Control side of a running scan.
pub struct ScanHandle {
    cancel: CancelFlag,
    coordinator: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Request cancellation. In-flight files report `Cancelled`; queued files
    /// are drained without being opened.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Block until every worker has exited and `Finished` has been sent.
    pub fn join(mut self) {
        if let Some(handle) = self.coordinator.take() {
            let _ = handle.join();
        }
    }
}

/// Start a scan over `root`. Events arrive on the returned receiver;
/// `concurrency` is clamped to at least one worker.
pub fn scan(
    root: &Path,
    config: AuditConfig,
    options: RuleOptions,
    concurrency: usize,
) -> Result<(ScanHandle, Receiver<ScanEvent>), ConfigError> {
    config.validate()?;
    let compiled = CompiledRules::compile(&config)?;

    let cancel = CancelFlag::new();
    let (tx, rx) = mpsc::channel();

    let root = root.to_path_buf();
    let workers = concurrency.max(1);
    let flag = cancel.clone();
    let coordinator = thread::spawn(move || {
        run_scan(root, config, compiled, options, flag, workers, tx);
    });

    Ok((
        ScanHandle {
            cancel,
            coordinator: Some(coordinator),
        },
        rx,
    ))
}

/// Candidate files under `root`, in path order. Lock files (`~$` prefix)
/// and non-matching extensions are skipped.
pub fn discover_files(root: &Path, config: &AuditConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with("~$") {
            continue;
        }
        if extension_matches(&name, &config.spreadsheet_extensions) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

fn extension_matches(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.to_lowercase()))
}

fn run_scan(
    root: PathBuf,
    config: AuditConfig,
    compiled: CompiledRules,
    options: RuleOptions,
    cancel: CancelFlag,
    workers: usize,
    tx: Sender<ScanEvent>,
) {
    let files = discover_files(&root, &config);
    debug!(candidates = files.len(), workers, "scan starting");

    if files.is_empty() {
        let _ = tx.send(ScanEvent::Result(FileResult::info(NO_FILES_MESSAGE)));
        let _ = tx.send(ScanEvent::Finished);
        return;
    }

    let total = files.len();
    let shared = Arc::new(ScanShared {
        root,
        config,
        compiled,
        options,
        cancel,
        files,
        next: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    });

    let mut handles = Vec::with_capacity(workers.min(total));
    for _ in 0..workers.min(total) {
        let shared = Arc::clone(&shared);
        let tx = tx.clone();
        handles.push(thread::spawn(move || worker_loop(shared, tx)));
    }
    for handle in handles {
        let _ = handle.join();
    }
    let _ = tx.send(ScanEvent::Finished);
}

struct ScanShared {
    root: PathBuf,
    config: AuditConfig,
    compiled: CompiledRules,
    options: RuleOptions,
    cancel: CancelFlag,
    files: Vec<PathBuf>,
    next: AtomicUsize,
    completed: AtomicUsize,
}

fn worker_loop(shared: Arc<ScanShared>, tx: Sender<ScanEvent>) {
    loop {
        let index = shared.next.fetch_add(1, Ordering::Relaxed);
        let Some(path) = shared.files.get(index) else {
            return;
        };
        let result = validate_with_timeout(&shared, path);
        let completed = shared.completed.fetch_add(1, Ordering::Relaxed) + 1;
        // A dropped receiver aborts the batch quietly.
        if tx.send(ScanEvent::Result(result)).is_err() {
            return;
        }
        let _ = tx.send(ScanEvent::Progress {
            completed,
            total: shared.files.len(),
        });
    }
}

/// Validate one file on a helper thread so a pathological workbook cannot
/// stall the whole batch. On timeout the helper is abandoned; the cancel
/// flag it polls is the shared one, so a later cancel still reaches it.
fn validate_with_timeout(shared: &Arc<ScanShared>, path: &Path) -> FileResult {
    let timeout = Duration::from_millis(shared.config.file_timeout_ms);
    let (done_tx, done_rx) = mpsc::channel();
    let task = Arc::clone(shared);
    let task_path = path.to_path_buf();
    thread::spawn(move || {
        let result = validate_file(
            &task.root,
            &task_path,
            &task.config,
            &task.compiled,
            &task.options,
            &task.cancel,
        );
        let _ = done_tx.send(result);
    });

    match done_rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(path = %path.display(), ms = timeout.as_millis() as u64, "file timed out");
            FileResult {
                path: path.to_path_buf(),
                relative: path
                    .strip_prefix(&shared.root)
                    .unwrap_or(path)
                    .display()
                    .to_string(),
                status: FileStatus::Error,
                diagnostics: vec![Diagnostic::structural(format!(
                    "Timed out after {} ms",
                    timeout.as_millis()
                ))],
            }
        }
        Err(RecvTimeoutError::Disconnected) => FileResult {
            path: path.to_path_buf(),
            relative: path
                .strip_prefix(&shared.root)
                .unwrap_or(path)
                .display()
                .to_string(),
            status: FileStatus::Error,
            diagnostics: vec![Diagnostic::structural("Validation thread failed")],
        },
    }
}

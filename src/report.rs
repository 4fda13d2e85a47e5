//! Run reporting: console lines, append-only log files and the final summary.
//!
//! The [`Reporter`] is fed by the download engine from its single controlling
//! flow. Each terminal outcome is emitted the moment it is known; reporting
//! failures are logged and never change an outcome.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::download::{FilesystemError, Outcome, TaskOutcome};

/// Name of the log receiving one line per downloaded file.
pub const DOWNLOADS_LOG: &str = "downloads.log";

/// Name of the log receiving one line per permanently failed URL.
pub const ERRORS_LOG: &str = "errors.log";

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Distinct matching links on the page.
    pub found: usize,
    /// Files written this run.
    pub downloaded: usize,
    /// Files already present before the run.
    pub skipped: usize,
    /// URLs that failed permanently.
    pub failed: usize,
    /// URLs that went through the retry pass.
    pub retried: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} file(s): {} downloaded, {} already present, {} failed ({} retried)",
            self.found, self.downloaded, self.skipped, self.failed, self.retried
        )
    }
}

/// Where console lines go.
pub enum Console {
    /// Lines printed above an `indicatif` progress bar (interactive terminals).
    Progress(ProgressBar),
    /// Lines printed to stdout.
    Plain,
    /// Nothing printed.
    Silent,
    /// Lines kept in memory.
    Capture(Mutex<Vec<String>>),
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Progress(_) => "Progress",
            Self::Plain => "Plain",
            Self::Silent => "Silent",
            Self::Capture(_) => "Capture",
        };
        f.write_str(kind)
    }
}

impl Console {
    /// Builds a progress-bar console.
    #[must_use]
    pub fn progress() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self::Progress(bar)
    }

    /// Builds an in-memory console.
    #[must_use]
    pub fn capture() -> Self {
        Self::Capture(Mutex::new(Vec::new()))
    }

    fn line(&self, line: &str) {
        match self {
            Self::Progress(bar) => bar.println(line),
            Self::Plain => println!("{line}"),
            Self::Silent => {}
            Self::Capture(lines) => lines
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(line.to_string()),
        }
    }

    fn set_total(&self, total: usize) {
        if let Self::Progress(bar) = self {
            bar.set_length(total as u64);
        }
    }

    fn tick(&self) {
        if let Self::Progress(bar) = self {
            bar.inc(1);
        }
    }

    fn finish(&self) {
        if let Self::Progress(bar) = self {
            bar.finish_and_clear();
        }
    }
}

/// Append-only `downloads.log` and `errors.log` in the logs directory.
#[derive(Debug)]
pub struct LogFiles {
    dir: PathBuf,
    downloads: Mutex<File>,
    errors: Mutex<File>,
}

impl LogFiles {
    /// Creates `dir` if needed and opens both logs for appending.
    ///
    /// # Errors
    ///
    /// Returns [`FilesystemError::CreateDir`] when the directory or either
    /// file cannot be created.
    pub fn open(dir: &Path) -> Result<Self, FilesystemError> {
        std::fs::create_dir_all(dir).map_err(|e| FilesystemError::create_dir(dir, e))?;
        let open = |name: &str| {
            let path = dir.join(name);
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| FilesystemError::create_dir(path, e))
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            downloads: Mutex::new(open(DOWNLOADS_LOG)?),
            errors: Mutex::new(open(ERRORS_LOG)?),
        })
    }

    /// Directory holding the logs.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append(file: &Mutex<File>, name: &str, message: &str) {
        let line = format!("[{}] {message}\n", httpdate::fmt_http_date(SystemTime::now()));
        let mut file = file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!(log = name, error = %e, "failed to append to log file");
        }
    }

    fn downloaded(&self, filename: &str) {
        Self::append(&self.downloads, DOWNLOADS_LOG, filename);
    }

    fn failed(&self, url: &Url, reason: &str) {
        Self::append(&self.errors, ERRORS_LOG, &format!("{url} {reason}"));
    }
}

/// Aggregates outcomes and emits them to the console and log files.
#[derive(Debug)]
pub struct Reporter {
    console: Console,
    logs: Option<LogFiles>,
    found: AtomicUsize,
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
    outcomes: Mutex<Vec<TaskOutcome>>,
}

impl Reporter {
    /// Creates a reporter writing to `console` and, if given, the log files.
    #[must_use]
    pub fn new(console: Console, logs: Option<LogFiles>) -> Self {
        Self {
            console,
            logs,
            found: AtomicUsize::new(0),
            downloaded: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            retried: AtomicUsize::new(0),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// In-memory reporter without log files.
    #[must_use]
    pub fn capturing() -> Self {
        Self::new(Console::capture(), None)
    }

    /// Records how many links were discovered.
    pub fn begin(&self, found: usize) {
        self.found.store(found, Ordering::SeqCst);
        self.console.set_total(found);
        debug!(found, "run started");
    }

    /// Emits the intermediate line for a failed first attempt.
    pub fn first_attempt_failed(&self, url: &Url, reason: &str) {
        self.console
            .line(&format!("[!] Failed (attempt 1, will retry): {url}: {reason}"));
    }

    /// Records that the retry pass is starting with `count` tasks.
    pub fn begin_retry(&self, count: usize) {
        self.retried.store(count, Ordering::SeqCst);
        debug!(count, "retry pass started");
    }

    /// Emits a terminal outcome. Call exactly once per task.
    pub fn record(&self, outcome: TaskOutcome) {
        match &outcome.outcome {
            Outcome::Downloaded { .. } => {
                self.downloaded.fetch_add(1, Ordering::SeqCst);
                self.console
                    .line(&format!("[+] Downloaded: {}", outcome.filename));
                if let Some(logs) = &self.logs {
                    logs.downloaded(&outcome.filename);
                }
            }
            Outcome::SkippedExisting => {
                self.skipped.fetch_add(1, Ordering::SeqCst);
                self.console
                    .line(&format!("[-] File already exists: {}", outcome.filename));
            }
            Outcome::Failed { reason, .. } => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                self.console
                    .line(&format!("[!] Failed: {}: {reason}", outcome.url));
                if let Some(logs) = &self.logs {
                    logs.failed(&outcome.url, reason);
                }
            }
        }
        self.console.tick();
        self.outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(outcome);
    }

    /// Prints the summary line and returns the totals.
    pub fn finish(&self) -> RunSummary {
        let summary = self.summary();
        self.console.line(&summary.to_string());
        self.console.finish();
        summary
    }

    /// Current totals.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            found: self.found.load(Ordering::SeqCst),
            downloaded: self.downloaded.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            retried: self.retried.load(Ordering::SeqCst),
        }
    }

    /// Terminal outcomes in the order they were recorded.
    #[must_use]
    pub fn outcomes(&self) -> Vec<TaskOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Console lines kept by a capturing reporter; empty otherwise.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match &self.console {
            Console::Capture(lines) => lines
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone(),
            _ => Vec::new(),
        }
    }
}

//! Download engine: existence filter, two download phases and reporting.
//!
//! # Overview
//!
//! [`DownloadEngine::run`] takes the discovered links and:
//! 1. Assigns every URL its local filename
//! 2. Snapshots the output directory and skips names already present
//! 3. Fetches the rest with bounded concurrency
//! 4. Retries each first-pass failure once, after the first pass ends
//! 5. Returns the run totals
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use std::path::Path;
//! use webdl_core::download::{DownloadEngine, HttpClient};
//! use webdl_core::extract::FileType;
//! use webdl_core::report::Reporter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(10)?;
//! let links: BTreeSet<url::Url> = BTreeSet::new();
//! let file_type: FileType = "pdf".parse()?;
//! let reporter = Reporter::capturing();
//! let summary = engine
//!     .run(&HttpClient::default(), &links, &file_type, Path::new("./downloads"), &reporter)
//!     .await?;
//! println!("Downloaded: {}, Failed: {}", summary.downloaded, summary.failed);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::HttpClient;
use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::error::FilesystemError;
use super::filename::assign_filenames;
use super::filter::ExistingFiles;
use super::retry::RetryCoordinator;
use super::scheduler::Scheduler;
use super::task::{DownloadTask, TaskOutcome};
use crate::extract::FileType;
use crate::report::{Reporter, RunSummary};

/// Error type for download engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The output directory could not be prepared or written.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Download engine for one page's worth of files.
///
/// # Concurrency Model
///
/// - Each download runs in its own Tokio task inside a phase `JoinSet`
/// - A semaphore permit is acquired before starting each download
/// - The retry phase starts only after every first-phase task has ended
///
/// # Retry Behavior
///
/// - Every failed first attempt is retried exactly once
/// - No backoff: the barrier itself separates the attempts
#[derive(Debug, Clone, Copy)]
pub struct DownloadEngine {
    concurrency: usize,
}

impl DownloadEngine {
    /// Creates a new download engine with the given concurrency limit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use webdl_core::download::DownloadEngine;
    ///
    /// let engine = DownloadEngine::new(10).unwrap();
    /// assert_eq!(engine.concurrency(), 10);
    /// assert!(DownloadEngine::new(0).is_err());
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(concurrency, "creating download engine");
        Ok(Self { concurrency })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads every link not already present in `output_dir`.
    ///
    /// Each link is reported to `reporter` exactly once. The summary line
    /// is emitted even when the run stops on a filesystem failure, with the
    /// links that were never fetched reported failed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Filesystem`] if the output directory cannot be
    /// listed or created, or storage fails during a phase.
    ///
    /// Note: Individual download failures do NOT cause this method to error.
    #[instrument(skip_all, fields(links = links.len(), output_dir = %output_dir.display()))]
    pub async fn run(
        &self,
        client: &HttpClient,
        links: &BTreeSet<Url>,
        file_type: &FileType,
        output_dir: &Path,
        reporter: &Reporter,
    ) -> Result<RunSummary, EngineError> {
        reporter.begin(links.len());

        let tasks: Vec<DownloadTask> = assign_filenames(links, file_type.as_str())
            .into_iter()
            .map(|(url, filename)| DownloadTask::new(url, filename))
            .collect();

        let existing = match ExistingFiles::scan(output_dir).await {
            Ok(existing) => existing,
            Err(error) => return Err(abandon_run(tasks, error, reporter)),
        };
        let split = existing.partition(tasks);
        info!(
            to_fetch = split.to_fetch.len(),
            already_present = split.existing.len(),
            "filtered existing files"
        );
        for task in split.existing {
            reporter.record(TaskOutcome::skipped(task));
        }

        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            let error = FilesystemError::create_dir(output_dir, e);
            return Err(abandon_run(split.to_fetch, error, reporter));
        }

        let scheduler = Scheduler::new(client.clone(), output_dir, self.concurrency);
        let result = RetryCoordinator::new(&scheduler, reporter)
            .run(split.to_fetch)
            .await;

        let summary = reporter.finish();
        result?;
        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "download run complete"
        );
        Ok(summary)
    }
}

/// Reports every unfetched task as failed and closes the run's output
/// before returning `error`.
fn abandon_run(
    tasks: Vec<DownloadTask>,
    error: FilesystemError,
    reporter: &Reporter,
) -> EngineError {
    warn!(error = %error, pending = tasks.len(), "output directory unusable");
    let reason = error.to_string();
    for task in tasks {
        reporter.record(TaskOutcome::failed(task, reason.clone()));
    }
    reporter.finish();
    EngineError::Filesystem(error)
}

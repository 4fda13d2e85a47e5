//! Bounded-concurrency execution of one download phase.
//!
//! Every task of the phase is spawned into a [`JoinSet`] up front and waits
//! for a [`Semaphore`] permit before fetching. The controlling flow drains the
//! set with `join_next`, so each attempt is observed the moment it ends.
//!
//! # Concurrency Model
//!
//! - At most `concurrency` fetches are in flight; permits are released when
//!   the spawned task ends (RAII)
//! - Tokio's semaphore is fair, so tasks start in submission order
//! - A fatal storage error closes the semaphore before the failing task gives
//!   back its permit: in-flight fetches finish, tasks still waiting for a
//!   permit end as [`AttemptResult::Aborted`]
//! - Dropping the phase future drops the `JoinSet`, which aborts every task;
//!   each fetch's temporary file guard then removes its `.part` file

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::client::{FileFetcher, HttpClient};
use super::constants::{ABORTED_REASON, INTERNAL_ERROR_REASON};
use super::error::DownloadError;
use super::task::{DownloadTask, TaskStatus};

/// How one attempt ended.
#[derive(Debug)]
pub enum AttemptResult {
    /// Written under the final name.
    Succeeded {
        /// Body size.
        bytes: u64,
    },
    /// The fetch failed; the task may be retried.
    Failed(DownloadError),
    /// Never started because the phase was stopped.
    Aborted,
    /// The spawned task panicked.
    Panicked,
}

/// A task together with the result of its attempt.
#[derive(Debug)]
pub struct Attempted {
    /// The task, with its status updated to `Succeeded` or `Failed`.
    pub task: DownloadTask,
    /// The attempt result.
    pub result: AttemptResult,
}

/// Everything a finished phase hands back.
#[derive(Debug, Default)]
pub struct PhaseReport {
    /// Attempts in completion order.
    pub attempts: Vec<Attempted>,
    /// Reason of the storage failure that stopped the phase, if any.
    pub fatal: Option<String>,
}

impl PhaseReport {
    /// Number of attempts that ended in success.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.result, AttemptResult::Succeeded { .. }))
            .count()
    }
}

/// Runs download phases against one output directory.
#[derive(Debug, Clone)]
pub struct Scheduler {
    fetcher: Arc<dyn FileFetcher>,
    output_dir: PathBuf,
    concurrency: usize,
}

impl Scheduler {
    /// Creates a scheduler. `concurrency` is expected to be validated by the
    /// engine; zero is treated as one.
    #[must_use]
    pub fn new(client: HttpClient, output_dir: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self::with_fetcher(Arc::new(client), output_dir, concurrency)
    }

    /// Creates a scheduler that downloads through `fetcher`.
    #[must_use]
    pub fn with_fetcher(
        fetcher: Arc<dyn FileFetcher>,
        output_dir: impl Into<PathBuf>,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the directory files are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs `tasks` to completion and returns when every one has ended.
    ///
    /// `on_attempt` is called from the controlling flow as each attempt
    /// ends, before the next completion is awaited. Every task is passed to
    /// it exactly once, including tasks whose spawned future was lost. The
    /// scheduler never retries inline.
    #[instrument(skip(self, tasks, on_attempt), fields(tasks = tasks.len(), concurrency = self.concurrency))]
    pub async fn run_phase<F>(&self, tasks: Vec<DownloadTask>, mut on_attempt: F) -> PhaseReport
    where
        F: FnMut(&Attempted),
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();
        let mut outstanding = HashMap::with_capacity(tasks.len());

        for (index, task) in tasks.into_iter().enumerate() {
            outstanding.insert(index, task.clone());
            let attempt = run_attempt(
                Arc::clone(&self.fetcher),
                Arc::clone(&semaphore),
                self.output_dir.clone(),
                task.clone(),
            );
            join_set.spawn(async move {
                match AssertUnwindSafe(attempt).catch_unwind().await {
                    Ok(attempted) => (index, attempted),
                    Err(_) => {
                        warn!(url = %task.url, "download task panicked");
                        (index, lost_attempt(task))
                    }
                }
            });
        }

        let mut report = PhaseReport::default();
        while let Some(joined) = join_set.join_next().await {
            let attempted = match joined {
                Ok((index, attempted)) => {
                    outstanding.remove(&index);
                    attempted
                }
                Err(join_error) => {
                    // The task is reported from `outstanding` once the set is drained
                    warn!(error = %join_error, "download task did not complete");
                    continue;
                }
            };

            if let AttemptResult::Failed(error) = &attempted.result
                && error.is_fatal()
                && report.fatal.is_none()
            {
                warn!(error = %error, "storage failure, stopping new downloads in this phase");
                semaphore.close();
                report.fatal = Some(error.reason());
            }

            on_attempt(&attempted);
            report.attempts.push(attempted);
        }

        for attempted in lost_attempts(outstanding) {
            on_attempt(&attempted);
            report.attempts.push(attempted);
        }

        info!(
            attempted = report.attempts.len(),
            succeeded = report.succeeded(),
            stopped = report.fatal.is_some(),
            "phase complete"
        );
        report
    }
}

/// A failed attempt for a task whose spawned future ended without a result.
fn lost_attempt(mut task: DownloadTask) -> Attempted {
    task.status = TaskStatus::Failed(INTERNAL_ERROR_REASON.to_string());
    Attempted {
        task,
        result: AttemptResult::Panicked,
    }
}

/// Converts tasks that never produced a result, in submission order.
fn lost_attempts(outstanding: HashMap<usize, DownloadTask>) -> Vec<Attempted> {
    let mut lost: Vec<_> = outstanding.into_iter().collect();
    lost.sort_by_key(|(index, _)| *index);
    lost.into_iter().map(|(_, task)| lost_attempt(task)).collect()
}

async fn run_attempt(
    fetcher: Arc<dyn FileFetcher>,
    semaphore: Arc<Semaphore>,
    output_dir: PathBuf,
    mut task: DownloadTask,
) -> Attempted {
    // Permit is dropped when this function returns (RAII)
    let Ok(_permit) = Arc::clone(&semaphore).acquire_owned().await else {
        debug!(url = %task.url, "phase stopped before task started");
        task.status = TaskStatus::Failed(ABORTED_REASON.to_string());
        return Attempted {
            task,
            result: AttemptResult::Aborted,
        };
    };

    task.status = TaskStatus::InProgress;
    debug!(url = %task.url, attempt = %task.attempt, "attempt started");
    match fetcher
        .fetch_file(&task.url, &output_dir, &task.filename)
        .await
    {
        Ok(bytes) => {
            task.status = TaskStatus::Succeeded;
            Attempted {
                task,
                result: AttemptResult::Succeeded { bytes },
            }
        }
        Err(error) => {
            debug!(url = %task.url, error = %error, "attempt failed");
            if error.is_fatal() {
                // Closed before the permit is released, so no waiting task starts
                semaphore.close();
            }
            task.status = TaskStatus::Failed(error.reason());
            Attempted {
                task,
                result: AttemptResult::Failed(error),
            }
        }
    }
}

//! Per-URL download task state and terminal outcomes.

use std::fmt;

use serde::Serialize;
use url::Url;

/// Which attempt a task is on. A URL is attempted at most twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attempt {
    /// First pass.
    First,
    /// Single retry after the first pass has finished.
    Retry,
}

impl Attempt {
    /// Returns the attempt as a 1-based number.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Retry => 2,
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Lifecycle of a download task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting for a concurrency permit.
    Pending,
    /// A fetch is in flight.
    InProgress,
    /// The file was written under its final name.
    Succeeded,
    /// The current attempt failed with this reason.
    Failed(String),
}

/// One discovered file to fetch.
///
/// Owned by whichever phase is running it; the scheduler moves it into the
/// spawned task and receives it back with its new status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Absolute, fragment-free URL.
    pub url: Url,
    /// Basename under the output directory.
    pub filename: String,
    /// Current status.
    pub status: TaskStatus,
    /// Current attempt.
    pub attempt: Attempt,
}

impl DownloadTask {
    /// Creates a pending first-attempt task.
    #[must_use]
    pub fn new(url: Url, filename: impl Into<String>) -> Self {
        Self {
            url,
            filename: filename.into(),
            status: TaskStatus::Pending,
            attempt: Attempt::First,
        }
    }

    /// Re-queues a failed first attempt for the retry pass.
    #[must_use]
    pub fn into_retry(self) -> Self {
        Self {
            status: TaskStatus::Pending,
            attempt: Attempt::Retry,
            ..self
        }
    }

    /// Returns the failure reason if the task failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            TaskStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Written to disk.
    Downloaded {
        /// Body size.
        bytes: u64,
        /// The attempt that succeeded.
        attempt: Attempt,
    },
    /// A file with the same name was already present.
    SkippedExisting,
    /// Both attempts failed (or the second never ran).
    Failed {
        /// Reason of the last attempt.
        reason: String,
        /// The attempt that failed last.
        attempt: Attempt,
    },
}

/// Terminal record for one URL; reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    /// The task URL.
    pub url: Url,
    /// Its assigned basename.
    pub filename: String,
    /// How it ended.
    pub outcome: Outcome,
}

impl TaskOutcome {
    /// Builds the skipped outcome for a task whose file already exists.
    #[must_use]
    pub fn skipped(task: DownloadTask) -> Self {
        Self {
            url: task.url,
            filename: task.filename,
            outcome: Outcome::SkippedExisting,
        }
    }

    /// Builds the success outcome.
    #[must_use]
    pub fn downloaded(task: DownloadTask, bytes: u64) -> Self {
        let attempt = task.attempt;
        Self {
            url: task.url,
            filename: task.filename,
            outcome: Outcome::Downloaded { bytes, attempt },
        }
    }

    /// Builds the permanent failure outcome.
    #[must_use]
    pub fn failed(task: DownloadTask, reason: impl Into<String>) -> Self {
        let attempt = task.attempt;
        Self {
            url: task.url,
            filename: task.filename,
            outcome: Outcome::Failed {
                reason: reason.into(),
                attempt,
            },
        }
    }
}

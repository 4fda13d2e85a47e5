//! The single retry pass.
//!
//! A task is attempted at most twice:
//!
//! ```text
//! Pending(1) ──> Succeeded
//!            └─> Failed(1) ══ barrier ══> Pending(2) ──> Succeeded
//!                                                     └─> Failed(2)  (terminal)
//! ```
//!
//! The barrier is hard: the first phase's `JoinSet` is fully drained before
//! the retry phase spawns anything. Every failure kind is retried, 4xx
//! included. First-attempt failures are announced only once the retry pass
//! is certain to run.

use tracing::{info, instrument, warn};

use super::error::FilesystemError;
use super::scheduler::{AttemptResult, Attempted, PhaseReport, Scheduler};
use super::task::{Attempt, DownloadTask, TaskOutcome};
use crate::report::Reporter;

/// Runs the first pass, then one retry pass over its failures, reporting
/// every terminal outcome exactly once.
#[derive(Debug)]
pub struct RetryCoordinator<'a> {
    scheduler: &'a Scheduler,
    reporter: &'a Reporter,
}

impl<'a> RetryCoordinator<'a> {
    /// Creates a coordinator over `scheduler`, reporting to `reporter`.
    #[must_use]
    pub fn new(scheduler: &'a Scheduler, reporter: &'a Reporter) -> Self {
        Self {
            scheduler,
            reporter,
        }
    }

    /// Downloads `tasks` with one retry pass.
    ///
    /// Per-task failures never make this fail.
    ///
    /// # Errors
    ///
    /// Returns [`FilesystemError::StorageExhausted`] when either phase was
    /// stopped by a storage failure. All tasks are still reported: whatever
    /// had not succeeded by then is reported failed, and no retry pass runs
    /// after a stopped first pass.
    #[instrument(skip_all, fields(tasks = tasks.len()))]
    pub async fn run(&self, tasks: Vec<DownloadTask>) -> Result<(), FilesystemError> {
        let reporter = self.reporter;

        let first = self
            .scheduler
            .run_phase(tasks, |attempted| {
                if let AttemptResult::Succeeded { bytes } = &attempted.result {
                    reporter.record(TaskOutcome::downloaded(attempted.task.clone(), *bytes));
                }
            })
            .await;

        let PhaseReport { attempts, fatal } = first;
        let failed: Vec<DownloadTask> = attempts
            .into_iter()
            .filter(|a| !matches!(a.result, AttemptResult::Succeeded { .. }))
            .map(|a| a.task)
            .collect();

        if let Some(reason) = fatal {
            warn!(unfinished = failed.len(), "first pass stopped, skipping retry pass");
            for task in failed {
                self.record_final_failure(task);
            }
            return Err(self.storage_error(reason));
        }

        if failed.is_empty() {
            info!("all downloads succeeded on the first pass");
            return Ok(());
        }

        // Barrier: the first phase is fully joined at this point.
        for task in &failed {
            reporter.first_attempt_failed(&task.url, task.failure_reason().unwrap_or_default());
        }
        reporter.begin_retry(failed.len());
        info!(count = failed.len(), "starting retry pass");
        let retry_tasks = failed.into_iter().map(DownloadTask::into_retry).collect();

        let second = self
            .scheduler
            .run_phase(retry_tasks, |attempted| self.record_retry(attempted))
            .await;

        match second.fatal {
            Some(reason) => Err(self.storage_error(reason)),
            None => Ok(()),
        }
    }

    fn record_retry(&self, attempted: &Attempted) {
        debug_assert_eq!(attempted.task.attempt, Attempt::Retry);
        match &attempted.result {
            AttemptResult::Succeeded { bytes } => self
                .reporter
                .record(TaskOutcome::downloaded(attempted.task.clone(), *bytes)),
            _ => self.record_final_failure(attempted.task.clone()),
        }
    }

    fn record_final_failure(&self, task: DownloadTask) {
        let reason = task.failure_reason().unwrap_or_default().to_string();
        self.reporter.record(TaskOutcome::failed(task, reason));
    }

    fn storage_error(&self, reason: String) -> FilesystemError {
        FilesystemError::storage_exhausted(self.scheduler.output_dir(), reason)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::{DownloadError, FileFetcher, HttpClient, Outcome};
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    /// Fails its first download with a full disk and succeeds afterwards.
    #[derive(Debug, Default)]
    struct FullDiskFetcher {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl FileFetcher for FullDiskFetcher {
        async fn fetch_file(
            &self,
            _url: &Url,
            output_dir: &Path,
            filename: &str,
        ) -> Result<u64, DownloadError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DownloadError::io(
                    output_dir.join(filename),
                    std::io::Error::new(
                        std::io::ErrorKind::StorageFull,
                        "no space left on device",
                    ),
                ));
            }
            Ok(1)
        }
    }

    fn task_for(server: &wiremock::MockServer, name: &str) -> DownloadTask {
        let url = Url::parse(&format!("{}/{name}", server.uri())).unwrap();
        DownloadTask::new(url, name)
    }

    #[tokio::test]
    async fn test_failure_then_success_is_downloaded_on_attempt_two() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/d.pdf"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/d.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"D".to_vec()))
            .mount(&mock_server)
            .await;

        let scheduler = Scheduler::new(HttpClient::default(), temp_dir.path(), 4);
        let reporter = Reporter::capturing();
        RetryCoordinator::new(&scheduler, &reporter)
            .run(vec![task_for(&mock_server, "d.pdf")])
            .await
            .unwrap();

        let outcomes = reporter.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].outcome,
            Outcome::Downloaded {
                bytes: 1,
                attempt: Attempt::Retry
            }
        );
        let retry_lines = reporter
            .lines()
            .iter()
            .filter(|l| l.contains("will retry"))
            .count();
        assert_eq!(retry_lines, 1);
        assert_eq!(reporter.summary().retried, 1);
        assert_eq!(std::fs::read(temp_dir.path().join("d.pdf")).unwrap(), b"D");
    }

    #[tokio::test]
    async fn test_persistent_failure_is_attempted_exactly_twice() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/e.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&mock_server)
            .await;

        let scheduler = Scheduler::new(HttpClient::default(), temp_dir.path(), 4);
        let reporter = Reporter::capturing();
        RetryCoordinator::new(&scheduler, &reporter)
            .run(vec![task_for(&mock_server, "e.pdf")])
            .await
            .unwrap();

        assert_eq!(
            reporter.outcomes()[0].outcome,
            Outcome::Failed {
                reason: "HTTP 404".to_string(),
                attempt: Attempt::Retry
            }
        );
        assert_eq!(reporter.summary().failed, 1);
        mock_server.verify().await;
    }

    #[tokio::test]
    async fn test_no_retry_pass_when_everything_succeeds() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .expect(2)
            .mount(&mock_server)
            .await;

        let scheduler = Scheduler::new(HttpClient::default(), temp_dir.path(), 4);
        let reporter = Reporter::capturing();
        RetryCoordinator::new(&scheduler, &reporter)
            .run(vec![
                task_for(&mock_server, "a.pdf"),
                task_for(&mock_server, "b.pdf"),
            ])
            .await
            .unwrap();

        assert_eq!(reporter.summary().downloaded, 2);
        assert_eq!(reporter.summary().retried, 0);
    }

    #[tokio::test]
    async fn test_full_disk_stops_run_without_retry_pass() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Arc::new(FullDiskFetcher::default());
        let scheduler = Scheduler::with_fetcher(fetcher.clone(), temp_dir.path(), 1);
        let reporter = Reporter::capturing();
        let tasks: Vec<_> = ["a.pdf", "b.pdf", "c.pdf"]
            .iter()
            .map(|name| {
                let url = Url::parse(&format!("https://files.example.com/{name}")).unwrap();
                DownloadTask::new(url, *name)
            })
            .collect();

        let result = RetryCoordinator::new(&scheduler, &reporter).run(tasks).await;

        assert!(matches!(
            result,
            Err(FilesystemError::StorageExhausted { .. })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let outcomes = reporter.outcomes();
        assert_eq!(outcomes.len(), 3);
        let urls: HashSet<_> = outcomes.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(urls.len(), 3);

        let aborted = outcomes
            .iter()
            .filter(|o| {
                o.outcome
                    == Outcome::Failed {
                        reason: "aborted".to_string(),
                        attempt: Attempt::First,
                    }
            })
            .count();
        assert_eq!(aborted, 2);
        assert!(outcomes.iter().any(|o| matches!(
            &o.outcome,
            Outcome::Failed { reason, .. } if reason.starts_with("IO error")
        )));

        let summary = reporter.summary();
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.retried, 0);
        assert!(
            !reporter.lines().iter().any(|l| l.contains("will retry")),
            "{:?}",
            reporter.lines()
        );
    }
}

//! Existence filter: skip tasks whose file is already in the output directory.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, instrument};

use super::error::FilesystemError;
use super::task::DownloadTask;

/// Read-only snapshot of the filenames present in the output directory.
///
/// Taken once before any download starts and never refreshed, so files the
/// current run writes do not affect filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingFiles {
    names: HashSet<String>,
}

/// Result of [`ExistingFiles::partition`].
#[derive(Debug, Default)]
pub struct Partitioned {
    /// Tasks whose file is missing.
    pub to_fetch: Vec<DownloadTask>,
    /// Tasks whose exact filename is already present.
    pub existing: Vec<DownloadTask>,
}

impl ExistingFiles {
    /// Lists `dir` once. A directory that does not exist yet is empty.
    ///
    /// Subdirectories are ignored; any other entry counts as present.
    ///
    /// # Errors
    ///
    /// Returns [`FilesystemError::ReadDir`] when the directory exists but
    /// cannot be listed.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub async fn scan(dir: &Path) -> Result<Self, FilesystemError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("output directory absent, nothing exists yet");
                return Ok(Self::default());
            }
            Err(e) => return Err(FilesystemError::read_dir(dir, e)),
        };

        let mut names = HashSet::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FilesystemError::read_dir(dir, e))?
        {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if is_dir {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }

        debug!(count = names.len(), "snapshot of existing files");
        Ok(Self { names })
    }

    /// Builds a snapshot from known names, without touching the filesystem.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if a file with exactly this name is present.
    #[must_use]
    pub fn contains(&self, filename: &str) -> bool {
        self.names.contains(filename)
    }

    /// Number of names in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Splits tasks into those to fetch and those already present.
    ///
    /// Input order is preserved within each side.
    #[must_use]
    pub fn partition(&self, tasks: Vec<DownloadTask>) -> Partitioned {
        let (existing, to_fetch) = tasks
            .into_iter()
            .partition(|task| self.contains(&task.filename));
        Partitioned { to_fetch, existing }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    fn task(name: &str) -> DownloadTask {
        let url = Url::parse(&format!("https://example.com/{name}")).unwrap();
        DownloadTask::new(url, name)
    }

    fn names(tasks: &[DownloadTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.filename.as_str()).collect()
    }

    #[test]
    fn test_partition_skips_exact_matches_only() {
        let existing = ExistingFiles::from_names(["a.pdf", "B.pdf"]);
        let split = existing.partition(vec![task("a.pdf"), task("b.pdf"), task("c.pdf")]);
        assert_eq!(names(&split.existing), vec!["a.pdf"]);
        assert_eq!(names(&split.to_fetch), vec!["b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_empty_snapshot_fetches_everything() {
        let split = ExistingFiles::default().partition(vec![task("a.pdf"), task("b.pdf")]);
        assert!(split.existing.is_empty());
        assert_eq!(split.to_fetch.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = ExistingFiles::scan(&temp_dir.path().join("not-yet"))
            .await
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_scan_lists_files_and_ignores_directories() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::create_dir(temp_dir.path().join("b.pdf")).unwrap();

        let snapshot = ExistingFiles::scan(temp_dir.path()).await.unwrap();
        assert!(snapshot.contains("a.pdf"));
        assert!(!snapshot.contains("b.pdf"));
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_on_a_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();

        let result = ExistingFiles::scan(&file).await;
        assert!(matches!(result, Err(FilesystemError::ReadDir { .. })));
    }
}

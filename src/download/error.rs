//! Error types for the download module.
//!
//! A [`DownloadError`] describes why a single fetch attempt failed. The
//! scheduler converts it into a `Failed(reason)` task status at the task
//! boundary; it never aborts a batch on its own.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a single file download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-2xx HTTP response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing or renaming the download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or not fetchable.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns true when the error means the destination can no longer be
    /// written at all, so continuing the phase is pointless.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Io { source, .. } => matches!(
                source.kind(),
                ErrorKind::StorageFull | ErrorKind::ReadOnlyFilesystem
            ),
            _ => false,
        }
    }

    /// Short reason used in console lines and the error log.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Network { source, .. } => format!("network error: {source}"),
            Self::Timeout { .. } => "timeout".to_string(),
            Self::HttpStatus { status, .. } => format!("HTTP {status}"),
            Self::Io { source, .. } => format!("IO error: {source}"),
            Self::InvalidUrl { .. } => "invalid URL".to_string(),
        }
    }
}

/// Fatal errors about the destination or log directories.
///
/// Unlike [`DownloadError`], these stop the run.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// A directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The destination directory could not be listed.
    #[error("cannot list directory {path}: {source}")]
    ReadDir {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Storage became unwritable while downloading.
    #[error("storage failure in {path}: {reason}")]
    StorageExhausted {
        /// The output directory.
        path: PathBuf,
        /// Reason reported by the failing download.
        reason: String,
    },
}

impl FilesystemError {
    /// Creates a `CreateDir` error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a `ReadDir` error.
    pub fn read_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a `StorageExhausted` error.
    pub fn storage_exhausted(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StorageExhausted {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the url
// or path for context, so callers go through the helper constructors.

//! webdl core library
//!
//! Downloads every file of a chosen type linked from a single web page:
//! discovers the links, skips files already on disk, fetches the rest with
//! bounded concurrency and retries each failure once after the first pass.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`page`] - Page sources (plain HTTP or headless Chromium)
//! - [`extract`] - Link extraction from HTML
//! - [`download`] - Existence filter, scheduler, retry pass and HTTP client
//! - [`report`] - Console lines, log files and run summary
//! - [`pipeline`] - One complete run wiring the above together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod extract;
pub mod page;
pub mod pipeline;
pub mod report;
#[cfg(test)]
pub mod test_support;
pub mod user_agent;

// Re-export commonly used types
pub use download::{
    ClientOptions, DEFAULT_CONCURRENCY, DownloadEngine, DownloadError, DownloadTask, EngineError,
    ExistingFiles, FileFetcher, FilesystemError, HttpClient, Outcome, TaskOutcome,
};
pub use extract::{ExtractionError, FileType, extract_links, parse_page_url};
pub use page::{
    BrowserKind, HttpPageSource, PageContext, PageFetchError, PageSource, RenderOptions,
    RenderedPageSource,
};
pub use pipeline::{PipelineError, RunRequest, run};
pub use report::{Console, LogFiles, Reporter, RunSummary};

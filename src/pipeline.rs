//! One program run: fetch the page, extract links, download them.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

use crate::download::{DownloadEngine, EngineError, FilesystemError, HttpClient};
use crate::extract::{ExtractionError, FileType, extract_links};
use crate::page::{PageContext, PageFetchError, PageSource};
use crate::report::{RunSummary, Reporter};

/// What to download and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Page whose links are collected.
    pub page_url: Url,
    /// Extension to collect.
    pub file_type: FileType,
    /// Destination directory, created if absent.
    pub output_dir: PathBuf,
    /// Concurrent downloads (1-100).
    pub concurrency: usize,
}

/// Top-level error for [`run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The page could not be obtained; nothing was downloaded.
    #[error(transparent)]
    PageFetch(#[from] PageFetchError),

    /// The page could not be parsed for links.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The run configuration was rejected by the engine.
    #[error(transparent)]
    Engine(EngineError),

    /// A directory could not be prepared or storage failed mid-run.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl From<EngineError> for PipelineError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Filesystem(e) => Self::Filesystem(e),
            other => Self::Engine(other),
        }
    }
}

/// Fetches the page through `source` without downloading anything.
///
/// # Errors
///
/// Returns [`PageFetchError`] when the page cannot be obtained.
#[instrument(skip_all, fields(source = source.name(), url = %url))]
pub async fn fetch_page(
    source: &dyn PageSource,
    url: &Url,
    file_type: &FileType,
) -> Result<PageContext, PageFetchError> {
    let html = source.fetch_html(url).await?;
    Ok(PageContext {
        url: url.clone(),
        html,
        file_type: file_type.clone(),
    })
}

/// Runs the whole pipeline: page → links → existence filter → downloads
/// with one retry pass → summary.
///
/// The engine is validated before the page is fetched, so a bad
/// concurrency value costs no network traffic.
///
/// # Errors
///
/// Returns [`PipelineError`] for page fetch failures, unusable page URLs,
/// invalid concurrency, and filesystem failures. Per-file download failures
/// are reported through `reporter` and never make this fail.
#[instrument(skip_all, fields(url = %request.page_url, file_type = %request.file_type))]
pub async fn run(
    request: &RunRequest,
    source: &dyn PageSource,
    client: &HttpClient,
    reporter: &Reporter,
) -> Result<RunSummary, PipelineError> {
    let engine = DownloadEngine::new(request.concurrency)?;

    let page = fetch_page(source, &request.page_url, &request.file_type).await?;
    let links = extract_links(&page.html, &page.url, &page.file_type)?;
    info!(found = links.len(), "links extracted");

    let summary = engine
        .run(
            client,
            &links,
            &page.file_type,
            &request.output_dir,
            reporter,
        )
        .await?;
    Ok(summary)
}

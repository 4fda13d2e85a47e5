//! HTTP client wrapper for page fetches and streaming file downloads.
//!
//! Bodies are streamed to a hidden `.<name>.part` file next to the final
//! destination and renamed into place only after a complete, flushed write.
//! A drop guard removes the temporary file on every failure path, including
//! cancellation of the owning task.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, PART_SUFFIX, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Timeouts and identity applied to every request the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Total per-request timeout, body included.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            user_agent: user_agent::default_user_agent(),
        }
    }
}

/// HTTP client for downloading files with streaming support.
///
/// This client is designed to be created once and shared by every task of a
/// run, taking advantage of connection pooling. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use webdl_core::download::{ClientOptions, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(&ClientOptions::default())?;
/// let url = url::Url::parse("https://example.com/file.pdf")?;
/// let bytes = client.fetch_to_file(&url, Path::new("./downloads"), "file.pdf").await?;
/// println!("Downloaded {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static default
    /// configuration. This should never happen in practice.
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self::new(&ClientOptions::default())
            .expect("failed to build HTTP client with static configuration")
    }
}

impl HttpClient {
    /// Creates a client with the given timeouts and User-Agent.
    ///
    /// Gzip decompression is enabled.
    ///
    /// # Errors
    ///
    /// Returns the builder error when the User-Agent is not a valid header
    /// value or the TLS backend cannot initialise.
    pub fn new(options: &ClientOptions) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .gzip(true)
            .user_agent(options.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns the body decoded as text.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` on transport failure, timeout, or a non-2xx
    /// status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_text(&self, url: &Url) -> Result<String, DownloadError> {
        let response = self.send_get(url).await?;
        let text = response
            .text()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;
        debug!(len = text.len(), "fetched page body");
        Ok(text)
    }

    /// Downloads `url` into `output_dir/filename`, returning bytes written.
    ///
    /// The final name appears only after the whole body has been written and
    /// flushed; on any failure no file exists under either the final or the
    /// temporary name.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is not http/https
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - Writing or renaming on disk fails
    #[instrument(skip(self, output_dir), fields(url = %url, filename = %filename))]
    pub async fn fetch_to_file(
        &self,
        url: &Url,
        output_dir: &Path,
        filename: &str,
    ) -> Result<u64, DownloadError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(url.as_str()));
        }
        debug!("starting download");

        let response = self.send_get(url).await?;

        let final_path = output_dir.join(filename);
        let part = PartFile::new(output_dir, filename);
        let file = File::create(part.path())
            .await
            .map_err(|e| DownloadError::io(part.path(), e))?;

        let bytes_written = stream_to_file(file, response, url, part.path()).await?;

        tokio::fs::rename(part.path(), &final_path)
            .await
            .map_err(|e| DownloadError::io(final_path.clone(), e))?;
        part.disarm();

        info!(path = %final_path.display(), bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }

    async fn send_get(&self, url: &Url) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "non-success status");
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }

        Ok(response)
    }
}

/// Writes one URL's body to a file in a directory, returning its size.
///
/// The scheduler drives downloads through this trait; [`HttpClient`] is the
/// implementation used outside of tests.
#[async_trait]
pub trait FileFetcher: Send + Sync + fmt::Debug {
    /// Downloads `url` to `output_dir/filename`.
    async fn fetch_file(
        &self,
        url: &Url,
        output_dir: &Path,
        filename: &str,
    ) -> Result<u64, DownloadError>;
}

#[async_trait]
impl FileFetcher for HttpClient {
    async fn fetch_file(
        &self,
        url: &Url,
        output_dir: &Path,
        filename: &str,
    ) -> Result<u64, DownloadError> {
        self.fetch_to_file(url, output_dir, filename).await
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &Url,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url.as_str(), e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

/// Returns the temporary path used while `filename` is being written.
#[must_use]
pub fn part_path(output_dir: &Path, filename: &str) -> PathBuf {
    output_dir.join(format!(".{filename}{PART_SUFFIX}"))
}

/// Removes the temporary download file when dropped, unless disarmed.
///
/// Runs on error returns and when the owning future is dropped mid-stream.
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl PartFile {
    fn new(output_dir: &Path, filename: &str) -> Self {
        Self {
            path: part_path(output_dir, filename),
            armed: true,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed partial file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove partial file"),
        }
    }
}

//! Page sources: obtain the HTML of the page whose links are downloaded.
//!
//! Two implementations of [`PageSource`] exist:
//! - [`HttpPageSource`] - a plain GET through the shared [`HttpClient`](crate::download::HttpClient)
//! - [`RenderedPageSource`] - a DOM snapshot from headless Chromium, for
//!   pages that build their links with JavaScript
//!
//! Either failing is fatal for the run: nothing is downloaded.

mod http;
mod rendered;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::download::DownloadError;
use crate::extract::FileType;

pub use self::http::HttpPageSource;
pub use self::rendered::{DEFAULT_RENDER_TIMEOUT, RenderOptions, RenderedPageSource};

/// The fetched page plus what to look for in it. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// URL the page was requested from; base for relative links.
    pub url: Url,
    /// Raw or rendered HTML.
    pub html: String,
    /// Extension to collect.
    pub file_type: FileType,
}

/// Errors that prevent obtaining the page HTML.
#[derive(Debug, Error)]
pub enum PageFetchError {
    /// The plain HTTP fetch failed.
    #[error("failed to fetch page {url}: {source}")]
    Http {
        /// The page URL.
        url: String,
        /// The underlying download error.
        #[source]
        source: DownloadError,
    },

    /// The browser could not be started.
    #[error("failed to launch {browser}: {reason}\n  Suggestion: set browser_path in the config file or install Chrome/Chromium")]
    BrowserLaunch {
        /// The configured browser.
        browser: BrowserKind,
        /// Launch failure detail.
        reason: String,
    },

    /// The browser started but could not produce the page.
    #[error("failed to render page {url}: {reason}")]
    Render {
        /// The page URL.
        url: String,
        /// Failure detail.
        reason: String,
    },

    /// Rendering took longer than the configured limit.
    #[error("timed out after {}s rendering page {url}", .timeout.as_secs())]
    Timeout {
        /// The page URL.
        url: String,
        /// The limit that expired.
        timeout: Duration,
    },
}

impl PageFetchError {
    /// Creates an HTTP fetch error.
    pub fn http(url: &Url, source: DownloadError) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    /// Creates a render error.
    pub fn render(url: &Url, reason: impl fmt::Display) -> Self {
        Self::Render {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Capability: given a URL, return its HTML.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the HTML of `url`. Implementations enforce their own timeout.
    async fn fetch_html(&self, url: &Url) -> Result<String, PageFetchError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Browsers usable for rendering. All are Chromium-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    /// Google Chrome.
    #[default]
    Chrome,
    /// Chromium.
    Chromium,
    /// Microsoft Edge.
    Edge,
}

impl BrowserKind {
    /// Executable names searched on `PATH` when no explicit path is set.
    #[must_use]
    pub fn executable_names(self) -> &'static [&'static str] {
        match self {
            Self::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
            Self::Chromium => &["chromium", "chromium-browser"],
            Self::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chrome => "chrome",
            Self::Chromium => "chromium",
            Self::Edge => "edge",
        })
    }
}

/// Error for an unrecognised or unsupported browser name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported browser '{name}': {reason}")]
pub struct UnsupportedBrowser {
    /// The rejected name.
    pub name: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl FromStr for BrowserKind {
    type Err = UnsupportedBrowser;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "google-chrome" => Ok(Self::Chrome),
            "chromium" => Ok(Self::Chromium),
            "edge" | "msedge" | "microsoft-edge" => Ok(Self::Edge),
            "firefox" => Err(UnsupportedBrowser {
                name: s.to_string(),
                reason: "rendering drives the DevTools protocol; use chrome, chromium or edge",
            }),
            _ => Err(UnsupportedBrowser {
                name: s.to_string(),
                reason: "expected chrome, chromium or edge",
            }),
        }
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{BrowserKind, PageFetchError, PageSource};
use crate::user_agent;

/// Default limit for launching the browser and rendering the page.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for the headless browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Which Chromium-based browser to drive.
    pub browser: BrowserKind,
    /// Explicit executable; searched on `PATH` when unset.
    pub executable: Option<PathBuf>,
    /// User-Agent the browser presents.
    pub user_agent: String,
    /// Limit covering launch, navigation and snapshot.
    pub timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            browser: BrowserKind::default(),
            executable: None,
            user_agent: user_agent::default_user_agent(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

/// Renders the page in headless Chromium and returns the resulting DOM.
///
/// One browser process is launched per call and closed afterwards.
#[derive(Debug, Clone)]
pub struct RenderedPageSource {
    options: RenderOptions,
}

impl RenderedPageSource {
    /// Creates a source with the given browser settings.
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig, PageFetchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.options.timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.options.user_agent));

        match self.resolve_executable() {
            Some(path) => {
                debug!(path = %path.display(), "using browser executable");
                builder = builder.chrome_executable(path);
            }
            None if self.options.browser == BrowserKind::Edge => {
                return Err(PageFetchError::BrowserLaunch {
                    browser: self.options.browser,
                    reason: "no Edge executable found on PATH".to_string(),
                });
            }
            // chromiumoxide searches the usual Chrome/Chromium locations.
            None => {}
        }

        builder.build().map_err(|reason| PageFetchError::BrowserLaunch {
            browser: self.options.browser,
            reason,
        })
    }

    fn resolve_executable(&self) -> Option<PathBuf> {
        if let Some(path) = &self.options.executable {
            return Some(path.clone());
        }
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var).find_map(|dir| {
            self.options
                .browser
                .executable_names()
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| is_executable_file(candidate))
        })
    }

    async fn render(&self, url: &Url) -> Result<String, PageFetchError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| PageFetchError::BrowserLaunch {
                    browser: self.options.browser,
                    reason: e.to_string(),
                })?;

        // Drive the CDP connection until the browser goes away.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let snapshot = snapshot(&browser, url).await;

        if let Err(e) = browser.close().await {
            debug!(error = %e, "browser close failed");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "waiting for browser exit failed");
        }
        events.abort();

        snapshot
    }
}

async fn snapshot(browser: &Browser, url: &Url) -> Result<String, PageFetchError> {
    let page = browser
        .new_page(url.as_str())
        .await
        .map_err(|e| PageFetchError::render(url, e))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| PageFetchError::render(url, e))?;
    page.content()
        .await
        .map_err(|e| PageFetchError::render(url, e))
}

fn is_executable_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|m| m.is_file())
}

#[async_trait]
impl PageSource for RenderedPageSource {
    #[instrument(skip(self), fields(url = %url, browser = %self.options.browser))]
    async fn fetch_html(&self, url: &Url) -> Result<String, PageFetchError> {
        let timeout = self.options.timeout;
        let html = tokio::time::timeout(timeout, self.render(url))
            .await
            .map_err(|_| PageFetchError::Timeout {
                url: url.to_string(),
                timeout,
            })??;
        info!(len = html.len(), "page rendered");
        Ok(html)
    }

    fn name(&self) -> &'static str {
        "rendered"
    }
}

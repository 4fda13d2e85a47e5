use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use super::{PageFetchError, PageSource};
use crate::download::HttpClient;

/// Fetches the page with a plain HTTP GET. Scripts do not run.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: HttpClient,
}

impl HttpPageSource {
    /// Wraps the shared client; its timeouts apply to the page fetch.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_html(&self, url: &Url) -> Result<String, PageFetchError> {
        let html = self
            .client
            .fetch_text(url)
            .await
            .map_err(|e| PageFetchError::http(url, e))?;
        debug!(len = html.len(), "page fetched");
        Ok(html)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::DownloadError;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_http_page_source_returns_html() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let source = HttpPageSource::new(HttpClient::default());
        let url = Url::parse(&format!("{}/page", mock_server.uri())).unwrap();
        assert_eq!(source.fetch_html(&url).await.unwrap(), "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_http_page_source_404_is_fatal_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let source = HttpPageSource::new(HttpClient::default());
        let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();
        match source.fetch_html(&url).await {
            Err(PageFetchError::Http {
                source: DownloadError::HttpStatus { status, .. },
                ..
            }) => assert_eq!(status, 404),
            other => panic!("expected Http error, got {other:?}"),
        }
    }
}

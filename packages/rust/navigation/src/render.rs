//! Page-rendering collaborator used to obtain a site's DOM.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use docstitch_shared::{DocStitchError, Result};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for navigation requests.
const USER_AGENT: &str = concat!("docstitch/", env!("CARGO_PKG_VERSION"));

/// Produces rendered HTML for a page and raw text for auxiliary resources.
///
/// The bundled [`HttpRenderer`] returns server HTML as-is; a headless-browser
/// backend can be plugged in by implementing this trait.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Rendered DOM of `url` as HTML.
    async fn render(&self, url: &str) -> Result<String>;

    /// Body of an auxiliary resource such as `sitemap.xml`; `None` when absent.
    async fn fetch_text(&self, url: &str) -> Result<Option<String>>;
}

/// [`PageRenderer`] backed by plain HTTP GET requests.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| DocStitchError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| DocStitchError::Fetch(format!("{url}: {e}")))
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DocStitchError::Fetch(format!("{url}: HTTP {status}")));
        }
        response
            .text()
            .await
            .map_err(|e| DocStitchError::Fetch(format!("{url}: failed to read body: {e}")))
    }

    async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        let response = self.get(url).await?;
        match response.status() {
            status if status.is_success() => response
                .text()
                .await
                .map(Some)
                .map_err(|e| DocStitchError::Fetch(format!("{url}: failed to read body: {e}"))),
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(None),
            status => Err(DocStitchError::Fetch(format!("{url}: HTTP {status}"))),
        }
    }
}

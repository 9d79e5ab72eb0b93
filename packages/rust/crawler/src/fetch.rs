//! Page-fetch collaborator: one URL in, converted page out.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use docstitch_shared::{DocStitchError, Result};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("docstitch/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// A fetched page converted to Markdown.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub markdown: String,
    /// Absolute http(s) links found on the page, fragments stripped.
    pub links: Vec<String>,
}

impl FetchedPage {
    /// Whitespace-separated words in the Markdown body.
    pub fn word_count(&self) -> usize {
        docstitch_markdown::count_words(&self.markdown)
    }
}

/// Fetches a single page. The crawler layers concurrency, throttling and
/// scope rules on top of this.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// [`PageFetcher`] over HTTP: `reqwest` for transport, `htmd` for conversion.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| DocStitchError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        debug!(url, "fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DocStitchError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocStitchError::Fetch(format!("{url}: HTTP {status}")));
        }
        let final_url = response.url().clone();

        let body = response
            .text()
            .await
            .map_err(|e| DocStitchError::Fetch(format!("{url}: body read failed: {e}")))?;

        let converted = docstitch_markdown::convert(&body, final_url.as_str())?;
        let links = extract_links(&body, &final_url);

        Ok(FetchedPage {
            url: final_url.to_string(),
            title: converted.title,
            description: converted.description,
            markdown: converted.markdown,
            links,
        })
    }
}

/// All http(s) links in an HTML document, resolved against `base_url`.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&LINK_SEL)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .filter_map(|href| base_url.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn links_are_resolved_and_filtered() {
        let html = r##"<html><body>
            <a href="/page2">Page 2</a>
            <a href="https://external.com">External</a>
            <a href="#section">Anchor</a>
            <a href="relative/path#frag">Relative</a>
            <a href="mailto:me@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>
        </body></html>"##;
        let base = Url::parse("https://docs.example.com/page1").unwrap();
        let links = extract_links(html, &base);

        assert_eq!(
            links,
            [
                "https://docs.example.com/page2",
                "https://external.com/",
                "https://docs.example.com/relative/path",
            ]
        );
    }

    #[tokio::test]
    async fn http_fetcher_converts_page() {
        let server = MockServer::start().await;
        let page = r#"<html><head><title>Guide</title>
            <meta name="description" content="How to use it"></head>
            <body><main><h1>Guide</h1><p>Read <a href="/next">next</a>.</p></main></body></html>"#;
        Mock::given(method("GET"))
            .and(path("/guide"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let fetched = fetcher.fetch(&format!("{}/guide", server.uri())).await.unwrap();

        assert_eq!(fetched.url, format!("{}/guide", server.uri()));
        assert_eq!(fetched.title.as_deref(), Some("Guide"));
        assert_eq!(fetched.description.as_deref(), Some("How to use it"));
        assert!(fetched.markdown.contains("# Guide"));
        assert_eq!(fetched.links, [format!("{}/next", server.uri())]);
    }

    #[tokio::test]
    async fn http_fetcher_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, DocStitchError::Fetch(_)));
        assert!(err.to_string().contains("500"));
    }
}

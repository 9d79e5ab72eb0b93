//! Site navigation extraction.
//!
//! Recovers the reading order a site intends from its rendered start page.
//! Four strategies are tried in turn and the first non-empty result wins:
//! semantic navigation landmarks, menu-like lists, any internal links, and
//! finally the site's `sitemap.xml`.

mod render;
mod strategies;
mod tree;

use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use docstitch_shared::{AppConfig, DocStitchError, OrderedUrl, Result};

pub use render::{HttpRenderer, PageRenderer};
pub use strategies::{
    NAVIGATION_SELECTORS, PRIORITY_SELECTORS, SiteScope, link_cluster, pattern_lists,
    run_dom_chain, semantic_scan, sitemap_entries,
};
pub use tree::{NavigationNode, NavigationSource, NavigationTree, NodeId};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Time budgets for the extractor's external calls.
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Budget for rendering the start page.
    pub render_timeout: Duration,
    /// Budget for fetching `sitemap.xml`.
    pub sitemap_timeout: Duration,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for NavigationOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            render_timeout: Duration::from_secs(config.timeouts.render_secs),
            sitemap_timeout: Duration::from_secs(config.timeouts.sitemap_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Discovers the navigation hierarchy of one site.
pub struct NavigationExtractor {
    scope: SiteScope,
    renderer: Arc<dyn PageRenderer>,
    opts: NavigationOptions,
}

impl NavigationExtractor {
    pub fn new(
        base_url: &str,
        renderer: Arc<dyn PageRenderer>,
        opts: NavigationOptions,
    ) -> Result<Self> {
        Ok(Self {
            scope: SiteScope::new(base_url)?,
            renderer,
            opts,
        })
    }

    /// Run the strategy chain.
    ///
    /// `Ok(None)` means no strategy found anything. Failing to render the
    /// start page is an error; a missing or unreachable sitemap is not.
    #[instrument(skip_all, fields(url = %self.scope.base()))]
    pub async fn extract(&self) -> Result<Option<NavigationTree>> {
        let base = self.scope.base().as_str();
        let html = timeout(self.opts.render_timeout, self.renderer.render(base))
            .await
            .map_err(|_| {
                DocStitchError::Timeout(format!(
                    "rendering {base} took longer than {}s",
                    self.opts.render_timeout.as_secs()
                ))
            })??;

        let from_dom = {
            let doc = Html::parse_document(&html);
            run_dom_chain(&doc, &self.scope)
        };
        if let Some(tree) = from_dom {
            info!(source = ?tree.source(), entries = tree.len(), "navigation extracted");
            return Ok(Some(tree));
        }

        debug!("no navigation in page DOM, trying sitemap.xml");
        let tree = self.from_sitemap().await;
        match &tree {
            Some(tree) => info!(entries = tree.len(), "navigation extracted from sitemap"),
            None => info!("no navigation structure found"),
        }
        Ok(tree)
    }

    /// [`Self::extract`] flattened into reading order.
    pub async fn ordered_urls(&self) -> Result<Option<Vec<OrderedUrl>>> {
        Ok(self.extract().await?.map(|tree| tree.ordered_urls()))
    }

    async fn from_sitemap(&self) -> Option<NavigationTree> {
        let sitemap_url = self.scope.base().join("/sitemap.xml").ok()?;
        let fetched = timeout(
            self.opts.sitemap_timeout,
            self.renderer.fetch_text(sitemap_url.as_str()),
        )
        .await;

        match fetched {
            Ok(Ok(Some(xml))) => sitemap_entries(&xml, &self.scope),
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                warn!(error = %e, "sitemap fetch failed");
                None
            }
            Err(_) => {
                warn!(url = %sitemap_url, "sitemap fetch timed out");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Serves canned pages; unknown URLs fail like an unreachable host.
    struct CannedRenderer {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageRenderer for CannedRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| DocStitchError::Fetch(format!("{url}: unreachable")))
        }

        async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
            Ok(self.pages.get(url).cloned())
        }
    }

    fn fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/html")
            .join(name);
        std::fs::read_to_string(path).expect("read fixture")
    }

    fn extractor(base: &str, pages: &[(&str, String)]) -> NavigationExtractor {
        let renderer = CannedRenderer {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.clone()))
                .collect(),
        };
        NavigationExtractor::new(base, Arc::new(renderer), NavigationOptions::default())
            .expect("extractor")
    }

    #[tokio::test]
    async fn extract_prefers_dom_navigation() {
        let ex = extractor(
            "https://docs.example.com/guide/intro",
            &[("https://docs.example.com/guide/intro", fixture("docs_sidebar.html"))],
        );
        let urls = ex.ordered_urls().await.unwrap().expect("navigation");
        assert_eq!(urls.len(), 7);
        assert_eq!(urls[0].title, "Introduction");
    }

    #[tokio::test]
    async fn extract_falls_back_to_sitemap() {
        let ex = extractor(
            "https://docs.example.com/",
            &[
                ("https://docs.example.com/", "<html><body><p>Hi</p></body></html>".into()),
                ("https://docs.example.com/sitemap.xml", fixture("sitemap.xml")),
            ],
        );
        let tree = ex.extract().await.unwrap().expect("navigation");
        assert_eq!(tree.source(), NavigationSource::Sitemap);
        assert_eq!(tree.len(), 4);
    }

    #[tokio::test]
    async fn extract_returns_none_when_nothing_found() {
        let ex = extractor(
            "https://docs.example.com/",
            &[("https://docs.example.com/", "<html><body></body></html>".into())],
        );
        assert!(ex.extract().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn extract_fails_when_start_page_unreachable() {
        let ex = extractor("https://docs.example.com/", &[]);
        let err = ex.extract().await.unwrap_err();
        assert!(matches!(err, DocStitchError::Fetch(_)));
    }

    #[tokio::test]
    async fn extract_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("pattern_list.html")),
            )
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(Duration::from_secs(5)).unwrap();
        let ex = NavigationExtractor::new(
            &server.uri(),
            Arc::new(renderer),
            NavigationOptions::default(),
        )
        .unwrap();

        let tree = ex.extract().await.unwrap().expect("navigation");
        assert_eq!(tree.source(), NavigationSource::Pattern);
        let first = &tree.ordered_urls()[0];
        assert_eq!(first.title, "Home");
        assert_eq!(first.url, server.uri());
    }
}

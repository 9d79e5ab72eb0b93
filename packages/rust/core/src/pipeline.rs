//! End-to-end ordered crawl: navigation → depth crawl → stitched document.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use docstitch_crawler::{CrawlReport, DepthCrawler, PageFetcher, write_summary};
use docstitch_navigation::{NavigationExtractor, NavigationOptions, NavigationSource, PageRenderer};
use docstitch_shared::{CrawlConfig, DocStitchError, OrderedUrl, ProcessingResult, Result};

use crate::stitcher::{StitchOptions, StitchOutcome, stitch_crawled_content};

/// Navigation export written into the output directory.
pub const NAVIGATION_FILE: &str = "navigation_structure.json";

/// Subdirectory of the output directory that receives page artifacts.
pub const CONTENT_DIR: &str = "content";

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for long-running operations.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when one orchestrator input has finished, successfully or not.
    fn unit_finished(&self, result: &ProcessingResult, completed: usize, total: usize);
    /// Called once at the end with a one-line summary.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn unit_finished(&self, _result: &ProcessingResult, _completed: usize, _total: usize) {}
    fn done(&self, _summary: &str) {}
}

// ---------------------------------------------------------------------------
// Ordered crawl
// ---------------------------------------------------------------------------

/// Configuration for [`ordered_crawl`].
#[derive(Debug, Clone)]
pub struct OrderedCrawlConfig {
    pub start_url: String,
    /// Root of all outputs; artifacts go to `<output_dir>/content`.
    pub output_dir: PathBuf,
    pub crawl: CrawlConfig,
    pub navigation: NavigationOptions,
    /// Run navigation extraction before crawling.
    pub use_navigation: bool,
    /// Stitch the artifacts into one document after crawling.
    pub stitch: bool,
    pub stitch_options: StitchOptions,
}

/// Result of [`ordered_crawl`].
#[derive(Debug)]
pub struct OrderedCrawlResult {
    /// Entries in the extracted navigation, if any was found.
    pub navigation_pages: Option<usize>,
    pub navigation_source: Option<NavigationSource>,
    pub crawl: CrawlReport,
    pub content_dir: PathBuf,
    pub summary_path: PathBuf,
    pub stitch: Option<StitchOutcome>,
    pub elapsed: Duration,
}

/// Run the ordered crawl.
///
/// 1. Navigation extraction (optional, failures are not fatal)
/// 2. Depth crawl into `<output>/content`, plus `crawl_summary.md`
/// 3. Stitching (optional, needs at least one saved page)
#[instrument(skip_all, fields(url = %config.start_url, max_depth = config.crawl.max_depth))]
pub async fn ordered_crawl(
    config: &OrderedCrawlConfig,
    renderer: Arc<dyn PageRenderer>,
    fetcher: Arc<dyn PageFetcher>,
    progress: &dyn ProgressReporter,
) -> Result<OrderedCrawlResult> {
    let start = Instant::now();
    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir).map_err(|e| DocStitchError::io(output_dir, e))?;

    // --- Stage 1: Navigation ---
    let mut ordered: Option<Vec<OrderedUrl>> = None;
    let mut navigation_source = None;
    if config.use_navigation {
        progress.phase("Extracting navigation");
        let extractor =
            NavigationExtractor::new(&config.start_url, renderer, config.navigation.clone())?;
        match extractor.extract().await {
            Ok(Some(tree)) => {
                let path = output_dir.join(NAVIGATION_FILE);
                tree.export_structure(&path)?;
                debug!(outline = %tree.render_outline(), "navigation outline");
                info!(entries = tree.len(), path = %path.display(), "navigation exported");
                navigation_source = Some(tree.source());
                ordered = Some(tree.ordered_urls());
            }
            Ok(None) => info!("no navigation found, continuing without it"),
            Err(e) => warn!(error = %e, "navigation extraction failed, continuing without it"),
        }
    }

    // --- Stage 2: Crawl ---
    progress.phase("Crawling pages");
    let content_dir = output_dir.join(CONTENT_DIR);
    let crawler = DepthCrawler::new(config.crawl.clone(), fetcher);
    let report = crawler.crawl(&config.start_url, &content_dir).await?;
    let summary_path = write_summary(&content_dir, &report)?;

    // --- Stage 3: Stitch ---
    let stitch = if config.stitch && report.successful > 0 {
        progress.phase("Stitching document");
        match stitch_crawled_content(&content_dir, ordered.as_deref(), &config.stitch_options) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "stitching failed");
                None
            }
        }
    } else {
        None
    };

    let result = OrderedCrawlResult {
        navigation_pages: ordered.as_ref().map(Vec::len),
        navigation_source,
        crawl: report,
        content_dir,
        summary_path,
        stitch,
        elapsed: start.elapsed(),
    };

    progress.done(&format!(
        "{} pages saved, {} failed, {} skipped",
        result.crawl.successful, result.crawl.failed, result.crawl.skipped
    ));
    info!(
        saved = result.crawl.successful,
        navigation_pages = result.navigation_pages.unwrap_or(0),
        stitched = result.stitch.is_some(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "ordered crawl complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;

    use docstitch_crawler::FetchedPage;

    use crate::stitcher::{READING_GUIDE_FILE, STITCHED_FILE};

    const ROOT: &str = "https://docs.example.com/";

    struct CannedRenderer {
        html: Option<String>,
    }

    #[async_trait]
    impl PageRenderer for CannedRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            self.html
                .clone()
                .ok_or_else(|| DocStitchError::Fetch(format!("{url}: connection refused")))
        }

        async fn fetch_text(&self, _url: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    struct FakeFetcher {
        pages: HashMap<&'static str, (&'static str, Vec<String>)>,
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            let (title, links) = self
                .pages
                .get(url)
                .ok_or_else(|| DocStitchError::Fetch(format!("{url}: HTTP 404")))?;
            Ok(FetchedPage {
                url: url.to_string(),
                title: Some(title.to_string()),
                description: None,
                markdown: format!("{title} page. {}", "text ".repeat(60)),
                links: links.clone(),
            })
        }
    }

    fn fetcher() -> Arc<FakeFetcher> {
        let mut pages = HashMap::new();
        pages.insert(
            ROOT,
            (
                "Home",
                vec![
                    "https://docs.example.com/guide".to_string(),
                    "https://docs.example.com/api".to_string(),
                    "https://docs.example.com/changelog".to_string(),
                ],
            ),
        );
        pages.insert("https://docs.example.com/guide", ("Guide", vec![]));
        pages.insert("https://docs.example.com/api", ("API", vec![]));
        pages.insert("https://docs.example.com/changelog", ("Changelog", vec![]));
        Arc::new(FakeFetcher { pages })
    }

    const NAV_HTML: &str = r#"<html><body>
        <nav aria-label="main navigation"><ul>
          <li><a href="/api">API</a></li>
          <li><a href="/guide">Guide</a></li>
        </ul></nav>
        </body></html>"#;

    fn config(dir: &std::path::Path, use_navigation: bool) -> OrderedCrawlConfig {
        OrderedCrawlConfig {
            start_url: ROOT.to_string(),
            output_dir: dir.to_path_buf(),
            crawl: CrawlConfig {
                max_depth: 1,
                memory_threshold_percent: None,
                ..CrawlConfig::default()
            },
            navigation: NavigationOptions::default(),
            use_navigation,
            stitch: true,
            stitch_options: StitchOptions::default(),
        }
    }

    #[tokio::test]
    async fn full_run_writes_every_output() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(CannedRenderer {
            html: Some(NAV_HTML.to_string()),
        });

        let result = ordered_crawl(&config(dir.path(), true), renderer, fetcher(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.navigation_pages, Some(2));
        assert_eq!(result.navigation_source, Some(NavigationSource::Semantic));
        assert_eq!(result.crawl.successful, 4);
        assert!(dir.path().join(NAVIGATION_FILE).exists());
        assert!(result.summary_path.exists());

        let stitch = result.stitch.expect("stitched");
        assert_eq!(stitch.total_pages, 4);
        assert_eq!(stitch.matched, 2);
        assert_eq!(stitch.additional, 2);
        assert!(result.content_dir.join(READING_GUIDE_FILE).exists());

        let doc = std::fs::read_to_string(result.content_dir.join(STITCHED_FILE)).unwrap();
        let api = doc.find("### 📄 API").unwrap();
        let guide = doc.find("### 📄 Guide").unwrap();
        let home = doc.find("### 📄 Home").unwrap();
        assert!(api < guide && guide < home);
    }

    #[tokio::test]
    async fn navigation_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(CannedRenderer { html: None });

        let result = ordered_crawl(&config(dir.path(), true), renderer, fetcher(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.navigation_pages, None);
        assert!(!dir.path().join(NAVIGATION_FILE).exists());
        let stitch = result.stitch.expect("stitched");
        assert_eq!(stitch.matched, 0);
        assert_eq!(stitch.additional, 4);
        assert!(stitch.reading_guide_path.is_none());
    }

    #[tokio::test]
    async fn stitching_can_be_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(CannedRenderer { html: None });
        let mut cfg = config(dir.path(), false);
        cfg.stitch = false;

        let result = ordered_crawl(&cfg, renderer, fetcher(), &SilentProgress)
            .await
            .unwrap();

        assert!(result.stitch.is_none());
        assert_eq!(result.crawl.files_created().len(), 4);
        assert!(!result.content_dir.join(STITCHED_FILE).exists());
    }
}

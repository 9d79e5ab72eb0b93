//! Level-synchronous breadth-first crawler.
//!
//! Each depth level is fetched as one concurrent batch bounded by a
//! semaphore and the memory throttle. Level N+1 starts only after every
//! fetch of level N has resolved.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use docstitch_shared::{CrawlConfig, DocStitchError, Result, dedup_key, normalize_url};

use crate::artifact::ArtifactWriter;
use crate::fetch::{FetchedPage, PageFetcher};
use crate::scope::CrawlScope;
use crate::throttle::MemoryThrottle;

// ---------------------------------------------------------------------------
// CrawlReport
// ---------------------------------------------------------------------------

/// A page persisted during a crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledArtifact {
    /// Normalized URL of the page.
    pub url: String,
    pub path: PathBuf,
    pub depth: u32,
    pub title: String,
}

impl CrawledArtifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Summary of a completed crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub root_url: String,
    pub max_depth: u32,
    /// Fetches attempted, successful or not.
    pub total_crawled: usize,
    /// Pages persisted as artifacts.
    pub successful: usize,
    pub failed: usize,
    /// Fetched pages with too little content to keep.
    pub skipped: usize,
    /// Artifacts in the order they were written.
    pub artifacts: Vec<CrawledArtifact>,
    /// `(url, error)` pairs for failed fetches and writes.
    pub errors: Vec<(String, String)>,
    pub duration: Duration,
}

impl CrawlReport {
    pub fn files_created(&self) -> Vec<&Path> {
        self.artifacts.iter().map(|a| a.path.as_path()).collect()
    }

    /// Normalized page URL to artifact path.
    pub fn url_to_file(&self) -> HashMap<&str, &Path> {
        self.artifacts
            .iter()
            .map(|a| (a.url.as_str(), a.path.as_path()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Single-page extraction
// ---------------------------------------------------------------------------

/// Fetch one URL through `fetcher`, bounded by `timeout`.
pub async fn extract_page(
    fetcher: &dyn PageFetcher,
    url: &str,
    timeout: Duration,
) -> Result<FetchedPage> {
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(DocStitchError::Timeout(format!(
            "fetching {url} exceeded {}s",
            timeout.as_secs()
        ))),
    }
}

// ---------------------------------------------------------------------------
// DepthCrawler
// ---------------------------------------------------------------------------

/// Crawls a site down to `max_depth`, persisting pages as Markdown artifacts.
pub struct DepthCrawler {
    config: CrawlConfig,
    fetcher: Arc<dyn PageFetcher>,
    throttle: MemoryThrottle,
}

impl DepthCrawler {
    pub fn new(config: CrawlConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let throttle = match config.memory_threshold_percent {
            Some(threshold) => MemoryThrottle::new(threshold),
            None => MemoryThrottle::disabled(),
        };
        Self {
            config,
            fetcher,
            throttle,
        }
    }

    /// Replace the memory throttle.
    pub fn with_throttle(mut self, throttle: MemoryThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Fetch a single page under the configured fetch timeout.
    pub async fn extract_page(&self, url: &str) -> Result<FetchedPage> {
        extract_page(self.fetcher.as_ref(), url, self.config.fetch_timeout).await
    }

    /// Crawl from `start_url`, writing artifacts into `output_dir`.
    ///
    /// Per-page failures are recorded in the report. Errors are returned only
    /// for an unusable start URL or output directory.
    #[instrument(skip_all, fields(start_url = %start_url, max_depth = self.config.max_depth))]
    pub async fn crawl(&self, start_url: &str, output_dir: &Path) -> Result<CrawlReport> {
        let started = Instant::now();
        let scope = CrawlScope::new(start_url, &self.config)?;
        let mut writer = ArtifactWriter::new(output_dir)?;
        let semaphore = Semaphore::new(self.config.max_concurrent.max(1));

        let mut report = CrawlReport {
            root_url: start_url.to_string(),
            max_depth: self.config.max_depth,
            ..CrawlReport::default()
        };
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: Vec<String> = vec![start_url.to_string()];

        info!(
            max_concurrent = self.config.max_concurrent,
            min_word_count = self.config.min_word_count,
            "starting crawl"
        );

        for depth in 0..=self.config.max_depth {
            let batch: Vec<String> = frontier
                .drain(..)
                .filter(|url| visited.insert(dedup_key(url)))
                .collect();
            if batch.is_empty() {
                debug!(depth, "frontier exhausted");
                break;
            }
            info!(depth, pages = batch.len(), "crawling level");

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|url| self.fetch_one(&semaphore, url)),
            )
            .await;

            for (requested, outcome) in batch.iter().zip(outcomes) {
                report.total_crawled += 1;
                let page = match outcome {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(url = %requested, error = %e, "fetch failed");
                        report.failed += 1;
                        report.errors.push((requested.clone(), e.to_string()));
                        continue;
                    }
                };
                visited.insert(dedup_key(&page.url));

                let words = page.word_count();
                if words > self.config.min_word_count {
                    self.persist(&mut writer, &mut report, &page, depth);
                } else {
                    debug!(url = %page.url, words, "too little content, skipping");
                    report.skipped += 1;
                }

                if depth < self.config.max_depth {
                    frontier.extend(
                        page.links
                            .iter()
                            .filter(|link| scope.should_follow(link))
                            .filter(|link| !visited.contains(&dedup_key(link)))
                            .cloned(),
                    );
                }
            }
        }

        report.duration = started.elapsed();
        info!(
            total = report.total_crawled,
            successful = report.successful,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_ms = report.duration.as_millis() as u64,
            "crawl complete"
        );
        Ok(report)
    }

    async fn fetch_one(&self, semaphore: &Semaphore, url: &str) -> Result<FetchedPage> {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|e| DocStitchError::Fetch(format!("{url}: {e}")))?;
        self.throttle.wait_for_headroom().await;
        self.extract_page(url).await
    }

    fn persist(
        &self,
        writer: &mut ArtifactWriter,
        report: &mut CrawlReport,
        page: &FetchedPage,
        depth: u32,
    ) {
        let url = normalize_url(&page.url);
        match writer.write(&url, depth, page) {
            Ok(path) => {
                debug!(url = %url, path = %path.display(), "saved page");
                report.successful += 1;
                report.artifacts.push(CrawledArtifact {
                    url,
                    path,
                    depth,
                    title: page.title.clone().unwrap_or_default(),
                });
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed to save page");
                report.failed += 1;
                report.errors.push((url, e.to_string()));
            }
        }
    }
}

impl std::fmt::Debug for DepthCrawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepthCrawler")
            .field("config", &self.config)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

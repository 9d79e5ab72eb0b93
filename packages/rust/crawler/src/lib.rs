//! Depth-bounded site crawler.
//!
//! This crate provides:
//! - [`PageFetcher`]: the page-fetch collaborator, with [`HttpFetcher`] over `reqwest`
//! - [`DepthCrawler`]: level-synchronous BFS with a concurrency ceiling and memory throttle
//! - [`ArtifactWriter`]: Markdown artifacts with frontmatter, plus `crawl_summary.md`

pub mod artifact;
pub mod engine;
pub mod fetch;
pub mod scope;
pub mod throttle;

pub use artifact::{ArtifactWriter, SUMMARY_FILE, artifact_stem, render_summary, write_summary};
pub use engine::{CrawlReport, CrawledArtifact, DepthCrawler, extract_page};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher, extract_links};
pub use scope::CrawlScope;
pub use throttle::MemoryThrottle;

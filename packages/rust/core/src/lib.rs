//! Core workflows for docstitch.
//!
//! This crate ties navigation extraction, crawling, stitching and
//! multi-source processing into the two end-to-end operations the CLI
//! exposes: [`ordered_crawl`] and [`MultiSourceOrchestrator::process`].

pub mod anchor;
pub mod orchestrator;
pub mod pipeline;
pub mod processors;
pub mod stitcher;

pub use anchor::{anchor_id, section_anchor};
pub use orchestrator::{
    AggregateResult, COMPILATION_FILE, FailureSummary, MultiSourceOrchestrator, TypeCounts,
    exit_code, render_compilation,
};
pub use pipeline::{
    CONTENT_DIR, NAVIGATION_FILE, OrderedCrawlConfig, OrderedCrawlResult, ProgressReporter,
    SilentProgress, ordered_crawl,
};
pub use processors::{
    CommandConverter, ConvertedDocument, DocumentConverter, MarkdownProcessor, PdfProcessor,
    ProcessedSource, SourceProcessor, UrlProcessor,
};
pub use stitcher::{
    DocumentStitcher, READING_GUIDE_FILE, STITCHED_FILE, StitchOptions,
    StitchOutcome, stitch_crawled_content,
};

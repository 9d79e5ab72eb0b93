//! Shared types, error model, input classification and configuration for docstitch.
//!
//! This crate is the foundation depended on by all other docstitch crates.
//! It provides:
//! - [`DocStitchError`]: the unified error type
//! - Domain types ([`SourceType`], [`InputDescriptor`], [`ProcessingResult`], [`PageContent`], [`OrderedUrl`])
//! - Input classification and batch validation ([`classify`], [`validate_batch`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], [`OrchestratorConfig`], config loading)

pub mod config;
pub mod error;
pub mod input;
pub mod types;
pub mod urls;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSection, DefaultsConfig, OrchestratorConfig, PdfConfig,
    TimeoutsConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocStitchError, Result};
pub use input::{MAX_BATCH_SIZE, classify, parse_input_list, validate_batch};
pub use types::{
    InputDescriptor, OrderedUrl, PageContent, ProcessingResult, ResultMetadata, SourceType,
};
pub use urls::{dedup_key, normalize_url, url_path};

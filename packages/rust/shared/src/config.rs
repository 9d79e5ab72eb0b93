//! Application configuration for docstitch.
//!
//! User config lives at `~/.docstitch/docstitch.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocStitchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docstitch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docstitch";

// ---------------------------------------------------------------------------
// Config structs (matching docstitch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Depth crawl settings.
    #[serde(default)]
    pub crawl: CrawlSection,

    /// Time budgets for external calls.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// PDF conversion command.
    #[serde(default)]
    pub pdf: PdfConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory compiled output is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Width of the shared URL/Markdown processing pool.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum crawl depth from the root URL.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Whether to draw a progress spinner.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrency: default_max_concurrency(),
            max_depth: default_max_depth(),
            show_progress: true,
        }
    }
}

fn default_output_dir() -> String {
    "multi_input_crawl".into()
}
fn default_max_concurrency() -> usize {
    10
}
fn default_max_depth() -> u32 {
    2
}
fn default_true() -> bool {
    true
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Pages fetched concurrently within one depth level.
    #[serde(default = "default_crawl_concurrent")]
    pub max_concurrent: usize,

    /// Pause new fetches while system memory use is above this percentage.
    #[serde(default = "default_memory_threshold")]
    pub memory_threshold_percent: f64,

    /// Pages with this many words or fewer are not persisted.
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,

    /// URL substrings that are never followed.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            max_concurrent: default_crawl_concurrent(),
            memory_threshold_percent: default_memory_threshold(),
            min_word_count: default_min_word_count(),
            exclude_patterns: Vec::new(),
        }
    }
}

fn default_crawl_concurrent() -> usize {
    5
}
fn default_memory_threshold() -> f64 {
    70.0
}
fn default_min_word_count() -> usize {
    50
}

/// `[timeouts]` section, all values in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_fetch_secs")]
    pub fetch_secs: u64,
    #[serde(default = "default_render_secs")]
    pub render_secs: u64,
    #[serde(default = "default_sitemap_secs")]
    pub sitemap_secs: u64,
    #[serde(default = "default_conversion_secs")]
    pub conversion_secs: u64,
    /// Budget for one orchestrator unit end to end.
    #[serde(default = "default_unit_secs")]
    pub unit_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            fetch_secs: default_fetch_secs(),
            render_secs: default_render_secs(),
            sitemap_secs: default_sitemap_secs(),
            conversion_secs: default_conversion_secs(),
            unit_secs: default_unit_secs(),
        }
    }
}

fn default_fetch_secs() -> u64 {
    30
}
fn default_render_secs() -> u64 {
    30
}
fn default_sitemap_secs() -> u64 {
    10
}
fn default_conversion_secs() -> u64 {
    600
}
fn default_unit_secs() -> u64 {
    900
}

/// `[pdf]` section: external conversion command speaking JSON lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    #[serde(default = "default_pdf_command")]
    pub command: String,
    #[serde(default = "default_pdf_args")]
    pub args: Vec<String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            command: default_pdf_command(),
            args: default_pdf_args(),
        }
    }
}

fn default_pdf_command() -> String {
    "python3".into()
}
fn default_pdf_args() -> Vec<String> {
    vec!["-m".into(), "docstitch_convert".into()]
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config file + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum crawl depth from the root URL (root is depth 0).
    pub max_depth: u32,
    /// Pages fetched concurrently within one depth level.
    pub max_concurrent: usize,
    /// Memory ceiling in percent; `None` disables throttling.
    pub memory_threshold_percent: Option<f64>,
    /// Pages need strictly more words than this to be persisted.
    pub min_word_count: usize,
    /// URL substrings excluded from following.
    pub exclude_patterns: Vec<String>,
    /// Per-page fetch budget.
    pub fetch_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_depth: config.defaults.max_depth,
            max_concurrent: config.crawl.max_concurrent.max(1),
            memory_threshold_percent: Some(config.crawl.memory_threshold_percent),
            min_word_count: config.crawl.min_word_count,
            exclude_patterns: config.crawl.exclude_patterns.clone(),
            fetch_timeout: Duration::from_secs(config.timeouts.fetch_secs),
        }
    }
}

/// Runtime configuration for multi-source processing.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory the compiled document is written to.
    pub output_dir: PathBuf,
    /// Width of the shared URL/Markdown pool. PDFs always run one at a time.
    pub max_concurrency: usize,
    /// Budget for one unit end to end.
    pub unit_timeout: Duration,
    /// Budget for one PDF conversion call.
    pub conversion_timeout: Duration,
    /// Budget for downloading a remote PDF or fetching a page.
    pub fetch_timeout: Duration,
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.defaults.output_dir),
            max_concurrency: config.defaults.max_concurrency.max(1),
            unit_timeout: Duration::from_secs(config.timeouts.unit_secs),
            conversion_timeout: Duration::from_secs(config.timeouts.conversion_secs),
            fetch_timeout: Duration::from_secs(config.timeouts.fetch_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docstitch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocStitchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docstitch/docstitch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocStitchError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocStitchError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocStitchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DocStitchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocStitchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

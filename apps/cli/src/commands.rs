//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use docstitch_core::{
    AggregateResult, CommandConverter, MultiSourceOrchestrator, OrderedCrawlConfig,
    OrderedCrawlResult, ProgressReporter, SilentProgress, StitchOptions, ordered_crawl,
};
use docstitch_crawler::HttpFetcher;
use docstitch_navigation::{HttpRenderer, NavigationOptions};
use docstitch_shared::{
    AppConfig, CrawlConfig, InputDescriptor, OrchestratorConfig, ProcessingResult, SourceType,
    init_config, load_config, parse_input_list, validate_batch,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Output directory for `crawl` when none is given.
const DEFAULT_CRAWL_DIR: &str = "ordered_crawl";

/// Exit status after Ctrl-C.
const INTERRUPTED: u8 = 130;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docstitch: documentation crawling and multi-source compilation.
#[derive(Parser)]
#[command(
    name = "docstitch",
    version,
    about = "Crawl documentation in reading order and compile URLs, PDFs and Markdown into one document.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process URLs, PDFs and Markdown files into one compiled document.
    Process(ProcessArgs),

    /// Crawl a documentation site in navigation order and stitch the pages.
    Crawl(CrawlArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags shared by `process` and `crawl` that override the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct Overrides {
    /// Output directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent operations.
    #[arg(short = 'c', long)]
    pub max_concurrent: Option<usize>,

    /// Maximum crawl depth for URLs.
    #[arg(short = 'd', long)]
    pub max_depth: Option<u32>,

    /// URL patterns to exclude (repeatable).
    #[arg(short, long, num_args = 1..)]
    pub exclude: Vec<String>,

    /// Disable progress indicators.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ProcessArgs {
    /// Inputs in processing order: URLs, PDF files or Markdown files.
    #[arg(required_unless_present = "input_file", conflicts_with = "input_file")]
    pub inputs: Vec<String>,

    /// File listing one input per line (`#` starts a comment).
    #[arg(short = 'f', long, value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    /// Show what would be processed without processing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the aggregate result as JSON on stdout.
    #[arg(long)]
    pub json_output: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CrawlArgs {
    /// Starting URL.
    pub url: String,

    #[command(flatten)]
    pub overrides: Overrides,

    /// Skip navigation extraction; pages are stitched by depth and title.
    #[arg(long)]
    pub no_navigation: bool,

    /// Skip building the stitched document.
    #[arg(long)]
    pub no_stitch: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docstitch=info",
        1 => "docstitch=debug",
        _ => "docstitch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command and map the outcome to a process exit code.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Process(args) => cmd_process(args).await,
        Command::Crawl(args) => cmd_crawl(args).await,
        Command::Config { action } => {
            match action {
                ConfigAction::Init => cmd_config_init()?,
                ConfigAction::Show => cmd_config_show()?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Fold command-line overrides into the loaded config.
fn apply_overrides(config: &mut AppConfig, overrides: &Overrides) {
    if let Some(dir) = &overrides.output_dir {
        config.defaults.output_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(n) = overrides.max_concurrent {
        config.defaults.max_concurrency = n.max(1);
        config.crawl.max_concurrent = n.max(1);
    }
    if let Some(depth) = overrides.max_depth {
        config.defaults.max_depth = depth;
    }
    if !overrides.exclude.is_empty() {
        config.crawl.exclude_patterns = overrides.exclude.clone();
    }
    if overrides.no_progress {
        config.defaults.show_progress = false;
    }
}

fn reporter(show: bool) -> Box<dyn ProgressReporter> {
    if show {
        Box::new(CliProgress::new())
    } else {
        Box::new(SilentProgress)
    }
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

async fn cmd_process(args: ProcessArgs) -> Result<ExitCode> {
    let mut config = load_config()?;
    apply_overrides(&mut config, &args.overrides);

    let inputs = match &args.input_file {
        Some(path) => read_input_file(path)?,
        None => args.inputs.clone(),
    };
    let descriptors = validate_batch(inputs.as_slice())?;

    if !args.json_output {
        print_input_summary(&descriptors);
    }
    if args.dry_run {
        println!("Dry run: nothing was processed.");
        return Ok(ExitCode::SUCCESS);
    }

    let orchestrator_config = OrchestratorConfig::from(&config);
    let fetcher = Arc::new(HttpFetcher::new(orchestrator_config.fetch_timeout)?);
    let converter = Arc::new(CommandConverter::from(&config.pdf));
    let orchestrator =
        MultiSourceOrchestrator::with_collaborators(orchestrator_config, fetcher, converter)?;

    info!(
        inputs = inputs.len(),
        max_concurrency = config.defaults.max_concurrency,
        max_depth = config.defaults.max_depth,
        excluded = config.crawl.exclude_patterns.len(),
        "starting multi-source processing"
    );

    let progress = reporter(config.defaults.show_progress && !args.json_output);
    let result = tokio::select! {
        result = orchestrator.process(inputs.as_slice(), progress.as_ref()) => result?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Processing interrupted");
            return Ok(ExitCode::from(INTERRUPTED));
        }
    };

    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_process_summary(&result);
    }

    Ok(ExitCode::from(u8::try_from(result.exit_code()).unwrap_or(1)))
}

fn read_input_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read input file {}", path.display()))?;
    Ok(parse_input_list(&text)?)
}

/// Name shown for an input: the file name for local files, the full string for URLs.
fn display_source(input: &InputDescriptor) -> &str {
    if input.detected_type == SourceType::Url || input.raw.contains("://") {
        return &input.raw;
    }
    Path::new(&input.raw)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(&input.raw)
}

fn print_input_summary(inputs: &[InputDescriptor]) {
    println!();
    println!("  Processing {} inputs:", inputs.len());
    for source_type in [SourceType::Url, SourceType::Pdf, SourceType::Markdown] {
        let count = inputs
            .iter()
            .filter(|i| i.detected_type == source_type)
            .count();
        if count > 0 {
            println!("    {} {}: {count}", source_type.icon(), source_type.description());
        }
    }
    println!();
    for input in inputs {
        println!(
            "  {:>3}. {} {}",
            input.position + 1,
            input.detected_type.icon(),
            display_source(input)
        );
    }
    println!();
}

fn print_process_summary(result: &AggregateResult) {
    println!();
    println!("  Processing complete");
    println!("  Successful: {}/{}", result.successful, result.total_inputs);
    println!("  Failed:     {}", result.failed);
    println!("  Rate:       {:.1}%", result.success_rate * 100.0);
    println!("  Duration:   {:.1}s", result.duration_seconds);
    println!("  Speed:      {:.1} inputs/second", result.throughput);

    let by_type = &result.results_by_type;
    if by_type.urls + by_type.pdfs + by_type.markdown > 0 {
        println!();
        for (source_type, count) in [
            (SourceType::Url, by_type.urls),
            (SourceType::Pdf, by_type.pdfs),
            (SourceType::Markdown, by_type.markdown),
        ] {
            if count > 0 {
                println!("  {} {}: {count}", source_type.icon(), source_type.description());
            }
        }
    }

    if !result.failures.is_empty() {
        println!();
        println!("  Failures:");
        for failure in &result.failures {
            println!(
                "    #{} {}: {}",
                failure.position + 1,
                failure.source,
                failure.error
            );
        }
    }

    println!();
    println!("  Output: {}", result.output_path.display());
    println!();
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

async fn cmd_crawl(args: CrawlArgs) -> Result<ExitCode> {
    let mut config = load_config()?;
    if args.overrides.output_dir.is_none() {
        config.defaults.output_dir = DEFAULT_CRAWL_DIR.into();
    }
    apply_overrides(&mut config, &args.overrides);

    let crawl = CrawlConfig::from(&config);
    let navigation = NavigationOptions::from(&config);
    let renderer = Arc::new(HttpRenderer::new(navigation.render_timeout)?);
    let fetcher = Arc::new(HttpFetcher::new(crawl.fetch_timeout)?);

    let crawl_config = OrderedCrawlConfig {
        start_url: args.url.clone(),
        output_dir: PathBuf::from(&config.defaults.output_dir),
        crawl,
        navigation,
        use_navigation: !args.no_navigation,
        stitch: !args.no_stitch,
        stitch_options: StitchOptions::default(),
    };

    info!(
        url = %args.url,
        max_depth = crawl_config.crawl.max_depth,
        output = %crawl_config.output_dir.display(),
        "starting ordered crawl"
    );

    let progress = reporter(config.defaults.show_progress);
    let result = tokio::select! {
        result = ordered_crawl(&crawl_config, renderer, fetcher, progress.as_ref()) => result?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Crawl interrupted");
            return Ok(ExitCode::from(INTERRUPTED));
        }
    };

    print_crawl_summary(&result);
    Ok(ExitCode::SUCCESS)
}

fn print_crawl_summary(result: &OrderedCrawlResult) {
    let crawl = &result.crawl;
    println!();
    println!("  Ordered crawl complete");
    match result.navigation_pages {
        Some(pages) => println!("  Navigation: {pages} pages"),
        None => println!("  Navigation: not found"),
    }
    println!(
        "  Crawled:    {} ({} saved, {} failed, {} skipped)",
        crawl.total_crawled, crawl.successful, crawl.failed, crawl.skipped
    );
    println!("  Summary:    {}", result.summary_path.display());
    if let Some(stitch) = &result.stitch {
        println!(
            "  Stitched:   {} ({} in navigation order, {} additional)",
            stitch.document_path.display(),
            stitch.matched,
            stitch.additional
        );
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn unit_finished(&self, result: &ProcessingResult, completed: usize, total: usize) {
        let mark = if result.success { "✓" } else { "✗" };
        self.spinner.set_message(format!(
            "[{completed}/{total}] {mark} {} {}",
            result.input_type.icon(),
            result.source
        ));
    }

    fn done(&self, _summary: &str) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn process_accepts_positional_inputs_and_flags() {
        let cli = Cli::try_parse_from([
            "docstitch",
            "process",
            "https://docs.example.com/",
            "./paper.pdf",
            "--max-concurrent",
            "4",
            "--exclude",
            "/blog",
            "--json-output",
        ])
        .unwrap();

        let Command::Process(args) = cli.command else {
            panic!("expected process");
        };
        assert_eq!(args.inputs, ["https://docs.example.com/", "./paper.pdf"]);
        assert_eq!(args.overrides.max_concurrent, Some(4));
        assert_eq!(args.overrides.exclude, ["/blog"]);
        assert!(args.json_output);
    }

    #[test]
    fn process_rejects_inputs_alongside_input_file() {
        let parsed = Cli::try_parse_from([
            "docstitch",
            "process",
            "https://docs.example.com/",
            "--input-file",
            "inputs.txt",
        ]);
        assert!(parsed.is_err());
        assert!(Cli::try_parse_from(["docstitch", "process"]).is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = AppConfig::default();
        let overrides = Overrides {
            output_dir: Some(PathBuf::from("out")),
            max_concurrent: Some(0),
            max_depth: Some(4),
            exclude: vec!["/changelog".into()],
            no_progress: true,
        };
        apply_overrides(&mut config, &overrides);

        assert_eq!(config.defaults.output_dir, "out");
        assert_eq!(config.defaults.max_concurrency, 1);
        assert_eq!(config.crawl.max_concurrent, 1);
        assert_eq!(config.defaults.max_depth, 4);
        assert_eq!(config.crawl.exclude_patterns, ["/changelog"]);
        assert!(!config.defaults.show_progress);
    }

    #[test]
    fn empty_overrides_keep_config() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &Overrides::default());
        assert_eq!(config.defaults.max_concurrency, 10);
        assert_eq!(config.defaults.max_depth, 2);
        assert!(config.defaults.show_progress);
    }

    #[test]
    fn input_file_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inputs.txt");
        std::fs::write(
            &path,
            "# sources\nhttps://docs.example.com/\n\n./notes.md\n",
        )
        .unwrap();

        let inputs = read_input_file(&path).unwrap();
        assert_eq!(inputs, ["https://docs.example.com/", "./notes.md"]);
        assert!(read_input_file(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn local_inputs_display_by_file_name() {
        let descriptors =
            validate_batch(&["https://docs.example.com/a.pdf", "./docs/notes.md"][..]).unwrap();
        assert_eq!(display_source(&descriptors[0]), "https://docs.example.com/a.pdf");
        assert_eq!(display_source(&descriptors[1]), "notes.md");
    }
}

//! HTML-to-Markdown conversion, cleanup passes and artifact frontmatter.
//!
//! Pages are converted with the `htmd` crate and then run through a series
//! of cleanup passes. The same passes normalize Markdown produced elsewhere
//! (PDF conversion output, local Markdown files).

mod cleanup;
mod frontmatter;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use docstitch_shared::{DocStitchError, Result};

pub use frontmatter::{ArtifactHeader, split_frontmatter};

/// Description placeholder used when no suitable line exists.
pub const NO_DESCRIPTION: &str = "No description available";

const DESCRIPTION_MIN_LEN: usize = 20;
const DESCRIPTION_MAX_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of converting an HTML page to Markdown.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Cleaned Markdown body, no frontmatter.
    pub markdown: String,
    /// `<title>` text, falling back to the first H1.
    pub title: Option<String>,
    /// `<meta name="description">` content, if any.
    pub description: Option<String>,
    /// Whitespace-separated word count of `markdown`.
    pub word_count: usize,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert a full HTML page to clean Markdown.
///
/// Main content is located first (so navigation chrome is left out), tables
/// are rewritten to Markdown, the rest goes through `htmd`, and relative links
/// are resolved against `source_url`.
#[instrument(skip(html), fields(url = %source_url))]
pub fn convert(html: &str, source_url: &str) -> Result<ConvertResult> {
    let (content_html, head_title, description) = {
        let doc = Html::parse_document(html);
        (
            extract_content_html(&doc),
            document_title(&doc),
            meta_description(&doc),
        )
    };
    let content_html = preprocess_tables(&content_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "nav", "iframe", "noscript", "svg", "footer",
        ])
        .build();
    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| DocStitchError::Conversion(format!("htmd conversion failed: {e}")))?;

    let base_url = Url::parse(source_url).ok();
    let markdown = cleanup::run_pipeline(&raw_markdown, base_url.as_ref());

    let title = head_title.or_else(|| first_heading(&markdown));
    let word_count = count_words(&markdown);

    debug!(
        raw_len = raw_markdown.len(),
        final_len = markdown.len(),
        word_count,
        "conversion complete"
    );

    Ok(ConvertResult {
        markdown,
        title,
        description,
        word_count,
    })
}

/// Run the cleanup passes over Markdown that did not come from HTML.
pub fn normalize_markdown(md: &str) -> String {
    cleanup::run_pipeline(md, None)
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Text of the first `# ` heading line.
pub fn first_heading(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# +(.+?)\s*$").expect("valid regex"));

    H1_RE
        .captures(md)
        .map(|c| c[1].to_string())
        .filter(|t| !t.is_empty())
}

/// First non-heading line longer than 20 characters, capped at 200 characters plus `...`.
pub fn first_description(md: &str) -> Option<String> {
    md.lines()
        .map(str::trim)
        .find(|line| !line.starts_with('#') && line.chars().count() > DESCRIPTION_MIN_LEN)
        .map(|line| {
            if line.chars().count() > DESCRIPTION_MAX_LEN {
                let cut: String = line.chars().take(DESCRIPTION_MAX_LEN).collect();
                format!("{cut}...")
            } else {
                line.to_string()
            }
        })
}

/// Number of whitespace-separated words.
pub fn count_words(md: &str) -> usize {
    md.split_whitespace().count()
}

// ---------------------------------------------------------------------------
// HTML helpers
// ---------------------------------------------------------------------------

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head title").expect("valid selector"));
static DESCRIPTION_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#)
        .expect("valid selector")
});
static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Content containers tried in order before falling back to `<body>`.
static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "article .markdown",
        ".vp-doc",
        ".markdown-section",
        "[role=\"main\"]",
        "main",
        "article",
        ".content",
        "#content",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

fn extract_content_html(doc: &Html) -> String {
    CONTENT_SELECTORS
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .or_else(|| doc.select(&BODY_SEL).next())
        .map(|el| el.inner_html())
        .unwrap_or_else(|| doc.root_element().html())
}

fn document_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE_SEL)
        .next()
        .map(|el| collapse_ws(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn meta_description(doc: &Html) -> Option<String> {
    doc.select(&DESCRIPTION_SEL)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_ws)
        .find(|d| !d.is_empty())
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrite `<table>` elements as Markdown tables before `htmd` sees them.
fn preprocess_tables(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut result = html.to_string();

    for table in fragment.select(&TABLE_SEL) {
        let replacement = table_to_markdown(&table);
        result = result.replacen(&table.html(), &replacement, 1);
    }

    result
}

fn table_to_markdown(table: &ElementRef) -> String {
    let mut rows: Vec<Vec<String>> = table
        .select(&ROW_SEL)
        .map(|tr| {
            tr.select(&CELL_SEL)
                .map(|cell| collapse_ws(&cell.text().collect::<String>()).replace('|', "\\|"))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let line = |cells: &[String]| format!("| {} |\n", cells.join(" | "));
    let mut md = String::from("\n\n");
    md.push_str(&line(&rows[0]));
    md.push_str(&line(&vec!["---".to_string(); width]));
    for row in &rows[1..] {
        md.push_str(&line(row));
    }
    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

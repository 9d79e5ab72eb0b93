//! On-disk page artifacts and the crawl summary.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use url::Url;

use docstitch_markdown::ArtifactHeader;
use docstitch_shared::{DocStitchError, Result};

use crate::engine::CrawlReport;
use crate::fetch::FetchedPage;

/// File name of the crawl summary written next to the artifacts.
pub const SUMMARY_FILE: &str = "crawl_summary.md";

/// Stems longer than this are cut and suffixed with a URL hash.
const MAX_STEM_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// `depth{D}_{last three path segments}`, e.g. `depth1_guide_setup_linux`.
///
/// The site root becomes `index`. Long names keep their first 50 characters
/// plus 8 hex digits of the URL's SHA-256; anything other than ASCII
/// alphanumerics, `-` and `_` becomes `_`.
pub fn artifact_stem(url: &str, depth: u32) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let tail = if segments.is_empty() {
        "index".to_string()
    } else {
        segments[segments.len().saturating_sub(3)..].join("_")
    };

    let mut stem = format!("depth{depth}_{tail}");
    if stem.chars().count() > MAX_STEM_LEN {
        let head: String = stem.chars().take(MAX_STEM_LEN).collect();
        stem = format!("{head}_{}", &compute_hash(url)[..8]);
    }

    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// SHA-256 of `content` as lowercase hex.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Persists crawled pages as Markdown files with a frontmatter header.
#[derive(Debug)]
pub struct ArtifactWriter {
    dir: PathBuf,
    claimed: HashSet<PathBuf>,
}

impl ArtifactWriter {
    /// Create the output directory if needed.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| DocStitchError::io(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            claimed: HashSet::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one page and return the path it landed at.
    ///
    /// `url` is the normalized URL recorded in the header.
    pub fn write(&mut self, url: &str, depth: u32, page: &FetchedPage) -> Result<PathBuf> {
        let title = page
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled".to_string());
        let header = ArtifactHeader {
            url: url.to_string(),
            crawled_at: Utc::now().to_rfc3339(),
            depth,
            title: title.clone(),
            description: page.description.clone().unwrap_or_default(),
        };

        let mut text = header.render();
        let _ = write!(text, "\n# {title}\n\n{}", page.markdown);
        if !text.ends_with('\n') {
            text.push('\n');
        }

        let path = self.claim_path(&artifact_stem(url, depth));
        std::fs::write(&path, text).map_err(|e| DocStitchError::io(&path, e))?;
        Ok(path)
    }

    /// First free `{stem}.md`, then `{stem}_1.md`, `{stem}_2.md`, ...
    fn claim_path(&mut self, stem: &str) -> PathBuf {
        let mut candidate = self.dir.join(format!("{stem}.md"));
        let mut counter = 1;
        while self.claimed.contains(&candidate) || candidate.exists() {
            candidate = self.dir.join(format!("{stem}_{counter}.md"));
            counter += 1;
        }
        self.claimed.insert(candidate.clone());
        candidate
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Render `crawl_summary.md`: statistics, artifacts grouped by depth, errors.
pub fn render_summary(report: &CrawlReport) -> String {
    let mut out = String::from("# Crawl Summary\n\n");
    let _ = writeln!(out, "**Root URL**: {}", report.root_url);
    let _ = writeln!(out, "**Max Depth**: {}", report.max_depth);
    let _ = writeln!(
        out,
        "**Crawl Date**: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    out.push_str("## Statistics\n");
    let _ = writeln!(out, "- Total URLs Crawled: {}", report.total_crawled);
    let _ = writeln!(out, "- Successful: {}", report.successful);
    let _ = writeln!(out, "- Failed: {}", report.failed);
    let _ = writeln!(out, "- Skipped (insufficient content): {}", report.skipped);
    let _ = writeln!(out, "- Files Created: {}", report.artifacts.len());
    let _ = writeln!(out, "- Duration: {:.1}s", report.duration.as_secs_f64());

    out.push_str("\n## Crawled Pages\n");
    for depth in 0..=report.max_depth {
        let mut at_depth: Vec<_> = report.artifacts.iter().filter(|a| a.depth == depth).collect();
        if at_depth.is_empty() {
            continue;
        }
        at_depth.sort_by(|a, b| a.path.cmp(&b.path));
        let _ = writeln!(out, "\n### Depth {depth} ({} pages)\n", at_depth.len());
        for artifact in at_depth {
            let name = artifact.file_name();
            let _ = writeln!(out, "- [{name}]({name}) - {}", artifact.url);
        }
    }

    if !report.errors.is_empty() {
        out.push_str("\n## Errors\n\n");
        for (url, error) in &report.errors {
            let _ = writeln!(out, "- {url}: {error}");
        }
    }

    out
}

/// Write [`render_summary`] into `dir` and return its path.
pub fn write_summary(dir: &Path, report: &CrawlReport) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    std::fs::write(&path, render_summary(report)).map_err(|e| DocStitchError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(markdown: &str) -> FetchedPage {
        FetchedPage {
            url: "https://docs.example.com/guide".into(),
            title: Some("Guide".into()),
            description: Some("All about it".into()),
            markdown: markdown.into(),
            links: vec![],
        }
    }

    #[test]
    fn stem_uses_last_three_segments() {
        assert_eq!(
            artifact_stem("https://x.example/docs/guide/setup/linux/", 2),
            "depth2_guide_setup_linux"
        );
        assert_eq!(artifact_stem("https://x.example/", 0), "depth0_index");
        assert_eq!(
            artifact_stem("https://x.example/a.b/c%20d", 1),
            "depth1_a_b_c_20d"
        );
    }

    #[test]
    fn long_stem_gets_hash_suffix() {
        let url = "https://x.example/a-very-long-section-name/another-long-segment/final-page-name";
        let stem = artifact_stem(url, 1);
        assert_eq!(stem.len(), 50 + 1 + 8);
        assert!(stem.starts_with("depth1_a-very-long-section-name_another-long-segme"));
        assert_eq!(&stem[51..], &compute_hash(url)[..8]);
    }

    #[test]
    fn compute_hash_is_sha256() {
        assert_eq!(
            compute_hash("hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn writer_adds_header_and_resolves_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ArtifactWriter::new(dir.path()).unwrap();

        let first = writer
            .write("https://docs.example.com/guide", 1, &page("Body text.\n"))
            .unwrap();
        let second = writer
            .write("https://docs.example.com/other/guide", 1, &page("More."))
            .unwrap();

        assert_eq!(first.file_name().unwrap(), "depth1_guide.md");
        assert_eq!(second.file_name().unwrap(), "depth1_other_guide.md");

        let third = writer
            .write("https://docs.example.com/guide?tab=2", 1, &page("Again."))
            .unwrap();
        assert_eq!(third.file_name().unwrap(), "depth1_guide_1.md");

        let text = std::fs::read_to_string(&first).unwrap();
        let (header, body) = ArtifactHeader::parse(&text).expect("header");
        assert_eq!(header.url, "https://docs.example.com/guide");
        assert_eq!(header.depth, 1);
        assert_eq!(header.title, "Guide");
        assert_eq!(header.description, "All about it");
        assert_eq!(body, "# Guide\n\nBody text.\n");
    }
}

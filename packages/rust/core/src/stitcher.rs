//! Stitches crawled page artifacts into one document in navigation order.
//!
//! Pages are loaded back from the crawler's artifact directory, matched to
//! the navigation's ordered URL list (exact URL first, then by path), and
//! rendered as a single Markdown document with a table of contents. Pages
//! the navigation does not mention are appended as additional content.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, instrument};

use docstitch_markdown::ArtifactHeader;
use docstitch_shared::{DocStitchError, OrderedUrl, PageContent, Result, normalize_url, url_path};

use crate::anchor::anchor_id;

/// Stitched output, written into the content directory.
pub const STITCHED_FILE: &str = "stitched_document.md";

/// Companion reading order, written when navigation is available.
pub const READING_GUIDE_FILE: &str = "reading_guide.md";

/// Generated files that are never loaded back as pages.
const GENERATED_FILES: &[&str] = &[
    docstitch_crawler::SUMMARY_FILE,
    STITCHED_FILE,
    READING_GUIDE_FILE,
];

// ---------------------------------------------------------------------------
// Options and outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StitchOptions {
    /// Append pages the navigation does not mention.
    pub include_unmatched: bool,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            include_unmatched: true,
        }
    }
}

/// What [`stitch_crawled_content`] produced.
#[derive(Debug, Clone)]
pub struct StitchOutcome {
    pub document_path: PathBuf,
    pub reading_guide_path: Option<PathBuf>,
    pub total_pages: usize,
    pub matched: usize,
    pub additional: usize,
}

// ---------------------------------------------------------------------------
// DocumentStitcher
// ---------------------------------------------------------------------------

/// Loads page artifacts and renders them as one document.
#[derive(Debug)]
pub struct DocumentStitcher {
    content_dir: PathBuf,
    pages: Vec<PageContent>,
}

impl DocumentStitcher {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            pages: Vec::new(),
        }
    }

    pub fn pages(&self) -> &[PageContent] {
        &self.pages
    }

    /// Load every `*.md` artifact in the content directory, in file-name order.
    ///
    /// Generated files and files without a frontmatter header are skipped.
    /// Returns the number of pages loaded.
    pub fn load_content(&mut self) -> Result<usize> {
        let dir = &self.content_dir;
        let entries = std::fs::read_dir(dir).map_err(|e| DocStitchError::io(dir, e))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| !GENERATED_FILES.contains(&name))
            })
            .collect();
        files.sort();

        self.pages.clear();
        for path in files {
            let text = std::fs::read_to_string(&path).map_err(|e| DocStitchError::io(&path, e))?;
            match load_page(&text, &path) {
                Some(page) => self.pages.push(page),
                None => debug!(path = %path.display(), "no frontmatter, skipping"),
            }
        }

        info!(pages = self.pages.len(), dir = %dir.display(), "loaded page artifacts");
        Ok(self.pages.len())
    }

    /// Split the loaded pages into those placed by `ordered` and the rest.
    ///
    /// Pass one matches on the normalized URL. Pass two matches the remaining
    /// navigation entries to the remaining pages by URL path alone, first
    /// page wins. Matched pages come back in navigation order, the rest in
    /// `(depth, title)` order.
    pub fn match_to_navigation(
        &self,
        ordered: &[OrderedUrl],
    ) -> (Vec<PageContent>, Vec<PageContent>) {
        let mut page_by_url: HashMap<String, usize> = HashMap::new();
        for (idx, page) in self.pages.iter().enumerate() {
            page_by_url.entry(page.url.clone()).or_insert(idx);
        }

        let mut placement: Vec<Option<&OrderedUrl>> = vec![None; self.pages.len()];
        let mut entry_matched = vec![false; ordered.len()];

        for (entry_idx, entry) in ordered.iter().enumerate() {
            match page_by_url.get(&normalize_url(&entry.url)) {
                Some(&idx) if placement[idx].is_none() => {
                    placement[idx] = Some(entry);
                    entry_matched[entry_idx] = true;
                }
                _ => {}
            }
        }

        for (entry_idx, entry) in ordered.iter().enumerate() {
            if entry_matched[entry_idx] {
                continue;
            }
            let nav_path = url_path(&entry.url);
            let hit = self
                .pages
                .iter()
                .enumerate()
                .find(|(idx, page)| placement[*idx].is_none() && url_path(&page.url) == nav_path);
            if let Some((idx, _)) = hit {
                placement[idx] = Some(entry);
            }
        }

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for (page, entry) in self.pages.iter().zip(placement) {
            let mut page = page.clone();
            match entry {
                Some(entry) => {
                    page.nav_position = Some(entry.order);
                    page.nav_breadcrumb = entry.breadcrumb.clone();
                    page.nav_level = Some(entry.level);
                    matched.push(page);
                }
                None => unmatched.push(page),
            }
        }
        matched.sort_by_key(|p| p.nav_position);
        sort_additional(&mut unmatched);

        debug!(matched = matched.len(), unmatched = unmatched.len(), "matched pages to navigation");
        (matched, unmatched)
    }

    /// Render the stitched document.
    pub fn stitch_document(
        &self,
        matched: &[PageContent],
        unmatched: &[PageContent],
        include_unmatched: bool,
    ) -> String {
        let unmatched: &[PageContent] = if include_unmatched { unmatched } else { &[] };
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut out = String::new();

        out.push_str("# 📚 Complete Documentation\n\n");
        out.push_str("> *Crawled pages stitched together in the site's navigation order.*\n>\n");
        let _ = writeln!(out, "> **Generated**: {generated}");
        let _ = writeln!(out, "> **Total Pages**: {}\n", matched.len() + unmatched.len());
        out.push_str("---\n\n");

        out.push_str("## 📑 Table of Contents\n");
        if !matched.is_empty() {
            out.push_str("\n### Main Content\n\n");
            let mut section = None;
            for page in matched {
                if let Some(name) = group_name(page).filter(|name| section != Some(*name)) {
                    let _ = writeln!(out, "\n**{name}**\n");
                    section = Some(name);
                }
                let indent = "  ".repeat(page.nav_level.unwrap_or(0).max(0) as usize);
                let _ = writeln!(out, "{indent}- [{}](#{})", page.title, anchor_id(&page.title));
            }
        }
        if !unmatched.is_empty() {
            out.push_str("\n### Additional Content\n\n");
            for page in unmatched {
                let _ = writeln!(out, "- [{}](#{})", page.title, anchor_id(&page.title));
            }
        }

        if !matched.is_empty() {
            out.push_str("\n---\n\n# 📖 Main Content\n\n");
            let mut section = None;
            for page in matched {
                if let Some(name) = group_name(page).filter(|name| section != Some(*name)) {
                    let _ = writeln!(out, "## 📂 {name}\n");
                    section = Some(name);
                }
                push_page_section(&mut out, page);
            }
        }

        if !unmatched.is_empty() {
            out.push_str("\n---\n\n# 📎 Additional Content\n\n");
            out.push_str("*These pages were crawled but are not part of the main navigation.*\n\n");
            for page in unmatched {
                push_page_section(&mut out, page);
            }
        }

        out.push_str("\n## 📊 Document Statistics\n\n");
        let _ = writeln!(out, "- **Pages in Navigation Order**: {}", matched.len());
        let _ = writeln!(out, "- **Additional Pages**: {}", unmatched.len());
        let _ = writeln!(out, "- **Total Pages**: {}", matched.len() + unmatched.len());
        let _ = writeln!(out, "- **Document Generated**: {generated}");
        out.push_str("\n---\n\n*End of Document*\n");
        out
    }

    /// Numbered reading order of the matched pages.
    pub fn reading_guide(&self, matched: &[PageContent]) -> String {
        let mut out = String::from("# 📖 Reading Guide\n\n");
        out.push_str("Recommended reading order, following the site's navigation.\n\n");

        if matched.is_empty() {
            out.push_str("*No pages were matched to the navigation structure.*\n");
            return out;
        }

        let mut section = None;
        for (idx, page) in matched.iter().enumerate() {
            if let Some(name) = group_name(page).filter(|name| section != Some(*name)) {
                let _ = writeln!(out, "## {name}\n");
                section = Some(name);
            }
            let _ = writeln!(out, "{}. **{}**", idx + 1, page.title);
            if !page.nav_breadcrumb.is_empty() {
                let _ = writeln!(out, "   - Path: {}", page.nav_breadcrumb.join(" > "));
            }
            let _ = writeln!(out, "   - File: {}\n", page.file_name());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Load `content_dir`, order it by `ordered_urls` and write the stitched
/// document (plus the reading guide when navigation is given).
///
/// Without navigation every page goes into the additional-content section.
#[instrument(skip_all, fields(dir = %content_dir.display(), navigation = ordered_urls.is_some()))]
pub fn stitch_crawled_content(
    content_dir: &Path,
    ordered_urls: Option<&[OrderedUrl]>,
    options: &StitchOptions,
) -> Result<StitchOutcome> {
    let mut stitcher = DocumentStitcher::new(content_dir);
    let total_pages = stitcher.load_content()?;

    let (document, guide, matched, additional) = match ordered_urls {
        Some(ordered) => {
            let (matched, unmatched) = stitcher.match_to_navigation(ordered);
            let document = stitcher.stitch_document(&matched, &unmatched, options.include_unmatched);
            let guide = stitcher.reading_guide(&matched);
            let additional = if options.include_unmatched { unmatched.len() } else { 0 };
            (document, Some(guide), matched.len(), additional)
        }
        None => {
            let mut pages = stitcher.pages().to_vec();
            sort_additional(&mut pages);
            let document = stitcher.stitch_document(&[], &pages, true);
            (document, None, 0, pages.len())
        }
    };

    let document_path = content_dir.join(STITCHED_FILE);
    std::fs::write(&document_path, document).map_err(|e| DocStitchError::io(&document_path, e))?;

    let reading_guide_path = match guide {
        Some(guide) => {
            let path = content_dir.join(READING_GUIDE_FILE);
            std::fs::write(&path, guide).map_err(|e| DocStitchError::io(&path, e))?;
            Some(path)
        }
        None => None,
    };

    info!(total_pages, matched, additional, path = %document_path.display(), "stitched document written");
    Ok(StitchOutcome {
        document_path,
        reading_guide_path,
        total_pages,
        matched,
        additional,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_page(text: &str, path: &Path) -> Option<PageContent> {
    let (header, body) = ArtifactHeader::parse(text)?;
    let title = if header.title.trim().is_empty() {
        "Untitled".to_string()
    } else {
        header.title
    };
    let content = strip_title_line(body, &title).trim().to_string();

    Some(PageContent {
        url: normalize_url(&header.url),
        title,
        content,
        filepath: path.to_path_buf(),
        depth: header.depth,
        crawled_at: header.crawled_at,
        nav_position: None,
        nav_breadcrumb: Vec::new(),
        nav_level: None,
    })
}

/// The artifact body opens with `# {title}`; the section renders its own heading.
fn strip_title_line<'a>(body: &'a str, title: &str) -> &'a str {
    let (first, rest) = body.split_once('\n').unwrap_or((body, ""));
    if first.trim_end() == format!("# {title}") {
        rest
    } else {
        body
    }
}

fn sort_additional(pages: &mut [PageContent]) {
    pages.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.title.cmp(&b.title)));
}

/// Top-level group of a nested page, used for run-length section headers.
fn group_name(page: &PageContent) -> Option<&str> {
    if page.nav_breadcrumb.len() > 1 {
        page.nav_breadcrumb.first().map(String::as_str)
    } else {
        None
    }
}

fn push_page_section(out: &mut String, page: &PageContent) {
    if page.nav_breadcrumb.len() > 1 {
        let _ = writeln!(out, "*{}*\n", page.nav_breadcrumb.join(" > "));
    }
    let _ = writeln!(out, "<a id=\"{}\"></a>\n", anchor_id(&page.title));
    let _ = writeln!(out, "### 📄 {}\n", page.title);
    let _ = writeln!(out, "*Source: [{url}]({url})*\n", url = page.url);
    if !page.content.is_empty() {
        let _ = writeln!(out, "{}\n", page.content);
    }
    out.push_str("---\n\n");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn write_artifact(dir: &Path, name: &str, url: &str, depth: u32, title: &str, body: &str) {
        let header = ArtifactHeader {
            url: url.into(),
            crawled_at: "2025-03-01T12:00:00+00:00".into(),
            depth,
            title: title.into(),
            description: String::new(),
        };
        let text = format!("{}\n# {title}\n\n{body}\n", header.render());
        std::fs::write(dir.join(name), text).unwrap();
    }

    fn entry(url: &str, title: &str, breadcrumb: &[&str], order: usize) -> OrderedUrl {
        OrderedUrl {
            url: url.into(),
            title: title.into(),
            level: breadcrumb.len() as i32 - 1,
            breadcrumb: breadcrumb.iter().map(|s| s.to_string()).collect(),
            order,
        }
    }

    fn site(dir: &Path) {
        write_artifact(dir, "depth0_index.md", "https://docs.example.com/", 0, "Home", "Welcome.");
        write_artifact(
            dir,
            "depth1_guide_install.md",
            "https://docs.example.com/guide/install",
            1,
            "Install",
            "Run the installer.",
        );
        write_artifact(
            dir,
            "depth1_guide_config.md",
            "https://www.example.com/guide/config/",
            1,
            "Configure",
            "Edit the file.",
        );
        write_artifact(dir, "depth1_blog.md", "https://docs.example.com/blog", 1, "Blog", "News.");
        write_artifact(dir, "depth2_faq.md", "https://docs.example.com/faq", 2, "FAQ", "Answers.");
        std::fs::write(dir.join("crawl_summary.md"), "# Crawl Summary\n").unwrap();
        std::fs::write(dir.join("notes.md"), "no header here\n").unwrap();
    }

    fn navigation() -> Vec<OrderedUrl> {
        vec![
            entry("https://docs.example.com/#top", "Home", &["Home"], 0),
            entry("https://docs.example.com/guide", "Guide", &["Guide"], 1),
            entry(
                "https://docs.example.com/guide/install/",
                "Install",
                &["Guide", "Install"],
                2,
            ),
            entry(
                "https://docs.example.com/guide/config",
                "Configure",
                &["Guide", "Configure"],
                3,
            ),
        ]
    }

    #[test]
    fn load_skips_generated_and_headerless_files() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());
        let mut stitcher = DocumentStitcher::new(dir.path());

        assert_eq!(stitcher.load_content().unwrap(), 5);
        let names: Vec<String> = stitcher.pages().iter().map(|p| p.file_name()).collect();
        assert_eq!(
            names,
            [
                "depth0_index.md",
                "depth1_blog.md",
                "depth1_guide_config.md",
                "depth1_guide_install.md",
                "depth2_faq.md",
            ]
        );
        let install = &stitcher.pages()[3];
        assert_eq!(install.url, "https://docs.example.com/guide/install");
        assert_eq!(install.content, "Run the installer.");
    }

    #[test]
    fn matching_uses_url_then_path() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());
        let mut stitcher = DocumentStitcher::new(dir.path());
        stitcher.load_content().unwrap();

        let (matched, unmatched) = stitcher.match_to_navigation(&navigation());

        let titles: Vec<&str> = matched.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Home", "Install", "Configure"]);
        assert_eq!(matched[2].url, "https://www.example.com/guide/config");
        assert_eq!(matched[2].nav_position, Some(3));
        assert_eq!(matched[1].nav_breadcrumb, ["Guide", "Install"]);
        assert_eq!(matched[1].nav_level, Some(1));

        let rest: Vec<&str> = unmatched.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(rest, ["Blog", "FAQ"]);
        assert_eq!(matched.len() + unmatched.len(), stitcher.pages().len());
    }

    #[test]
    fn document_groups_sections_and_indents_toc() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());
        let mut stitcher = DocumentStitcher::new(dir.path());
        stitcher.load_content().unwrap();
        let (matched, unmatched) = stitcher.match_to_navigation(&navigation());

        let doc = stitcher.stitch_document(&matched, &unmatched, true);

        assert!(doc.starts_with("# 📚 Complete Documentation\n"));
        assert!(doc.contains("> **Total Pages**: 5\n"));
        assert!(doc.contains("### Main Content\n\n- [Home](#home)\n\n**Guide**\n\n  - [Install](#install)\n  - [Configure](#configure)\n"));
        assert!(doc.contains("### Additional Content\n\n- [Blog](#blog)\n- [FAQ](#faq)\n"));
        assert_eq!(doc.matches("## 📂 Guide").count(), 1);
        assert!(doc.contains("*Guide > Install*\n\n<a id=\"install\"></a>\n\n### 📄 Install\n"));
        assert!(doc.contains("*Source: [https://docs.example.com/guide/install](https://docs.example.com/guide/install)*"));
        assert!(!doc.contains("# Install\n"));

        let main = doc.find("# 📖 Main Content").unwrap();
        let extra = doc.find("# 📎 Additional Content").unwrap();
        let install = doc.find("### 📄 Install").unwrap();
        let configure = doc.find("### 📄 Configure").unwrap();
        let faq = doc.find("### 📄 FAQ").unwrap();
        assert!(main < install && install < configure && configure < extra && extra < faq);
        assert!(doc.contains("- **Pages in Navigation Order**: 3\n- **Additional Pages**: 2\n"));
    }

    #[test]
    fn unmatched_can_be_left_out() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());
        let mut stitcher = DocumentStitcher::new(dir.path());
        stitcher.load_content().unwrap();
        let (matched, unmatched) = stitcher.match_to_navigation(&navigation());

        let doc = stitcher.stitch_document(&matched, &unmatched, false);
        assert!(!doc.contains("Additional Content"));
        assert!(!doc.contains("### 📄 Blog"));
    }

    #[test]
    fn reading_guide_lists_matched_pages() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());
        let mut stitcher = DocumentStitcher::new(dir.path());
        stitcher.load_content().unwrap();
        let (matched, _) = stitcher.match_to_navigation(&navigation());

        let guide = stitcher.reading_guide(&matched);
        assert!(guide.contains("1. **Home**\n   - Path: Home\n   - File: depth0_index.md\n"));
        assert!(guide.contains("## Guide\n\n2. **Install**\n   - Path: Guide > Install\n"));
        assert!(guide.contains("3. **Configure**"));
        assert!(!guide.contains("Blog"));
    }

    #[test]
    fn stitching_without_navigation_orders_by_depth_then_title() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());

        let outcome = stitch_crawled_content(dir.path(), None, &StitchOptions::default()).unwrap();
        assert_eq!(outcome.total_pages, 5);
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.additional, 5);
        assert!(outcome.reading_guide_path.is_none());

        let doc = std::fs::read_to_string(&outcome.document_path).unwrap();
        assert!(!doc.contains("# 📖 Main Content"));
        let order: Vec<usize> = ["### 📄 Home", "### 📄 Blog", "### 📄 Configure", "### 📄 Install", "### 📄 FAQ"]
            .iter()
            .map(|h| doc.find(h).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn stitching_with_navigation_writes_guide() {
        let dir = tempfile::tempdir().unwrap();
        site(dir.path());

        let nav = navigation();
        let outcome =
            stitch_crawled_content(dir.path(), Some(&nav), &StitchOptions::default()).unwrap();
        assert_eq!(outcome.matched + outcome.additional, outcome.total_pages);
        let guide = outcome.reading_guide_path.expect("reading guide");
        assert!(guide.ends_with(READING_GUIDE_FILE));

        // Generated files are not picked up on a second run.
        let again = stitch_crawled_content(dir.path(), Some(&nav), &StitchOptions::default()).unwrap();
        assert_eq!(again.total_pages, 5);
    }
}

//! Navigation discovery strategies.
//!
//! Every strategy is a pure function returning a non-empty tree or `None`.
//! The DOM strategies run in a fixed order and the first hit wins; the
//! sitemap strategy works on fetched XML and is the last resort.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use docstitch_shared::{DocStitchError, Result, normalize_url};

use crate::tree::{NavigationSource, NavigationTree, NodeId};

/// Labelled "main navigation" landmarks, tried first.
pub const PRIORITY_SELECTORS: &[&str] = &[
    r#"nav[aria-label*="main"]"#,
    r#"nav[aria-label*="primary"]"#,
    ".main-nav",
    ".primary-nav",
    "#main-nav",
    "#primary-nav",
    r#"[role="navigation"][aria-label*="main"]"#,
];

/// Generic navigation and sidebar containers.
pub const NAVIGATION_SELECTORS: &[&str] = &[
    "nav",
    r#"[role="navigation"]"#,
    "aside nav",
    ".sidebar",
    "#sidebar",
    ".navigation",
    "#navigation",
    ".toc",
    "#toc",
    ".menu",
    "#menu",
    r#"[class*="nav-"]"#,
    r#"[class*="sidebar"]"#,
    r#"[id*="nav-"]"#,
    r#"[id*="sidebar"]"#,
];

/// A list needs this many links to count as navigation.
const MIN_LIST_LINKS: usize = 3;
/// Link-cluster fallback keeps at most this many links.
const MAX_CLUSTER_LINKS: usize = 20;
/// Sitemap fallback reads at most this many `<loc>` entries.
const MAX_SITEMAP_ENTRIES: usize = 30;

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static LIST_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul, ol").expect("valid selector"));
static CONTAINER_SELECTORS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    PRIORITY_SELECTORS
        .iter()
        .chain(NAVIGATION_SELECTORS)
        .map(|s| (*s, Selector::parse(s).expect("valid selector")))
        .collect()
});
static NAV_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(home|about|docs|documentation|guide|tutorial|reference|api|blog|contact)")
        .expect("valid regex")
});
static LOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<loc>\s*([^<]+?)\s*</loc>").expect("valid regex"));

// ---------------------------------------------------------------------------
// Site scope
// ---------------------------------------------------------------------------

/// The site being mapped: resolves hrefs and decides what is internal.
#[derive(Debug, Clone)]
pub struct SiteScope {
    base: Url,
}

impl SiteScope {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| DocStitchError::validation(format!("invalid URL {base_url}: {e}")))?;
        if base.host_str().is_none() {
            return Err(DocStitchError::validation(format!("URL has no host: {base_url}")));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute, normalized http(s) URL for an href. `None` for empty or `#` links.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let url = self.base.join(href).ok()?;
        matches!(url.scheme(), "http" | "https").then(|| normalize_url(url.as_str()))
    }

    /// Same host and port as the base URL.
    pub fn is_internal(&self, url: &str) -> bool {
        Url::parse(url).is_ok_and(|u| {
            u.host_str() == self.base.host_str()
                && u.port_or_known_default() == self.base.port_or_known_default()
        })
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

type DomStrategy = fn(&Html, &SiteScope) -> Option<NavigationTree>;

/// DOM strategies in the order they are attempted.
const DOM_CHAIN: &[DomStrategy] = &[semantic_scan, pattern_lists, link_cluster];

/// First non-empty tree produced by the DOM strategies.
pub fn run_dom_chain(doc: &Html, scope: &SiteScope) -> Option<NavigationTree> {
    DOM_CHAIN.iter().find_map(|strategy| strategy(doc, scope))
}

fn non_empty(tree: NavigationTree) -> Option<NavigationTree> {
    (!tree.is_empty()).then_some(tree)
}

// ---------------------------------------------------------------------------
// Strategy 1: semantic landmarks
// ---------------------------------------------------------------------------

/// Hierarchy from the first landmark container that yields internal links.
///
/// A link's level is the number of `ul`/`ol` ancestors between it and the
/// container, so entries of a `nav > ul > li` menu sit at level 1.
pub fn semantic_scan(doc: &Html, scope: &SiteScope) -> Option<NavigationTree> {
    CONTAINER_SELECTORS.iter().find_map(|(label, selector)| {
        let container = doc.select(selector).next()?;
        non_empty(tree_from_container(container, label, scope))
    })
}

fn tree_from_container(container: ElementRef, label: &str, scope: &SiteScope) -> NavigationTree {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in container.select(&LINK_SEL) {
        let Some(url) = anchor.value().attr("href").and_then(|h| scope.resolve(h)) else {
            continue;
        };
        if !seen.insert(url.clone()) || !scope.is_internal(&url) {
            continue;
        }
        // Icon-only links still hold a place in the reading order.
        let title = link_title(&anchor).unwrap_or_else(|| last_segment_title(&url));
        links.push((title, url, list_depth(&anchor, &container)));
    }

    let mut tree = NavigationTree::new(format!("Navigation ({label})"), NavigationSource::Semantic);

    // latest[L] = most recent node recorded at level L. Recording a node
    // forgets everything deeper so later links never reach into a closed branch.
    let mut latest: Vec<Option<NodeId>> = Vec::new();
    for (title, url, level) in links {
        let parent = level
            .checked_sub(1)
            .and_then(|above| latest.get(above).copied().flatten())
            .unwrap_or_else(|| tree.root());
        let id = tree.push_child(parent, title, url, level as i32);
        latest.truncate(level);
        latest.resize(level, None);
        latest.push(Some(id));
    }

    tree
}

/// Number of `ul`/`ol` elements between `anchor` and `container`.
fn list_depth(anchor: &ElementRef, container: &ElementRef) -> usize {
    anchor
        .ancestors()
        .take_while(|node| node.id() != container.id())
        .filter(|node| {
            node.value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "ul" | "ol"))
        })
        .count()
}

// ---------------------------------------------------------------------------
// Strategy 2: lists with navigational vocabulary
// ---------------------------------------------------------------------------

/// Flat navigation from the first list that looks like a site menu.
pub fn pattern_lists(doc: &Html, scope: &SiteScope) -> Option<NavigationTree> {
    doc.select(&LIST_SEL).find_map(|list| {
        let anchors: Vec<ElementRef> = list.select(&LINK_SEL).collect();
        if anchors.len() < MIN_LIST_LINKS {
            return None;
        }
        let looks_like_menu = anchors
            .iter()
            .any(|a| NAV_WORD_RE.is_match(&collapse_ws(&a.text().collect::<String>())));
        if !looks_like_menu {
            return None;
        }
        let entries = internal_links(anchors.into_iter(), scope)
            .into_iter()
            .filter_map(|(title, url)| Some((title?, url)));
        non_empty(flat_tree("Navigation (pattern)", NavigationSource::Pattern, entries))
    })
}

// ---------------------------------------------------------------------------
// Strategy 3: every internal link on the page
// ---------------------------------------------------------------------------

/// Flat navigation from the page's first internal links.
pub fn link_cluster(doc: &Html, scope: &SiteScope) -> Option<NavigationTree> {
    let links = internal_links(doc.select(&LINK_SEL), scope);
    if links.len() < MIN_LIST_LINKS {
        return None;
    }
    let entries = links
        .into_iter()
        .take(MAX_CLUSTER_LINKS)
        .enumerate()
        .map(|(idx, (title, url))| (title.unwrap_or_else(|| format!("Page {}", idx + 1)), url));
    non_empty(flat_tree(
        "Navigation (link cluster)",
        NavigationSource::LinkCluster,
        entries,
    ))
}

// ---------------------------------------------------------------------------
// Strategy 4: sitemap.xml
// ---------------------------------------------------------------------------

/// Flat navigation from the leading `<loc>` entries of a sitemap.
pub fn sitemap_entries(xml: &str, scope: &SiteScope) -> Option<NavigationTree> {
    let mut seen = HashSet::new();
    let entries = LOC_RE
        .captures_iter(xml)
        .take(MAX_SITEMAP_ENTRIES)
        .filter_map(|caps| scope.resolve(&caps[1]))
        .filter(|url| scope.is_internal(url) && seen.insert(url.clone()))
        .map(|url| (title_from_path(&url), url))
        .collect::<Vec<_>>();

    non_empty(flat_tree(
        "Navigation (sitemap)",
        NavigationSource::Sitemap,
        entries,
    ))
}

/// `/getting-started/` becomes `Getting Started`; the site root becomes `Home`.
fn title_from_path(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().trim_matches('/').to_string())
        .unwrap_or_default();
    if path.is_empty() {
        return "Home".into();
    }
    title_case(&path.replace(['-', '_'], " "))
}

/// Title from the last path segment: `/guide/getting-started` becomes `Getting Started`.
fn last_segment_title(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_default();
    if segment.is_empty() {
        return "Home".into();
    }
    title_case(&segment.replace(['-', '_'], " "))
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Internal http(s) links in document order, deduplicated, with optional text.
fn internal_links<'a>(
    anchors: impl Iterator<Item = ElementRef<'a>>,
    scope: &SiteScope,
) -> Vec<(Option<String>, String)> {
    let mut seen = HashSet::new();
    anchors
        .filter_map(|a| {
            let url = scope.resolve(a.value().attr("href")?)?;
            (scope.is_internal(&url) && seen.insert(url.clone())).then(|| (link_title(&a), url))
        })
        .collect()
}

fn flat_tree(
    root_title: &str,
    source: NavigationSource,
    entries: impl IntoIterator<Item = (String, String)>,
) -> NavigationTree {
    let mut tree = NavigationTree::new(root_title, source);
    let root = tree.root();
    for (title, url) in entries {
        tree.push_child(root, title, url, 0);
    }
    tree
}

/// Visible link text, falling back to the `title` / `aria-label` attributes.
fn link_title(anchor: &ElementRef) -> Option<String> {
    let text = collapse_ws(&anchor.text().collect::<String>());
    if !text.is_empty() {
        return Some(text);
    }
    ["title", "aria-label"]
        .iter()
        .filter_map(|attr| anchor.value().attr(attr))
        .map(collapse_ws)
        .find(|t| !t.is_empty())
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/html")
            .join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    fn scope(url: &str) -> SiteScope {
        SiteScope::new(url).expect("valid base url")
    }

    #[test]
    fn scope_resolves_and_filters() {
        let s = scope("https://docs.example.com/guide/intro");
        assert_eq!(
            s.resolve("../api/#x").as_deref(),
            Some("https://docs.example.com/api")
        );
        assert_eq!(s.resolve("#"), None);
        assert_eq!(s.resolve("  "), None);
        assert_eq!(s.resolve("mailto:a@b.c"), None);
        assert!(s.is_internal("https://docs.example.com/x"));
        assert!(!s.is_internal("https://github.com/x"));
        assert!(!s.is_internal("http://docs.example.com/x"));
    }

    #[test]
    fn semantic_scan_builds_hierarchy() {
        let doc = Html::parse_document(&fixture("docs_sidebar.html"));
        let tree = semantic_scan(&doc, &scope("https://docs.example.com/guide/intro"))
            .expect("semantic navigation");

        assert_eq!(tree.source(), NavigationSource::Semantic);
        assert_eq!(tree.node(tree.root()).title, r#"Navigation (nav[aria-label*="main"])"#);

        let urls = tree.ordered_urls();
        let titles: Vec<_> = urls.iter().map(|u| u.title.as_str()).collect();
        assert_eq!(
            titles,
            [
                "Introduction",
                "Getting Started",
                "Installation",
                "Configuration",
                "Advanced Topics",
                "Plugins",
                "Writing Plugins",
            ]
        );
        let levels: Vec<_> = urls.iter().map(|u| u.level).collect();
        assert_eq!(levels, [1, 1, 2, 2, 1, 2, 3]);
        assert_eq!(urls[3].url, "https://docs.example.com/guide/config");
        assert_eq!(urls[1].url, "https://docs.example.com/guide/getting-started");
        assert_eq!(
            urls[6].breadcrumb,
            ["Advanced Topics", "Plugins", "Writing Plugins"]
        );
    }

    #[test]
    fn deep_link_after_closed_branch_attaches_to_root() {
        let html = r#"<nav><ul>
            <li><a href="/a">A</a><ul><li><a href="/a/1">A1</a><ul><li><a href="/a/1/x">A1x</a></li></ul></li></ul></li>
            <li><a href="/b">B</a></li>
            </ul>
            <ul><li><ul><li><ul><li><a href="/deep">Deep</a></li></ul></li></ul></li></ul>
        </nav>"#;
        let doc = Html::parse_document(html);
        let tree = semantic_scan(&doc, &scope("https://x.example/")).expect("tree");
        let urls = tree.ordered_urls();
        let last = urls.last().expect("entries");
        assert_eq!(last.title, "Deep");
        assert_eq!(last.breadcrumb, ["Deep"]);
        let orders: Vec<_> = tree.preorder().iter().map(|id| tree.node(*id).order).collect();
        assert!(orders.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn untitled_links_keep_their_place() {
        let html = r#"<nav><ul>
            <li><a href="/start">Start</a></li>
            <li><a href="/reference/cli-options"><svg></svg></a></li>
            <li><a href="/search" aria-label="Search"><i class="icon"></i></a></li>
            <li><a href="/">  </a></li>
            </ul></nav>"#;
        let doc = Html::parse_document(html);
        let tree = semantic_scan(&doc, &scope("https://x.example/start")).expect("tree");
        let titles: Vec<_> = tree.ordered_urls().into_iter().map(|u| u.title).collect();
        assert_eq!(titles, ["Start", "Cli Options", "Search", "Home"]);
    }

    #[test]
    fn links_outside_lists_sit_at_level_zero() {
        let html = r#"<nav><a href="/a">A</a><ul><li><a href="/b">B</a></li></ul></nav>"#;
        let doc = Html::parse_document(html);
        let tree = semantic_scan(&doc, &scope("https://x.example/")).expect("tree");
        let urls = tree.ordered_urls();
        let levels: Vec<_> = urls.iter().map(|u| u.level).collect();
        assert_eq!(levels, [0, 1]);
        assert_eq!(urls[1].breadcrumb, ["A", "B"]);
    }

    #[test]
    fn semantic_scan_skips_external_only_containers() {
        let html = r#"<nav><a href="https://other.example/a">A</a></nav>
            <div class="sidebar"><a href="/one">One</a></div>"#;
        let doc = Html::parse_document(html);
        let tree = semantic_scan(&doc, &scope("https://x.example/")).expect("sidebar");
        assert_eq!(tree.node(tree.root()).title, "Navigation (.sidebar)");
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn pattern_lists_pick_menu_like_list() {
        let doc = Html::parse_document(&fixture("pattern_list.html"));
        let s = scope("https://www.example.com/");
        assert!(semantic_scan(&doc, &s).is_none());

        let tree = pattern_lists(&doc, &s).expect("pattern navigation");
        let urls = tree.ordered_urls();
        let titles: Vec<_> = urls.iter().map(|u| u.title.as_str()).collect();
        assert_eq!(titles, ["Home", "About us", "Documentation", "Contact"]);
        assert!(urls.iter().all(|u| u.level == 0));
        assert_eq!(urls[0].url, "https://www.example.com");
    }

    #[test]
    fn link_cluster_names_untitled_links() {
        let doc = Html::parse_document(&fixture("links_only.html"));
        let s = scope("https://www.example.com/changelog");
        assert!(semantic_scan(&doc, &s).is_none());
        assert!(pattern_lists(&doc, &s).is_none());

        let tree = link_cluster(&doc, &s).expect("cluster navigation");
        let urls = tree.ordered_urls();
        let titles: Vec<_> = urls.iter().map(|u| u.title.as_str()).collect();
        assert_eq!(titles, ["Version 3", "Version 2", "Page 3"]);
    }

    #[test]
    fn link_cluster_needs_three_links() {
        let doc = Html::parse_document(r#"<p><a href="/a">A</a> <a href="/b">B</a></p>"#);
        assert!(link_cluster(&doc, &scope("https://x.example/")).is_none());
    }

    #[test]
    fn chain_returns_first_hit() {
        let doc = Html::parse_document(&fixture("pattern_list.html"));
        let tree = run_dom_chain(&doc, &scope("https://www.example.com/")).expect("tree");
        assert_eq!(tree.source(), NavigationSource::Pattern);

        let empty = Html::parse_document("<p>No links here.</p>");
        assert!(run_dom_chain(&empty, &scope("https://www.example.com/")).is_none());
    }

    #[test]
    fn sitemap_titles_from_paths() {
        let xml = fixture("sitemap.xml");
        let tree = sitemap_entries(&xml, &scope("https://docs.example.com/")).expect("sitemap");
        let titles: Vec<_> = tree.ordered_urls().into_iter().map(|u| u.title).collect();
        assert_eq!(
            titles,
            ["Home", "Getting Started", "Api Reference", "Guides/Release Notes"]
        );
    }

    #[test]
    fn sitemap_reads_only_leading_entries() {
        let xml: String = (0..40)
            .map(|i| format!("<url><loc>https://x.example/p{i}</loc></url>"))
            .collect();
        let tree = sitemap_entries(&xml, &scope("https://x.example/")).expect("sitemap");
        assert_eq!(tree.len(), 30);
        assert!(sitemap_entries("<urlset></urlset>", &scope("https://x.example/")).is_none());
    }
}

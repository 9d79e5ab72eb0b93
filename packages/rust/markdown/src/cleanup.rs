//! Post-conversion cleanup passes for Markdown text.
//!
//! Every pass is a `&str -> String` function. Link resolution is the only
//! pass that needs context (the page URL), so it runs separately.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

type Pass = fn(&str) -> String;

/// Context-free passes, in application order.
const PASSES: &[Pass] = &[
    demote_extra_titles,
    strip_heading_permalinks,
    fix_fence_languages,
    strip_layout_tags,
    collapse_blank_lines,
    trim_line_ends,
];

/// Run every cleanup pass. Relative links are resolved when `base_url` is given.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut text = PASSES.iter().fold(md.to_string(), |acc, pass| pass(&acc));
    if let Some(base) = base_url {
        text = resolve_links(&text, base);
    }
    finish(&text)
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Keep the first H1; later H1s become H2 so the page has one title.
fn demote_extra_titles(md: &str) -> String {
    let mut seen_title = false;
    let mut in_fence = false;

    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
            }
            if in_fence || !line.starts_with("# ") {
                return line.to_string();
            }
            if seen_title {
                format!("#{line}")
            } else {
                seen_title = true;
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove the `[#](...)` / `[¶](...)` permalink anchors doc generators append to headings.
fn strip_heading_permalinks(md: &str) -> String {
    static PERMALINK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^(#{1,6} .*?)[ \t]*\[(?:#|¶|\u{200b})\]\([^)]*\)[ \t]*$")
            .expect("valid regex")
    });

    PERMALINK_RE.replace_all(md, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Code fences and stray markup
// ---------------------------------------------------------------------------

/// Turn class-style fence hints (`language-js`, `lang-py`, `highlight-rs`) into plain ones.
fn fix_fence_languages(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^```(?:language-|lang-|highlight-)([\w+-]+)").expect("valid regex")
    });

    FENCE_RE.replace_all(md, "```$1").into_owned()
}

/// Drop layout-only HTML tags outside code fences, keeping their text.
fn strip_layout_tags(md: &str) -> String {
    static LAYOUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary|font|center)(?:\s[^>]*)?/?>",
        )
        .expect("valid regex")
    });

    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                line.to_string()
            } else {
                LAYOUT_TAG_RE.replace_all(line, "").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

/// At most one blank line between blocks.
fn collapse_blank_lines(md: &str) -> String {
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));

    BLANK_RUN_RE.replace_all(md, "\n\n").into_owned()
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// No leading blank lines, exactly one trailing newline.
fn finish(md: &str) -> String {
    let body = md.trim_start_matches('\n').trim_end();
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Resolve relative link targets against the page URL. Images and anchors are left alone.
fn resolve_links(md: &str, base: &Url) -> String {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &Captures| {
            let (bang, text, href) = (&caps[1], &caps[2], &caps[3]);
            let keep = !bang.is_empty()
                || href.starts_with('#')
                || href.contains("://")
                || href.starts_with("mailto:")
                || href.starts_with("tel:");
            if keep {
                return caps[0].to_string();
            }
            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Deterministic anchor ids for generated tables of contents.

use std::sync::LazyLock;

use regex::Regex;

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

/// Page anchor used by the stitched document.
///
/// Lowercased, punctuation removed, whitespace runs become `-`. Equal titles
/// give equal anchors; collisions are not disambiguated.
pub fn anchor_id(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_WORD_RE.replace_all(&lowered, "");
    WHITESPACE_RE.replace_all(&stripped, "-").into_owned()
}

/// Section anchor used by the multi-source compilation.
///
/// Like [`anchor_id`], but hyphen runs are merged and trimmed from the ends.
pub fn section_anchor(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_WORD_RE.replace_all(&lowered, "");
    SEPARATOR_RE
        .replace_all(&stripped, "-")
        .trim_matches('-')
        .to_string()
}

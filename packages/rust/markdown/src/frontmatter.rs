//! Frontmatter block written at the top of every crawled page artifact.
//!
//! ```text
//! ---
//! url: "https://docs.example.com/guide/intro"
//! crawled_at: "2025-03-01T12:00:00+00:00"
//! depth: 1
//! title: "Introduction"
//! description: "What this tool does"
//! ---
//! ```

use std::collections::BTreeMap;

/// Metadata header of a page artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub url: String,
    pub crawled_at: String,
    pub depth: u32,
    pub title: String,
    pub description: String,
}

impl ArtifactHeader {
    /// Render as a `---` delimited block, string values quoted.
    pub fn render(&self) -> String {
        format!(
            "---\nurl: \"{}\"\ncrawled_at: \"{}\"\ndepth: {}\ntitle: \"{}\"\ndescription: \"{}\"\n---\n",
            escape_yaml_string(&self.url),
            escape_yaml_string(&self.crawled_at),
            self.depth,
            escape_yaml_string(&self.title),
            escape_yaml_string(&self.description),
        )
    }

    /// Parse an artifact into its header and the body that follows it.
    ///
    /// Returns `None` when there is no frontmatter block or it lacks a `url`.
    pub fn parse(text: &str) -> Option<(Self, &str)> {
        let (fields, body) = split_frontmatter(text)?;
        let url = fields.get("url").filter(|u| !u.is_empty())?.clone();
        let field = |key: &str| fields.get(key).cloned().unwrap_or_default();

        let header = Self {
            url,
            crawled_at: field("crawled_at"),
            depth: fields.get("depth").and_then(|d| d.parse().ok()).unwrap_or(0),
            title: field("title"),
            description: field("description"),
        };
        Some((header, body))
    }
}

/// Split a leading `---` block into `key: value` pairs and the remaining body.
///
/// Values may be bare or double-quoted.
pub fn split_frontmatter(text: &str) -> Option<(BTreeMap<String, String>, &str)> {
    let rest = text.strip_prefix("---\n").or_else(|| text.strip_prefix("---\r\n"))?;

    let mut fields = BTreeMap::new();
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let line = line.trim_end_matches(['\n', '\r']);
        if line == "---" {
            let body = rest[offset..].trim_start_matches(['\n', '\r']);
            return Some((fields, body));
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim().to_string(), unquote(value.trim()));
        }
    }

    // No closing delimiter.
    None
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

/// Escape a value for a double-quoted YAML scalar on a single line.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\n', '\r'], " ")
}

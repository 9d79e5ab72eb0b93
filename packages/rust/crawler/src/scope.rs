//! Which discovered links a crawl follows.

use url::Url;

use docstitch_shared::{CrawlConfig, DocStitchError, Result};

/// Extensions that never lead to document pages.
const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".zip", ".tar", ".gz",
];

/// Same-host scope with substring exclusions.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    host: String,
    port: Option<u16>,
    exclude_patterns: Vec<String>,
}

impl CrawlScope {
    pub fn new(start_url: &str, config: &CrawlConfig) -> Result<Self> {
        let start = Url::parse(start_url)
            .map_err(|e| DocStitchError::validation(format!("invalid URL {start_url}: {e}")))?;
        let host = start
            .host_str()
            .ok_or_else(|| DocStitchError::validation(format!("URL has no host: {start_url}")))?
            .to_string();

        Ok(Self {
            host,
            port: start.port_or_known_default(),
            exclude_patterns: config.exclude_patterns.clone(),
        })
    }

    /// Whether a discovered link should join the next frontier.
    pub fn should_follow(&self, link: &str) -> bool {
        let Ok(url) = Url::parse(link) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if url.host_str() != Some(self.host.as_str()) || url.port_or_known_default() != self.port {
            return false;
        }
        if self.exclude_patterns.iter().any(|p| link.contains(p.as_str())) {
            return false;
        }
        let lower = link.to_lowercase();
        !EXCLUDED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(excludes: &[&str]) -> CrawlScope {
        let config = CrawlConfig {
            exclude_patterns: excludes.iter().map(|s| s.to_string()).collect(),
            ..CrawlConfig::default()
        };
        CrawlScope::new("https://docs.example.com/guide/", &config).unwrap()
    }

    #[test]
    fn same_host_only() {
        let s = scope(&[]);
        assert!(s.should_follow("https://docs.example.com/api/client"));
        assert!(!s.should_follow("https://other.example.com/guide/intro"));
        assert!(!s.should_follow("http://docs.example.com/guide/intro"));
        assert!(!s.should_follow("ftp://docs.example.com/file"));
    }

    #[test]
    fn exclude_patterns_are_substrings() {
        let s = scope(&["/login", "/blog/"]);
        assert!(!s.should_follow("https://docs.example.com/login?next=/"));
        assert!(!s.should_follow("https://docs.example.com/blog/post-1"));
        assert!(s.should_follow("https://docs.example.com/blogging"));
    }

    #[test]
    fn binary_extensions_skipped() {
        let s = scope(&[]);
        assert!(!s.should_follow("https://docs.example.com/manual.PDF"));
        assert!(!s.should_follow("https://docs.example.com/release.tar.gz"));
        assert!(s.should_follow("https://docs.example.com/pdf-export-guide"));
    }

    #[test]
    fn invalid_start_url() {
        assert!(CrawlScope::new("not a url", &CrawlConfig::default()).is_err());
    }
}

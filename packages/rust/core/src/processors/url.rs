//! Single web pages.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use docstitch_crawler::{PageFetcher, extract_page};
use docstitch_markdown::{NO_DESCRIPTION, first_description, first_heading};
use docstitch_shared::{Result, ResultMetadata, SourceType};

use super::{ProcessedSource, SourceProcessor};

/// Fetches one page through the crawler's page-extraction routine.
pub struct UrlProcessor {
    fetcher: Arc<dyn PageFetcher>,
    fetch_timeout: Duration,
}

impl UrlProcessor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            fetch_timeout,
        }
    }
}

#[async_trait]
impl SourceProcessor for UrlProcessor {
    fn source_type(&self) -> SourceType {
        SourceType::Url
    }

    async fn process(&self, raw: &str) -> Result<ProcessedSource> {
        let page = extract_page(self.fetcher.as_ref(), raw, self.fetch_timeout).await?;

        let title = page
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| first_heading(&page.markdown))
            .unwrap_or_else(|| raw.to_string());
        let description = page
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| first_description(&page.markdown))
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        let mut metadata = ResultMetadata::new(title, description);
        metadata.url = Some(page.url);

        Ok(ProcessedSource {
            content: page.markdown,
            metadata,
        })
    }
}

impl std::fmt::Debug for UrlProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlProcessor")
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

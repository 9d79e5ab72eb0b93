//! Local Markdown files.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use docstitch_markdown::{NO_DESCRIPTION, first_description, first_heading};
use docstitch_shared::{DocStitchError, Result, ResultMetadata, SourceType};

use super::{ProcessedSource, SourceProcessor, local_file};

const UNTITLED: &str = "Untitled Markdown Document";

/// Reads a Markdown file as-is and derives title and description from it.
#[derive(Debug, Clone, Default)]
pub struct MarkdownProcessor;

#[async_trait]
impl SourceProcessor for MarkdownProcessor {
    fn source_type(&self) -> SourceType {
        SourceType::Markdown
    }

    async fn process(&self, raw: &str) -> Result<ProcessedSource> {
        let path = Path::new(raw);
        let file_meta = local_file(path).await?;

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DocStitchError::io(path, e))?;
        debug!(path = raw, bytes = file_meta.len(), "read markdown file");

        let mut metadata = ResultMetadata::new(
            first_heading(&content).unwrap_or_else(|| UNTITLED.to_string()),
            first_description(&content).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        );
        metadata.file_path = Some(raw.to_string());
        metadata.file_size = Some(file_meta.len());

        Ok(ProcessedSource { content, metadata })
    }
}

//! Per-type source processors.
//!
//! Each processor turns one raw input string into Markdown content plus
//! metadata. Timing, timeouts and failure capture are left to the
//! orchestrator so every processor is exercised the same way.

mod convert;
mod markdown;
mod pdf;
mod url;

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use docstitch_shared::{DocStitchError, Result, ResultMetadata, SourceType};

pub use convert::{CommandConverter, ConvertedDocument, DocumentConverter};
pub use markdown::MarkdownProcessor;
pub use pdf::PdfProcessor;
pub use self::url::UrlProcessor;

/// Content and metadata produced from one input.
#[derive(Debug, Clone)]
pub struct ProcessedSource {
    pub content: String,
    pub metadata: ResultMetadata,
}

/// Metadata of a local input that must be a regular file.
///
/// Only a missing path is `NotFound`; other I/O failures keep their cause.
async fn local_file(path: &Path) -> Result<std::fs::Metadata> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => DocStitchError::not_found(path),
        _ => DocStitchError::io(path, e),
    })?;
    if !meta.is_file() {
        return Err(DocStitchError::validation(format!(
            "not a file: {}",
            path.display()
        )));
    }
    Ok(meta)
}

/// Processes inputs of a single [`SourceType`].
#[async_trait]
pub trait SourceProcessor: Send + Sync {
    fn source_type(&self) -> SourceType;

    async fn process(&self, raw: &str) -> Result<ProcessedSource>;
}

//! PDF documents, local or remote.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::timeout;
use tracing::{debug, info};
use url::Url;

use docstitch_markdown::{first_heading, normalize_markdown};
use docstitch_shared::{DocStitchError, Result, ResultMetadata, SourceType};

use super::{DocumentConverter, ProcessedSource, SourceProcessor, local_file};

/// User-Agent string for PDF downloads.
const USER_AGENT: &str = concat!("docstitch/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Converts PDFs through a [`DocumentConverter`].
///
/// Remote PDFs are downloaded into a temporary directory that is removed
/// when processing ends, whether it succeeded or not.
pub struct PdfProcessor {
    converter: Arc<dyn DocumentConverter>,
    client: Client,
    conversion_timeout: Duration,
}

impl PdfProcessor {
    pub fn new(
        converter: Arc<dyn DocumentConverter>,
        download_timeout: Duration,
        conversion_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(download_timeout)
            .build()
            .map_err(|e| DocStitchError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            converter,
            client,
            conversion_timeout,
        })
    }

    async fn download(&self, url: &str, dir: &Path) -> Result<(PathBuf, u64)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DocStitchError::Fetch(format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DocStitchError::Fetch(format!("{url}: HTTP {status}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DocStitchError::Fetch(format!("{url}: body read failed: {e}")))?;

        let target = dir.join(download_name(url));
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| DocStitchError::io(&target, e))?;
        debug!(url, bytes = bytes.len(), path = %target.display(), "downloaded pdf");
        Ok((target, bytes.len() as u64))
    }
}

#[async_trait]
impl SourceProcessor for PdfProcessor {
    fn source_type(&self) -> SourceType {
        SourceType::Pdf
    }

    async fn process(&self, raw: &str) -> Result<ProcessedSource> {
        let remote = raw.starts_with("http://") || raw.starts_with("https://");

        // Removed on drop, including every early return below.
        let scratch = if remote {
            Some(tempfile::tempdir().map_err(|e| DocStitchError::io(std::env::temp_dir(), e))?)
        } else {
            None
        };

        let (path, file_size) = match &scratch {
            Some(dir) => self.download(raw, dir.path()).await?,
            None => {
                let path = PathBuf::from(raw);
                let meta = local_file(&path).await?;
                (path, meta.len())
            }
        };

        let converted = timeout(self.conversion_timeout, self.converter.convert(&path))
            .await
            .map_err(|_| {
                DocStitchError::Timeout(format!(
                    "converting {raw} exceeded {}s",
                    self.conversion_timeout.as_secs()
                ))
            })??;

        let content = normalize_markdown(&converted.markdown);
        let title = first_heading(&content).unwrap_or_else(|| document_stem(&path));
        info!(source = raw, pages = converted.pages, "converted pdf");

        let mut metadata = ResultMetadata::new(
            title,
            format!("PDF document with {} pages", converted.pages),
        );
        if remote {
            metadata.url = Some(raw.to_string());
        } else {
            metadata.file_path = Some(raw.to_string());
        }
        metadata.file_size = Some(file_size);
        metadata.pdf_pages = Some(converted.pages);
        metadata.pdf_figures = Some(converted.figures);
        metadata.pdf_tables = Some(converted.tables);

        Ok(ProcessedSource { content, metadata })
    }
}

impl std::fmt::Debug for PdfProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfProcessor")
            .field("conversion_timeout", &self.conversion_timeout)
            .finish_non_exhaustive()
    }
}

/// Local file name for a downloaded PDF: the URL's last path segment.
fn download_name(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    let name: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if name.to_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{name}.pdf")
    }
}

fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled PDF".to_string())
}

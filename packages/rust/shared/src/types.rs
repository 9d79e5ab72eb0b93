//! Core domain types shared by the navigation, crawler and orchestration crates.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SourceType
// ---------------------------------------------------------------------------

/// The kind of source an input string refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Url,
    Pdf,
    Markdown,
}

impl SourceType {
    /// Stable lowercase name used in logs and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
        }
    }

    /// Icon shown next to compiled sections.
    pub fn icon(self) -> &'static str {
        match self {
            Self::Url => "🌐",
            Self::Pdf => "📄",
            Self::Markdown => "📝",
        }
    }

    /// Human-readable type label.
    pub fn description(self) -> &'static str {
        match self {
            Self::Url => "Web Page",
            Self::Pdf => "PDF Document",
            Self::Markdown => "Markdown File",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InputDescriptor / ProcessingResult
// ---------------------------------------------------------------------------

/// A validated input, tagged with its declaration position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    /// Zero-based index in the caller's input list. The sole reassembly key.
    pub position: usize,
    /// The trimmed input string.
    pub raw: String,
    /// Classified source type.
    pub detected_type: SourceType,
}

/// Metadata extracted while processing one input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub title: String,
    pub description: String,
    pub processed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_pages: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_figures: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_tables: Option<usize>,
}

impl ResultMetadata {
    /// Metadata with only a title and description set.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            processed_at: Utc::now(),
            url: None,
            file_path: None,
            file_size: None,
            pdf_pages: None,
            pdf_figures: None,
            pdf_tables: None,
        }
    }
}

/// Outcome of processing exactly one [`InputDescriptor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub position: usize,
    pub input_type: SourceType,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Wall-clock seconds spent on this input.
    pub processing_time: f64,
}

impl ProcessingResult {
    /// A successful result carrying the processed content.
    pub fn succeeded(
        input: &InputDescriptor,
        content: String,
        metadata: ResultMetadata,
        processing_time: f64,
    ) -> Self {
        Self {
            success: true,
            position: input.position,
            input_type: input.detected_type,
            source: input.raw.clone(),
            content: Some(content),
            metadata: Some(metadata),
            error_message: None,
            processing_time,
        }
    }

    /// A failed result. The error text is never empty.
    pub fn failed(input: &InputDescriptor, error: impl ToString, processing_time: f64) -> Self {
        let mut message = error.to_string();
        if message.trim().is_empty() {
            message = "unknown error".into();
        }
        Self {
            success: false,
            position: input.position,
            input_type: input.detected_type,
            source: input.raw.clone(),
            content: None,
            metadata: None,
            error_message: Some(message),
            processing_time,
        }
    }

    /// Title from metadata, falling back to the source string.
    pub fn title(&self) -> &str {
        self.metadata
            .as_ref()
            .map(|m| m.title.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.source)
    }
}

// ---------------------------------------------------------------------------
// PageContent / OrderedUrl
// ---------------------------------------------------------------------------

/// A crawled page loaded back from its persisted artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// Normalized URL (fragment and trailing slash stripped).
    pub url: String,
    pub title: String,
    pub content: String,
    /// Artifact file the page was loaded from.
    pub filepath: PathBuf,
    pub depth: u32,
    pub crawled_at: String,
    /// Position in the navigation order, once matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nav_breadcrumb: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_level: Option<i32>,
}

impl PageContent {
    /// File name of the backing artifact.
    pub fn file_name(&self) -> String {
        self.filepath
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One entry of a navigation tree flattened into reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedUrl {
    pub url: String,
    pub title: String,
    pub level: i32,
    /// Ancestor titles, outermost first, including this entry.
    pub breadcrumb: Vec<String>,
    /// Sequential reading-order index starting at 0.
    pub order: usize,
}

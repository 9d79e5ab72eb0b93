//! Error types for docstitch.
//!
//! Library crates use [`DocStitchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docstitch operations.
#[derive(Debug, thiserror::Error)]
pub enum DocStitchError {
    /// Malformed, empty or oversized input batch.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A local input file does not exist.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The input could not be mapped to a processor.
    #[error("unsupported input type: {0}")]
    UnsupportedType(String),

    /// Network, HTTP or page-render failure.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Document conversion failure (PDF service or HTML-to-Markdown).
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTML, XML or frontmatter parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// An external call exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocStitchError>;

impl DocStitchError {
    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a not-found error for a local path.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocStitchError::validation("no inputs provided");
        assert_eq!(err.to_string(), "validation error: no inputs provided");

        let err = DocStitchError::not_found("docs/missing.md");
        assert_eq!(err.to_string(), "file not found: docs/missing.md");

        let err = DocStitchError::Timeout("fetch https://example.com after 30s".into());
        assert!(err.to_string().starts_with("timed out"));
    }
}

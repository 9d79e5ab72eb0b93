//! Document-conversion collaborator.
//!
//! PDF conversion runs out of process. [`CommandConverter`] spawns the
//! configured command per document and exchanges one JSON line each way:
//!
//! ```text
//! -> {"type":"convert","path":"/tmp/report.pdf"}
//! <- {"type":"result","markdown":"# Report ...","pages":12,"figures":3,"tables":1}
//! <- {"type":"error","error":"encrypted document"}
//! ```

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use docstitch_shared::{DocStitchError, PdfConfig, Result};

/// Markdown export of a converted document with its structural counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertedDocument {
    pub markdown: String,
    pub pages: usize,
    pub figures: usize,
    pub tables: usize,
}

/// Converts a local document file to Markdown.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, path: &Path) -> Result<ConvertedDocument>;
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ConvertRequest<'a> {
    Convert { path: &'a str },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ConvertResponse {
    Result {
        markdown: String,
        #[serde(default)]
        pages: usize,
        #[serde(default)]
        figures: usize,
        #[serde(default)]
        tables: usize,
    },
    Error {
        error: String,
    },
}

// ---------------------------------------------------------------------------
// CommandConverter
// ---------------------------------------------------------------------------

/// [`DocumentConverter`] backed by an external command speaking JSON lines.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    command: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl From<&PdfConfig> for CommandConverter {
    fn from(config: &PdfConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }
}

#[async_trait]
impl DocumentConverter for CommandConverter {
    #[instrument(skip_all, fields(cmd = %self.command, path = %path.display()))]
    async fn convert(&self, path: &Path) -> Result<ConvertedDocument> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DocStitchError::Conversion(format!(
                    "failed to spawn converter: {e}. Is `{}` installed?",
                    self.command
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DocStitchError::Conversion("failed to capture converter stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DocStitchError::Conversion("failed to capture converter stdout".into()))?;

        let path_text = path.to_string_lossy();
        let request = serde_json::to_string(&ConvertRequest::Convert { path: &path_text })
            .map_err(|e| DocStitchError::Conversion(format!("failed to serialize request: {e}")))?;
        stdin
            .write_all(format!("{request}\n").as_bytes())
            .await
            .map_err(|e| DocStitchError::Conversion(format!("failed to write to converter: {e}")))?;
        // Closing stdin tells the converter no more requests follow.
        drop(stdin);

        let line = BufReader::new(stdout)
            .lines()
            .next_line()
            .await
            .map_err(|e| DocStitchError::Conversion(format!("converter read error: {e}")))?
            .ok_or_else(|| {
                DocStitchError::Conversion("converter closed stdout without a response".into())
            })?;

        match child.wait().await {
            Ok(status) if !status.success() => warn!(?status, "converter exited with failure"),
            Ok(status) => debug!(?status, "converter exited"),
            Err(e) => warn!("converter wait error: {e}"),
        }

        let response: ConvertResponse = serde_json::from_str(line.trim()).map_err(|e| {
            DocStitchError::Conversion(format!(
                "invalid converter response: {e} (got: {})",
                line.chars().take(200).collect::<String>()
            ))
        })?;

        match response {
            ConvertResponse::Result {
                markdown,
                pages,
                figures,
                tables,
            } => Ok(ConvertedDocument {
                markdown,
                pages,
                figures,
                tables,
            }),
            ConvertResponse::Error { error } => Err(DocStitchError::Conversion(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> CommandConverter {
        CommandConverter::new("sh", vec!["-c".into(), script.into()])
    }

    #[test]
    fn request_is_tagged() {
        let json = serde_json::to_string(&ConvertRequest::Convert { path: "/tmp/a.pdf" }).unwrap();
        assert_eq!(json, r#"{"type":"convert","path":"/tmp/a.pdf"}"#);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn result_line_is_parsed() {
        let converter = shell(
            r##"read -r _; printf '%s\n' '{"type":"result","markdown":"# Report\n\nBody","pages":3,"figures":1,"tables":2}'"##,
        );
        let doc = converter.convert(Path::new("/tmp/report.pdf")).await.unwrap();
        assert_eq!(doc.markdown, "# Report\n\nBody");
        assert_eq!((doc.pages, doc.figures, doc.tables), (3, 1, 2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn converter_echoes_requested_path() {
        let converter = shell(
            r#"read -r line; case "$line" in *'"path":"/data/in.pdf"'*) printf '%s\n' '{"type":"result","markdown":"ok"}';; *) printf '%s\n' '{"type":"error","error":"bad request"}';; esac"#,
        );
        let doc = converter.convert(Path::new("/data/in.pdf")).await.unwrap();
        assert_eq!(doc.markdown, "ok");
        assert_eq!(doc.pages, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn error_line_becomes_conversion_error() {
        let converter = shell(r#"read -r _; printf '%s\n' '{"type":"error","error":"encrypted document"}'"#);
        let err = converter.convert(Path::new("/tmp/x.pdf")).await.unwrap_err();
        assert!(matches!(err, DocStitchError::Conversion(ref m) if m == "encrypted document"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_converter_is_an_error() {
        let converter = shell("read -r _; exit 3");
        let err = converter.convert(Path::new("/tmp/x.pdf")).await.unwrap_err();
        assert!(err.to_string().contains("without a response"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_json_reply_is_truncated_on_char_boundary() {
        let converter = shell(
            r#"read -r _; printf '%s\n' "$(printf 'a%.0s' $(seq 199))éééé""#,
        );
        let err = converter.convert(Path::new("/tmp/x.pdf")).await.unwrap_err();
        let DocStitchError::Conversion(message) = err else {
            panic!("expected conversion error");
        };
        assert!(message.starts_with("invalid converter response"));
        assert!(message.contains(&format!("{}é)", "a".repeat(199))));
    }

    #[tokio::test]
    async fn missing_command_is_reported() {
        let converter = CommandConverter::new("docstitch-no-such-converter", vec![]);
        let err = converter.convert(Path::new("/tmp/x.pdf")).await.unwrap_err();
        assert!(err.to_string().contains("failed to spawn converter"));
    }
}

//! Input classification and batch validation.

use std::path::Path;

use tracing::warn;

use crate::error::{DocStitchError, Result};
use crate::types::{InputDescriptor, SourceType};

/// Largest batch accepted by [`validate_batch`].
pub const MAX_BATCH_SIZE: usize = 100;

/// Map a raw input string to its source type.
///
/// Total and deterministic: anything unrecognized falls back to
/// [`SourceType::Url`].
pub fn classify(raw: &str) -> SourceType {
    let input = raw.trim();
    let lower = input.to_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        if lower.ends_with(".pdf") || lower.contains("/pdf/") || lower.contains(".pdf") {
            return SourceType::Pdf;
        }
        return SourceType::Url;
    }

    let path = Path::new(input);
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => SourceType::Pdf,
        "md" | "markdown" => SourceType::Markdown,
        "txt" if file_name_lower(path).contains("readme") => SourceType::Markdown,
        _ => {
            warn!(input, "could not determine input type, treating as URL");
            SourceType::Url
        }
    }
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Validate a batch and tag each entry with its position and type.
///
/// Fails on an empty batch, a batch larger than [`MAX_BATCH_SIZE`], or any
/// blank entry. Nothing is dispatched when this fails.
pub fn validate_batch<S: AsRef<str>>(raws: &[S]) -> Result<Vec<InputDescriptor>> {
    if raws.is_empty() {
        return Err(DocStitchError::validation("no inputs provided"));
    }
    if raws.len() > MAX_BATCH_SIZE {
        return Err(DocStitchError::validation(format!(
            "too many inputs ({}), maximum is {MAX_BATCH_SIZE}",
            raws.len()
        )));
    }

    raws.iter()
        .enumerate()
        .map(|(position, raw)| {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                return Err(DocStitchError::validation(format!(
                    "input at position {position} cannot be empty"
                )));
            }
            Ok(InputDescriptor {
                position,
                raw: raw.to_string(),
                detected_type: classify(raw),
            })
        })
        .collect()
}

/// Parse an input-list file: one entry per line, blank lines and `#` comments skipped.
pub fn parse_input_list(text: &str) -> Result<Vec<String>> {
    let inputs: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    if inputs.is_empty() {
        return Err(DocStitchError::validation("input file contains no entries"));
    }
    Ok(inputs)
}

//! Multi-source processing: validate, dispatch per type, reassemble by position.
//!
//! URL and Markdown inputs share one bounded-concurrency lane. PDFs run
//! strictly one at a time in their own lane. Both lanes run side by side and
//! results are put back into declaration order before the compilation
//! document is written.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use docstitch_crawler::PageFetcher;
use docstitch_shared::{
    DocStitchError, InputDescriptor, OrchestratorConfig, ProcessingResult, Result, SourceType,
    validate_batch,
};

use crate::anchor::section_anchor;
use crate::pipeline::ProgressReporter;
use crate::processors::{
    DocumentConverter, MarkdownProcessor, PdfProcessor, SourceProcessor, UrlProcessor,
};

/// Compiled output, written into the output directory.
pub const COMPILATION_FILE: &str = "multi_input_compilation.md";

// ---------------------------------------------------------------------------
// AggregateResult
// ---------------------------------------------------------------------------

/// Successful results per source type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub urls: usize,
    pub pdfs: usize,
    pub markdown: usize,
}

/// One failed input, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    /// Zero-based declaration position.
    pub position: usize,
    pub source: String,
    pub error: String,
}

/// Statistics and ordered results of one batch.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub total_inputs: usize,
    pub successful: usize,
    pub failed: usize,
    /// `successful / total_inputs`.
    pub success_rate: f64,
    pub duration_seconds: f64,
    /// Successful inputs per second.
    pub throughput: f64,
    pub results_by_type: TypeCounts,
    pub failures: Vec<FailureSummary>,
    pub output_path: PathBuf,
    /// One result per input, in declaration order.
    pub results: Vec<ProcessingResult>,
}

impl AggregateResult {
    fn from_results(results: Vec<ProcessingResult>, elapsed: f64, output_path: PathBuf) -> Self {
        let total_inputs = results.len();
        let successful = results.iter().filter(|r| r.success).count();

        let mut results_by_type = TypeCounts::default();
        for result in results.iter().filter(|r| r.success) {
            match result.input_type {
                SourceType::Url => results_by_type.urls += 1,
                SourceType::Pdf => results_by_type.pdfs += 1,
                SourceType::Markdown => results_by_type.markdown += 1,
            }
        }

        let failures = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| FailureSummary {
                position: r.position,
                source: r.source.clone(),
                error: r.error_message.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            total_inputs,
            successful,
            failed: total_inputs - successful,
            success_rate: if total_inputs == 0 {
                0.0
            } else {
                successful as f64 / total_inputs as f64
            },
            duration_seconds: elapsed,
            throughput: if elapsed > 0.0 {
                successful as f64 / elapsed
            } else {
                0.0
            },
            results_by_type,
            failures,
            output_path,
            results,
        }
    }

    /// A run counts as successful when at least one input succeeded.
    pub fn is_success(&self) -> bool {
        self.successful > 0
    }

    pub fn exit_code(&self) -> i32 {
        exit_code(self.success_rate)
    }
}

/// Process exit code for a success rate: 0 at 80% or more, 1 at 50% or more, else 2.
pub fn exit_code(success_rate: f64) -> i32 {
    if success_rate >= 0.8 {
        0
    } else if success_rate >= 0.5 {
        1
    } else {
        2
    }
}

// ---------------------------------------------------------------------------
// MultiSourceOrchestrator
// ---------------------------------------------------------------------------

/// Processes a mixed batch of URLs, PDFs and Markdown files.
pub struct MultiSourceOrchestrator {
    config: OrchestratorConfig,
    url: Arc<dyn SourceProcessor>,
    pdf: Arc<dyn SourceProcessor>,
    markdown: Arc<dyn SourceProcessor>,
}

impl MultiSourceOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        url: Arc<dyn SourceProcessor>,
        pdf: Arc<dyn SourceProcessor>,
        markdown: Arc<dyn SourceProcessor>,
    ) -> Self {
        Self {
            config,
            url,
            pdf,
            markdown,
        }
    }

    /// Build the default processors around the given collaborators.
    pub fn with_collaborators(
        config: OrchestratorConfig,
        fetcher: Arc<dyn PageFetcher>,
        converter: Arc<dyn DocumentConverter>,
    ) -> Result<Self> {
        let url = Arc::new(UrlProcessor::new(fetcher, config.fetch_timeout));
        let pdf = Arc::new(PdfProcessor::new(
            converter,
            config.fetch_timeout,
            config.conversion_timeout,
        )?);
        Ok(Self::new(config, url, pdf, Arc::new(MarkdownProcessor)))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn processor_for(&self, source_type: SourceType) -> &dyn SourceProcessor {
        match source_type {
            SourceType::Url => self.url.as_ref(),
            SourceType::Pdf => self.pdf.as_ref(),
            SourceType::Markdown => self.markdown.as_ref(),
        }
    }

    /// Process `inputs` and write the compilation document.
    ///
    /// An invalid batch fails before anything is dispatched. Otherwise every
    /// input yields exactly one result, failures included, ordered by
    /// declaration position.
    #[instrument(skip_all, fields(inputs = inputs.len()))]
    pub async fn process<S: AsRef<str>>(
        &self,
        inputs: &[S],
        progress: &dyn ProgressReporter,
    ) -> Result<AggregateResult> {
        let started = Instant::now();
        let descriptors = validate_batch(inputs)?;
        let total = descriptors.len();

        let (pdfs, shared): (Vec<&InputDescriptor>, Vec<&InputDescriptor>) = descriptors
            .iter()
            .partition(|d| d.detected_type == SourceType::Pdf);
        info!(
            total,
            pdfs = pdfs.len(),
            shared = shared.len(),
            max_concurrency = self.config.max_concurrency,
            output_dir = %self.config.output_dir.display(),
            "processing inputs"
        );
        progress.phase("Processing inputs");

        let completed = AtomicUsize::new(0);
        let semaphore = Semaphore::new(self.config.max_concurrency.max(1));

        let shared_lane = join_all(shared.into_iter().map(|input| {
            let semaphore = &semaphore;
            let completed = &completed;
            async move {
                let _permit = semaphore.acquire().await.ok();
                let result = self.run_unit(input).await;
                progress.unit_finished(&result, completed.fetch_add(1, Ordering::Relaxed) + 1, total);
                result
            }
        }));
        let pdf_lane = async {
            let mut results = Vec::with_capacity(pdfs.len());
            for input in pdfs {
                let result = self.run_unit(input).await;
                progress.unit_finished(&result, completed.fetch_add(1, Ordering::Relaxed) + 1, total);
                results.push(result);
            }
            results
        };

        let (mut results, pdf_results) = tokio::join!(shared_lane, pdf_lane);
        results.extend(pdf_results);
        results.sort_by_key(|r| r.position);

        progress.phase("Writing compilation");
        let output_path = self.write_compilation(&results)?;

        let aggregate =
            AggregateResult::from_results(results, started.elapsed().as_secs_f64(), output_path);
        progress.done(&format!(
            "{} of {} inputs succeeded, {} failed",
            aggregate.successful, aggregate.total_inputs, aggregate.failed
        ));
        info!(
            successful = aggregate.successful,
            failed = aggregate.failed,
            success_rate = aggregate.success_rate,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch complete"
        );
        Ok(aggregate)
    }

    /// Run one input under the unit timeout. Never fails: errors become a failed result.
    async fn run_unit(&self, input: &InputDescriptor) -> ProcessingResult {
        let started = Instant::now();
        let processor = self.processor_for(input.detected_type);

        let outcome = match timeout(self.config.unit_timeout, processor.process(&input.raw)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(DocStitchError::Timeout(format!(
                "processing {} exceeded {}s",
                input.raw,
                self.config.unit_timeout.as_secs()
            ))),
        };
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(processed) => {
                ProcessingResult::succeeded(input, processed.content, processed.metadata, elapsed)
            }
            Err(e) => {
                warn!(position = input.position, source = %input.raw, error = %e, "input failed");
                ProcessingResult::failed(input, e, elapsed)
            }
        }
    }

    fn write_compilation(&self, results: &[ProcessingResult]) -> Result<PathBuf> {
        let dir = &self.config.output_dir;
        std::fs::create_dir_all(dir).map_err(|e| DocStitchError::io(dir, e))?;
        let path = dir.join(COMPILATION_FILE);
        std::fs::write(&path, render_compilation(results))
            .map_err(|e| DocStitchError::io(&path, e))?;
        Ok(path)
    }
}

impl std::fmt::Debug for MultiSourceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSourceOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Compilation document
// ---------------------------------------------------------------------------

/// Render results (already in position order) as one Markdown document.
pub fn render_compilation(results: &[ProcessingResult]) -> String {
    let mut out = String::from("# Multi-Input Document Compilation\n\n## Table of Contents\n\n");

    for (idx, result) in results.iter().enumerate() {
        let n = idx + 1;
        let kind = result.input_type;
        if result.success {
            let title = result.title();
            let _ = writeln!(
                out,
                "{n}. {} [{title}](#{}) - {}",
                kind.icon(),
                section_anchor(title),
                kind.description()
            );
        } else {
            let _ = writeln!(out, "{n}. ❌ Failed: {} - {}", result.source, error_text(result));
        }
    }
    out.push_str("\n---\n\n");

    for result in results {
        let kind = result.input_type;
        if result.success {
            let _ = writeln!(out, "## {} {}\n", kind.icon(), result.title());
            let _ = writeln!(out, "**Source**: {}", result.source);
            let _ = writeln!(out, "**Type**: {}", kind.description());
            let _ = writeln!(out, "**Position**: {}", result.position + 1);
            let _ = writeln!(out, "**Processing Time**: {:.2}s\n", result.processing_time);
            out.push_str("---\n\n");
            let content = result.content.as_deref().unwrap_or_default().trim_end();
            if !content.is_empty() {
                let _ = writeln!(out, "{content}\n");
            }
            out.push_str("---\n\n");
        } else {
            let _ = writeln!(out, "## ❌ Failed: {}\n", result.source);
            let _ = writeln!(out, "**Type**: {}", kind.description());
            let _ = writeln!(out, "**Position**: {}", result.position + 1);
            let _ = writeln!(out, "**Error**: {}\n", error_text(result));
            out.push_str("---\n\n");
        }
    }
    out
}

fn error_text(result: &ProcessingResult) -> &str {
    result.error_message.as_deref().unwrap_or("unknown error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

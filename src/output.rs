//! Output types returned by the file/URL layer.
//!
//! All types derive `Serialize`/`Deserialize` so the CLI can print them with
//! `--json` and callers can persist batch reports.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One converted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutput {
    /// The path or URL the Markdown came from.
    pub source: String,
    /// The rendered HTML: a fragment, or a full document in standalone mode.
    pub html: String,
    pub stats: DocumentStats,
}

/// Size and timing of one conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    /// Bytes of Markdown read.
    pub input_bytes: usize,
    /// Bytes of HTML produced.
    pub output_bytes: usize,
    /// Wall-clock time including reading the input.
    pub duration_ms: u64,
}

/// Outcome of one document of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// 0-based position of the input in the batch.
    pub index: usize,
    pub source: String,
    /// Where the HTML was written, when the batch had an output directory.
    pub output_path: Option<PathBuf>,
    /// Length of the rendered HTML in bytes (0 on failure).
    pub html_len: usize,
    /// `Some` if this document failed.
    pub error: Option<DocumentError>,
}

impl DocumentResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of [`crate::convert::convert_batch`], ordered by input index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub documents: Vec<DocumentResult>,
    pub stats: BatchStats,
}

/// Totals for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub converted_documents: usize,
    pub failed_documents: usize,
    /// Sum of `input_bytes` over converted documents.
    pub total_input_bytes: u64,
    /// Sum of HTML bytes over converted documents.
    pub total_output_bytes: u64,
    pub total_duration_ms: u64,
}

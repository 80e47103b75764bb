//! Error types for the md2html library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`RenderError`]: **Contained**: something went wrong *inside* one
//!   conversion (oversized input, a panicking stage). It never leaves the
//!   engine; [`crate::engine::convert_with`] turns it into a degraded
//!   `<p class="error">` paragraph so the text-in/text-out contract holds.
//!
//! * [`Md2HtmlError`]: **Fatal**: the outer file/URL layer cannot produce a
//!   document at all (missing file, failed download, unwritable output).
//!   Returned as `Err(Md2HtmlError)` from the `convert_*` functions in
//!   [`crate::convert`].
//!
//! * [`DocumentError`]: **Non-fatal**: one document of a batch failed but
//!   the others are fine. Stored inside [`crate::output::DocumentResult`] so
//!   callers can inspect partial success.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The stages of one conversion, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    ExtractFootnotes,
    Block,
    Inline,
    AppendFootnotes,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::ExtractFootnotes => "footnote extraction",
            Stage::Block => "block",
            Stage::Inline => "inline",
            Stage::AppendFootnotes => "footnote list",
        };
        f.write_str(name)
    }
}

/// A fault raised inside the conversion pipeline.
///
/// Always absorbed at the orchestrator boundary and rendered as a diagnostic
/// paragraph; see [`crate::engine::convert_with`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The input exceeds [`crate::ConversionConfig::max_input_bytes`].
    #[error("input is {len} bytes, exceeding the {limit}-byte limit")]
    InputTooLarge { len: usize, limit: usize },

    /// A stage panicked; the panic payload is kept as `detail`.
    #[error("{stage} stage failed: {detail}")]
    StageFailed { stage: Stage, detail: String },
}

/// All fatal errors returned by the file/URL layer of the library.
///
/// Per-document failures inside a batch use [`DocumentError`] and are stored
/// in [`crate::output::DocumentResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Md2HtmlError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor a valid HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The document was read but is not valid UTF-8 text.
    #[error("'{source_name}' is not valid UTF-8 text (first invalid byte at offset {offset})")]
    NotUtf8 { source_name: String, offset: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read the input file after it was found.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document of a batch.
///
/// The batch continues; the failure is recorded alongside the document's
/// position and source.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The input could not be resolved or read.
    #[error("{source_name}: read failed: {detail}")]
    ReadFailed { source_name: String, detail: String },

    /// The rendered HTML could not be written.
    #[error("{source_name}: write failed: {detail}")]
    WriteFailed { source_name: String, detail: String },
}

impl DocumentError {
    /// Classify a fatal single-document error as a batch-level failure.
    pub(crate) fn from_fatal(source_name: &str, err: &Md2HtmlError) -> Self {
        match err {
            Md2HtmlError::OutputWriteFailed { .. } => DocumentError::WriteFailed {
                source_name: source_name.to_string(),
                detail: err.to_string(),
            },
            _ => DocumentError::ReadFailed {
                source_name: source_name.to_string(),
                detail: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_too_large_display() {
        let e = RenderError::InputTooLarge {
            len: 2048,
            limit: 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("2048"), "got: {msg}");
        assert!(msg.contains("1024-byte"), "got: {msg}");
    }

    #[test]
    fn stage_failed_names_the_stage() {
        let e = RenderError::StageFailed {
            stage: Stage::Block,
            detail: "index out of bounds".into(),
        };
        assert_eq!(e.to_string(), "block stage failed: index out of bounds");
    }

    #[test]
    fn not_utf8_display() {
        let e = Md2HtmlError::NotUtf8 {
            source_name: "notes.md".into(),
            offset: 17,
        };
        assert!(e.to_string().contains("notes.md"));
        assert!(e.to_string().contains("17"));
    }

    #[test]
    fn write_failure_is_classified_as_write() {
        let fatal = Md2HtmlError::OutputWriteFailed {
            path: PathBuf::from("/out/a.html"),
            source: std::io::Error::other("disk full"),
        };
        let e = DocumentError::from_fatal("a.md", &fatal);
        assert!(matches!(e, DocumentError::WriteFailed { .. }));
        assert!(e.to_string().contains("disk full"));
    }

    #[test]
    fn read_failure_is_classified_as_read() {
        let fatal = Md2HtmlError::FileNotFound {
            path: PathBuf::from("missing.md"),
        };
        let e = DocumentError::from_fatal("missing.md", &fatal);
        assert!(matches!(e, DocumentError::ReadFailed { .. }));
    }
}

//! # md2html
//!
//! Convert Markdown documents to HTML.
//!
//! The core is a synchronous, allocation-only engine: one string in, one HTML
//! fragment out. It never returns an error: text that does not match a
//! Markdown construct passes through unchanged, and an internal fault yields
//! a short diagnostic paragraph in place of the document. Conversions share
//! no state, so any number of threads may convert at once.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Normalize   CRLF / CR → LF
//!  ├─ 2. Footnotes   pull out `[^id]: body` definitions
//!  ├─ 3. Blocks      headers, rules, quotes, lists, code, tables, paragraphs
//!  ├─ 4. Inline      links, images, emphasis, code spans, escapes, citations
//!  └─ 5. Footnotes   append the numbered footnote list
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! let html = md2html::convert("Hello **world**");
//! assert_eq!(html, "<p>Hello <strong>world</strong></p>");
//! ```
//!
//! Files, URLs and batches go through the async layer:
//!
//! ```rust,no_run
//! use md2html::{convert_document, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().standalone(true).build()?;
//!     let output = convert_document("README.md", &config).await?;
//!     println!("{}", output.html);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2html` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2html = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, DEFAULT_MAX_INPUT_BYTES};
pub use convert::{
    convert_batch, convert_document, convert_sync, convert_text, convert_to_file,
    wrap_standalone,
};
pub use engine::{convert, convert_with};
pub use error::{DocumentError, Md2HtmlError, RenderError, Stage};
pub use output::{BatchOutput, BatchStats, DocumentOutput, DocumentResult, DocumentStats};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, DocumentStream};

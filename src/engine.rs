//! The conversion engine: one Markdown string in, one HTML fragment out.
//!
//! [`convert_with`] sequences the pipeline stages for a single document and
//! owns the footnote registry for exactly that call. It never returns an
//! error and never panics past its own boundary: any fault inside a stage is
//! caught here and reported as a one-line diagnostic paragraph.

use crate::config::ConversionConfig;
use crate::error::{RenderError, Stage};
use crate::pipeline::footnotes::{self, FootnoteRegistry};
use crate::pipeline::markup::escape_html;
use crate::pipeline::{block, inline, normalize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Convert Markdown to HTML with the default configuration.
///
/// # Example
/// ```rust
/// let html = md2html::convert("# Hello\n\nSome *text*.");
/// assert_eq!(html, "<h1>Hello</h1>\n<p>Some <em>text</em>.</p>");
/// ```
pub fn convert(markdown: &str) -> String {
    convert_with(markdown, &ConversionConfig::default())
}

/// Convert Markdown to HTML.
///
/// Empty or whitespace-only input yields an empty string without running any
/// stage. A failure anywhere in the pipeline yields
/// `<p class="error">Conversion error: …</p>` in place of the document.
///
/// A stage failure is a caught panic, so the process panic hook still runs
/// before the degraded output is returned; with the default hook that means
/// a message on stderr. Embedders that need a silent stderr install their
/// own hook with [`std::panic::set_hook`].
pub fn convert_with(markdown: &str, config: &ConversionConfig) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    match render(markdown, config) {
        Ok(html) => html,
        Err(e) => {
            match e {
                RenderError::StageFailed { .. } => error!("Conversion failed: {}", e),
                RenderError::InputTooLarge { .. } => warn!("Conversion refused: {}", e),
            }
            error_paragraph(&e)
        }
    }
}

/// The degraded output returned in place of a document that failed to render.
pub fn error_paragraph(err: &RenderError) -> String {
    format!(
        "<p class=\"error\">Conversion error: {}</p>",
        escape_html(&err.to_string())
    )
}

fn render(markdown: &str, config: &ConversionConfig) -> Result<String, RenderError> {
    if let Some(limit) = config.max_input_bytes {
        if markdown.len() > limit {
            return Err(RenderError::InputTooLarge {
                len: markdown.len(),
                limit,
            });
        }
    }

    let started = Instant::now();
    let mut registry = FootnoteRegistry::new();

    let text = run_stage(Stage::Normalize, || {
        normalize::normalise_line_endings(markdown)
    })?;
    let text = if config.footnotes {
        run_stage(Stage::ExtractFootnotes, || {
            footnotes::extract_definitions(&text, &mut registry)
        })?
    } else {
        text
    };
    let html = run_stage(Stage::Block, || block::process_blocks(&text, config))?;
    let html = run_stage(Stage::Inline, || {
        inline::process_inline(&html, config, config.footnotes.then_some(&registry))
    })?;
    let html = run_stage(Stage::AppendFootnotes, || {
        footnotes::append_footnotes(html, &registry, |body| {
            inline::process_inline(body, config, None)
        })
    })?;

    debug!(
        "Rendered {} bytes → {} bytes ({} footnotes) in {}µs",
        markdown.len(),
        html.len(),
        registry.len(),
        started.elapsed().as_micros()
    );
    Ok(html)
}

/// Run one stage, turning a panic inside it into [`RenderError::StageFailed`].
fn run_stage<T>(stage: Stage, f: impl FnOnce() -> T) -> Result<T, RenderError> {
    let started = Instant::now();
    let out = panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        RenderError::StageFailed {
            stage,
            detail: panic_message(payload.as_ref()),
        }
    })?;
    debug!("{} stage done in {}µs", stage, started.elapsed().as_micros());
    Ok(out)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! File, URL and batch entry points.
//!
//! These wrap the synchronous engine ([`crate::engine::convert_with`]) for
//! callers that start from a path or URL. The engine runs on tokio's blocking
//! pool so large documents never stall the async executor. Use
//! [`crate::stream::convert_stream`] instead when documents should be handed
//! over as soon as each one is done.

use crate::config::ConversionConfig;
use crate::engine;
use crate::error::{DocumentError, Md2HtmlError};
use crate::output::{BatchOutput, BatchStats, DocumentOutput, DocumentResult, DocumentStats};
use crate::pipeline::input;
use crate::pipeline::markup::escape_html;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

static RE_FIRST_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h1>(.*?)</h1>").unwrap());
static RE_ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>").unwrap());

/// Convert a Markdown file or URL to HTML.
///
/// # Arguments
/// * `input_str`: Local file path or HTTP/HTTPS URL to a Markdown document
/// * `config`: Conversion configuration
///
/// # Errors
/// Returns `Err(Md2HtmlError)` only when the document cannot be read.
/// Rendering itself never fails; see [`crate::engine::convert_with`].
pub async fn convert_document(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentOutput, Md2HtmlError> {
    let started = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let mut output = convert_text(resolved.source, resolved.text, config).await?;
    output.stats.duration_ms = started.elapsed().as_millis() as u64;

    info!(
        "Converted {}: {} → {} bytes in {}ms",
        output.source, output.stats.input_bytes, output.stats.output_bytes, output.stats.duration_ms
    );
    Ok(output)
}

/// Convert Markdown already held in memory (e.g. read from stdin).
///
/// `source` only labels the result.
pub async fn convert_text(
    source: impl Into<String>,
    text: String,
    config: &ConversionConfig,
) -> Result<DocumentOutput, Md2HtmlError> {
    let started = Instant::now();
    let input_bytes = text.len();

    let cfg = config.clone();
    let fragment = tokio::task::spawn_blocking(move || engine::convert_with(&text, &cfg))
        .await
        .map_err(|e| Md2HtmlError::Internal(format!("Conversion task failed: {}", e)))?;

    let html = if config.standalone {
        wrap_standalone(&fragment, config.title.as_deref())
    } else {
        fragment
    };

    Ok(DocumentOutput {
        source: source.into(),
        stats: DocumentStats {
            input_bytes,
            output_bytes: html.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        },
        html,
    })
}

/// Convert a Markdown file or URL and write the HTML to `output_path`.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// reader never observes a partially written document.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentStats, Md2HtmlError> {
    let output = convert_document(input_str, config).await?;
    write_atomic(output_path.as_ref(), output.html).await?;
    Ok(output.stats)
}

/// Write `contents` to `path` via a temp file in the same directory.
pub async fn write_atomic(path: &Path, contents: String) -> Result<(), Md2HtmlError> {
    let path = path.to_path_buf();
    let target = path.clone();
    tokio::task::spawn_blocking(move || {
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok::<(), std::io::Error>(())
    })
    .await
    .map_err(|e| Md2HtmlError::Internal(format!("Write task failed: {}", e)))?
    .map_err(|source| Md2HtmlError::OutputWriteFailed {
        path: path.clone(),
        source,
    })?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Convert many documents concurrently.
///
/// At most `config.concurrency` documents are in flight at once. When
/// `out_dir` is given each document is written there as `<stem>.html`;
/// otherwise only lengths and errors are recorded. A failed document never
/// aborts the batch. Results are ordered by input position.
pub async fn convert_batch<I, S>(
    inputs: I,
    out_dir: Option<&Path>,
    config: &ConversionConfig,
) -> BatchOutput
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let started = Instant::now();
    let sources: Vec<String> = inputs.into_iter().map(Into::into).collect();
    let total = sources.len();
    let targets = out_dir.map(|dir| plan_output_paths(&sources, dir));
    info!("Starting batch of {} documents", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut documents: Vec<(DocumentResult, DocumentStats)> =
        stream::iter(sources.into_iter().enumerate().map(|(index, source)| {
            let target = targets.as_ref().map(|t| t[index].clone());
            async move {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_start(index, total, &source);
                }
                let outcome = convert_one(&source, target.as_deref(), config).await;
                match outcome {
                    Ok((html_len, stats)) => {
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_document_complete(index, total, html_len);
                        }
                        let result = DocumentResult {
                            index,
                            source,
                            output_path: target,
                            html_len,
                            error: None,
                        };
                        (result, stats)
                    }
                    Err(e) => {
                        warn!("Document {} failed: {}", source, e);
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_document_error(index, total, e.to_string());
                        }
                        let error = DocumentError::from_fatal(&source, &e);
                        let result = DocumentResult {
                            index,
                            source,
                            output_path: None,
                            html_len: 0,
                            error: Some(error),
                        };
                        (result, DocumentStats::default())
                    }
                }
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    documents.sort_by_key(|(result, _)| result.index);

    let converted = documents.iter().filter(|(r, _)| r.is_success()).count();
    let stats = BatchStats {
        total_documents: total,
        converted_documents: converted,
        failed_documents: total - converted,
        total_input_bytes: documents.iter().map(|(_, s)| s.input_bytes as u64).sum(),
        total_output_bytes: documents.iter().map(|(_, s)| s.output_bytes as u64).sum(),
        total_duration_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} documents, {}ms total",
        converted, total, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, converted);
    }

    BatchOutput {
        documents: documents.into_iter().map(|(r, _)| r).collect(),
        stats,
    }
}

async fn convert_one(
    source: &str,
    target: Option<&Path>,
    config: &ConversionConfig,
) -> Result<(usize, DocumentStats), Md2HtmlError> {
    let output = convert_document(source, config).await?;
    let html_len = output.html.len();
    if let Some(path) = target {
        write_atomic(path, output.html).await?;
    }
    Ok((html_len, output.stats))
}

/// `<stem>.html` for a path or URL; URLs without a file name become `index`.
pub fn output_file_name(source: &str) -> String {
    let name = if input::is_url(source) {
        reqwest::Url::parse(source)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut s| s.next_back().map(str::to_string))
            })
            .filter(|s| !s.is_empty())
    } else {
        Path::new(source)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
    };

    let name = name.unwrap_or_else(|| "index".to_string());
    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or(name);
    format!("{}.html", stem)
}

/// One output path per input; clashing names get a `-{index}` suffix.
fn plan_output_paths(sources: &[String], out_dir: &Path) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let mut name = output_file_name(source);
            if !taken.insert(name.clone()) {
                let stem = name.trim_end_matches(".html").to_string();
                name = format!("{}-{}.html", stem, index);
                taken.insert(name.clone());
            }
            out_dir.join(name)
        })
        .collect()
}

/// Synchronous wrapper around [`convert_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentOutput, Md2HtmlError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2HtmlError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_document(input_str, config))
}

/// Embed an HTML fragment in a minimal HTML5 document.
///
/// The title is `title` if given, else the text of the fragment's first
/// `<h1>`, else `"Document"`.
pub fn wrap_standalone(fragment: &str, title: Option<&str>) -> String {
    let title = match title {
        Some(t) => escape_html(t),
        None => RE_FIRST_H1
            .captures(fragment)
            .map(|c| RE_ANY_TAG.replace_all(&c[1], "").trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Document".to_string()),
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n{fragment}\n</body>\n</html>\n"
    )
}

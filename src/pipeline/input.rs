//! Input resolution: load Markdown text from a local path or an HTTP(S) URL.
//!
//! The engine itself never touches the file system or network; this module
//! feeds it for the async layer in [`crate::convert`]. Documents must be
//! UTF-8. A leading byte-order mark is dropped.

use crate::error::Md2HtmlError;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Markdown text together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    /// The path or URL as the caller gave it.
    pub source: String,
    pub text: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the Markdown named by `input`.
///
/// URLs are downloaded with a `timeout_secs` budget; anything else is read
/// as a local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Md2HtmlError> {
    if input.trim().is_empty() {
        return Err(Md2HtmlError::InvalidInput {
            input: input.to_string(),
        });
    }

    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };

    let text = decode_utf8(input, bytes)?;
    Ok(ResolvedInput {
        source: input.to_string(),
        text,
    })
}

/// Decode document bytes, dropping a UTF-8 byte-order mark.
pub fn decode_utf8(source_name: &str, mut bytes: Vec<u8>) -> Result<String, Md2HtmlError> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(..3);
    }
    String::from_utf8(bytes).map_err(|e| Md2HtmlError::NotUtf8 {
        source_name: source_name.to_string(),
        offset: e.utf8_error().valid_up_to(),
    })
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, Md2HtmlError> {
    let path = PathBuf::from(path_str);

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => {
            return Err(Md2HtmlError::InvalidInput {
                input: path_str.to_string(),
            })
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(Md2HtmlError::PermissionDenied { path })
        }
        Err(_) => return Err(Md2HtmlError::FileNotFound { path }),
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => Md2HtmlError::PermissionDenied { path: path.clone() },
        ErrorKind::NotFound => Md2HtmlError::FileNotFound { path: path.clone() },
        _ => Md2HtmlError::ReadFailed {
            path: path.clone(),
            source: e,
        },
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, Md2HtmlError> {
    info!("Downloading Markdown from: {}", url);

    let download_failed = |reason: String| Md2HtmlError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Md2HtmlError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            Md2HtmlError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

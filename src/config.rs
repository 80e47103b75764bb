//! Configuration types for Markdown-to-HTML conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The default configuration runs every
//! pass of the pipeline; switches only ever *skip* passes, never reorder them.

use crate::error::Md2HtmlError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default upper bound on the size of one input document (16 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for a Markdown-to-HTML conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md2html::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .tables(false)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert!(!config.tables);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Extract `[^id]: body` definitions, link `[^id]` references and append
    /// the footnote list. Default: true.
    ///
    /// When off, definition lines and references are ordinary text.
    pub footnotes: bool,

    /// Render pipe tables. Default: true.
    pub tables: bool,

    /// Render `~~x~~` as `<s>x</s>`. Default: true.
    pub strikethrough: bool,

    /// Largest input accepted by the engine, in bytes. Default: 16 MiB.
    ///
    /// Larger inputs produce the degraded error paragraph instead of HTML.
    /// `None` disables the check.
    pub max_input_bytes: Option<usize>,

    /// Wrap converted fragments in a full HTML5 document. Default: false.
    ///
    /// Only the file/URL layer in [`crate::convert`] honours this; the engine
    /// entry points always return a fragment.
    pub standalone: bool,

    /// `<title>` for standalone documents. Falls back to the first `<h1>`.
    pub title: Option<String>,

    /// Number of documents converted concurrently by the batch APIs. Default: 8.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Optional batch progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            footnotes: true,
            tables: true,
            strikethrough: true,
            max_input_bytes: Some(DEFAULT_MAX_INPUT_BYTES),
            standalone: false,
            title: None,
            concurrency: 8,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("footnotes", &self.footnotes)
            .field("tables", &self.tables)
            .field("strikethrough", &self.strikethrough)
            .field("max_input_bytes", &self.max_input_bytes)
            .field("standalone", &self.standalone)
            .field("title", &self.title)
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn footnotes(mut self, v: bool) -> Self {
        self.config.footnotes = v;
        self
    }

    pub fn tables(mut self, v: bool) -> Self {
        self.config.tables = v;
        self
    }

    pub fn strikethrough(mut self, v: bool) -> Self {
        self.config.strikethrough = v;
        self
    }

    pub fn max_input_bytes(mut self, limit: Option<usize>) -> Self {
        self.config.max_input_bytes = limit;
        self
    }

    pub fn standalone(mut self, v: bool) -> Self {
        self.config.standalone = v;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2HtmlError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Md2HtmlError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_input_bytes == Some(0) {
            return Err(Md2HtmlError::InvalidConfig(
                "max_input_bytes must be > 0 (use None to disable the limit)".into(),
            ));
        }
        Ok(self.config)
    }
}

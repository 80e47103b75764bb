//! CLI binary for md2html.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2html::convert::write_atomic;
use md2html::{
    convert_batch, convert_document, convert_text, ConversionConfig, ConversionProgressCallback,
    DocumentOutput, ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback for batches: a live bar plus one log line per
/// document. Documents may finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-document wall-clock start times, keyed by batch index.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} documents…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, source: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(source.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, html_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{html_len:>7} bytes")),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, error: String) {
        let secs = self.elapsed_secs(index);

        // Keep one line per document.
        let first_line = error.lines().next().unwrap_or_default();
        let msg = match first_line.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &first_line[..cut]),
            None => first_line.to_string(),
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents converted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one file (stdout)
  md2html README.md

  # Read from stdin
  cat notes.md | md2html -

  # Convert to a file, as a full HTML page
  md2html --standalone --title "Notes" notes.md -o notes.html

  # Convert from URL
  md2html https://example.com/CHANGELOG.md -o changelog.html

  # Batch: every document into one directory
  md2html docs/*.md -d site/ -c 16

  # Batch report as JSON
  md2html docs/*.md -d site/ --json > report.json

ENVIRONMENT VARIABLES:
  MD2HTML_OUTPUT            Default for --output
  MD2HTML_OUT_DIR           Default for --out-dir
  MD2HTML_CONCURRENCY       Default for --concurrency
  MD2HTML_MAX_INPUT_BYTES   Default for --max-input-bytes
  RUST_LOG                  Overrides the log filter (e.g. md2html=debug)
"#;

/// Convert Markdown files and URLs to HTML.
#[derive(Parser, Debug)]
#[command(
    name = "md2html",
    version,
    about = "Convert Markdown files and URLs to HTML",
    long_about = "Convert Markdown documents (local files, URLs or stdin) to HTML. Supports \
headers, lists, blockquotes, fenced code, pipe tables, footnotes, links, images and emphasis.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local Markdown file paths or HTTP/HTTPS URLs; `-` (the default) reads stdin.
    #[arg(default_value = "-")]
    inputs: Vec<String>,

    /// Write HTML to this file instead of stdout (single input only).
    #[arg(short, long, env = "MD2HTML_OUTPUT")]
    output: Option<PathBuf>,

    /// Write each document to `<DIR>/<stem>.html`.
    #[arg(short = 'd', long, env = "MD2HTML_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Emit a complete HTML5 document instead of a fragment.
    #[arg(long, env = "MD2HTML_STANDALONE")]
    standalone: bool,

    /// <title> for standalone output (default: first level-1 header).
    #[arg(long, env = "MD2HTML_TITLE")]
    title: Option<String>,

    /// Leave `[^id]` footnotes as plain text.
    #[arg(long, env = "MD2HTML_NO_FOOTNOTES")]
    no_footnotes: bool,

    /// Leave pipe tables as plain text.
    #[arg(long, env = "MD2HTML_NO_TABLES")]
    no_tables: bool,

    /// Leave `~~x~~` as plain text.
    #[arg(long, env = "MD2HTML_NO_STRIKETHROUGH")]
    no_strikethrough: bool,

    /// Largest accepted document in bytes; 0 disables the limit.
    #[arg(long, env = "MD2HTML_MAX_INPUT_BYTES", default_value_t = md2html::DEFAULT_MAX_INPUT_BYTES)]
    max_input_bytes: usize,

    /// Number of documents converted concurrently.
    #[arg(short, long, env = "MD2HTML_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MD2HTML_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Output structured JSON (document or batch report) instead of HTML.
    #[arg(long, env = "MD2HTML_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MD2HTML_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2HTML_QUIET")]
    quiet: bool,
}

impl Cli {
    fn is_batch(&self) -> bool {
        self.out_dir.is_some() || self.inputs.len() > 1
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs during batches.
    let show_progress = cli.is_batch() && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    validate_args(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    if cli.is_batch() {
        run_batch(&cli, &config).await
    } else {
        run_single(&cli, &config).await
    }
}

fn validate_args(cli: &Cli) -> Result<()> {
    if cli.inputs.iter().any(|i| i == "-") && cli.is_batch() {
        anyhow::bail!("'-' (stdin) cannot be combined with other inputs or --out-dir");
    }
    if cli.output.is_some() && cli.is_batch() {
        anyhow::bail!("--output takes a single input; use --out-dir for several");
    }
    if cli.inputs.len() > 1 && cli.out_dir.is_none() && !cli.json {
        anyhow::bail!("Converting several inputs requires --out-dir (or --json)");
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let max_input_bytes = (cli.max_input_bytes > 0).then_some(cli.max_input_bytes);

    let mut builder = ConversionConfig::builder()
        .footnotes(!cli.no_footnotes)
        .tables(!cli.no_tables)
        .strikethrough(!cli.no_strikethrough)
        .max_input_bytes(max_input_bytes)
        .standalone(cli.standalone)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn run_single(cli: &Cli, config: &ConversionConfig) -> Result<()> {
    let input = &cli.inputs[0];

    let output: DocumentOutput = if input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read Markdown from stdin")?;
        convert_text("<stdin>", text, config).await?
    } else {
        convert_document(input, config)
            .await
            .context("Conversion failed")?
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref path) = cli.output {
        write_atomic(path, output.html.clone()).await?;
        if !cli.quiet {
            eprintln!(
                "{}  {} → {} bytes  {}ms  →  {}",
                green("✔"),
                output.stats.input_bytes,
                output.stats.output_bytes,
                output.stats.duration_ms,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.html.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !output.html.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    Ok(())
}

async fn run_batch(cli: &Cli, config: &ConversionConfig) -> Result<()> {
    let out_dir = cli.out_dir.as_deref();
    let batch = convert_batch(cli.inputs.iter().cloned(), out_dir, config).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&batch).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        // Without the bar nothing has been printed per document yet.
        if config.progress_callback.is_none() {
            for doc in &batch.documents {
                match (&doc.error, &doc.output_path) {
                    (Some(e), _) => eprintln!("{} {}", red("✗"), e),
                    (None, Some(path)) => {
                        eprintln!("{} {} → {}", green("✓"), doc.source, path.display())
                    }
                    (None, None) => eprintln!("{} {}", green("✓"), doc.source),
                }
            }
        }
        eprintln!(
            "   {} in  /  {} out  —  {}ms total",
            dim(&format!("{} bytes", batch.stats.total_input_bytes)),
            dim(&format!("{} bytes", batch.stats.total_output_bytes)),
            batch.stats.total_duration_ms,
        );
    }

    if batch.stats.failed_documents > 0 {
        anyhow::bail!(
            "{} of {} documents failed",
            batch.stats.failed_documents,
            batch.stats.total_documents
        );
    }
    Ok(())
}

//! CLI binary for pagescribe.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagescribe::{
    extract_dir, extract_to_file, inspect, output_path, ExtractionConfig,
    ExtractionProgressCallback, ProgressCallback, DEFAULT_MODEL,
};
use std::collections::HashMap;
use std::io;
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

/// Terminal progress callback: renders a live progress bar and per-chunk log
/// lines using [indicatif]. Designed to work correctly when chunks complete
/// out-of-order under the concurrent dispatcher.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-chunk wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_extraction_start` (called once the PDF has been split).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_extraction_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_chunks: usize) {
        // Switch from spinner-only style to full progress bar now that we
        // know the actual chunk count.
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_chunks} chunks…"))
        ));
    }

    fn on_chunk_start(&self, chunk_index: usize, _total_chunks: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(chunk_index, Instant::now());
        self.bar.set_message(format!("chunk {}", chunk_index + 1));
    }

    fn on_chunk_complete(&self, chunk_index: usize, total_chunks: usize, item_count: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&chunk_index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<9}  {}",
            green("✓"),
            chunk_index + 1,
            total_chunks,
            dim(&format!("{item_count:>3} items")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, chunk_index: usize, total_chunks: usize, error: String) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&chunk_index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error,
        };

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}  {}",
            red("✗"),
            chunk_index + 1,
            total_chunks,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_chunks: usize, success_count: usize) {
        let failed = total_chunks.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} chunks extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} chunks extracted  ({} failed)",
                if failed == total_chunks {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_chunks,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r###"EXAMPLES:
  # Extract a single document to output/document.txt
  pagescribe document.pdf

  # Choose the output directory
  pagescribe document.pdf --output-dir transcripts

  # Batch mode: every *.pdf in a directory
  pagescribe ./papers --output-dir transcripts

  # Larger chunks, fewer API calls
  pagescribe --chunk-size 5 document.pdf

  # Inspect PDF metadata (no API key needed)
  pagescribe --inspect-only document.pdf

  # Structured JSON on stdout
  pagescribe --json document.pdf > result.json

OUTPUT:
  Plain text with one [page_index: N] marker per page, sub-titles as
  "## Heading" lines, and tables in GitHub-flavored Markdown. Paragraphs
  the model marks as incomplete are stitched across page boundaries.
  Pages of a failed chunk are omitted; the rest of the document survives.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (required for extraction)
  PAGESCRIBE_MODEL        Override the model ID
  PAGESCRIBE_OUTPUT_DIR   Override the default output directory
  RUST_LOG                Tracing filter, e.g. RUST_LOG=pagescribe=debug

SETUP:
  1. Get an API key:  https://aistudio.google.com/apikey
  2. Set it:          export GEMINI_API_KEY=...
  3. Extract:         pagescribe document.pdf
"###;

/// Transcribe PDF documents to structured text using Google Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "pagescribe",
    version,
    about = "Transcribe PDF documents to structured text using Google Gemini",
    long_about = "Transcribe PDF documents (a single file or a whole directory) to clean, \
structured text using the Gemini API. Documents are split into small page chunks that are \
transcribed concurrently and merged back into page order.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file, or a directory of PDFs for batch mode.
    input: PathBuf,

    /// Directory for the extracted .txt files.
    #[arg(short, long, env = "PAGESCRIBE_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Gemini API key (falls back to $GEMINI_API_KEY).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model ID.
    #[arg(long, env = "PAGESCRIBE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Pages per chunk sent to the model.
    #[arg(long, env = "PAGESCRIBE_CHUNK_SIZE", default_value_t = 3)]
    chunk_size: usize,

    /// Number of concurrent model calls per document.
    #[arg(short, long, env = "PAGESCRIBE_CONCURRENCY", default_value_t = 5)]
    concurrency: usize,

    /// Retries per chunk on model failure.
    #[arg(long, env = "PAGESCRIBE_MAX_RETRIES", default_value_t = 4)]
    max_retries: u32,

    /// Print the structured extraction result as JSON on stdout.
    #[arg(long, env = "PAGESCRIBE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAGESCRIBE_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGESCRIBE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGESCRIBE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let batch = cli.input.is_dir();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active; the
    // bar provides all the feedback that matters to the user. Batch runs
    // keep the logs instead of drawing interleaved bars.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !batch;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            println!("Encrypted:    {}", meta.is_encrypted);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    // The progress bar is initialised with a spinner (no chunk count yet);
    // `on_extraction_start` resizes it to the correct total once the PDF
    // has been split. `show_progress` was already computed above.

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    if batch {
        let summary = extract_dir(&cli.input, &cli.output_dir, &config)
            .await
            .context("Batch extraction failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        } else if !cli.quiet {
            eprintln!(
                "{}  {}/{} documents extracted  →  {}",
                if summary.failed == 0 {
                    green("✔")
                } else if summary.succeeded == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&summary.succeeded.to_string()),
                summary.total,
                bold(&cli.output_dir.display().to_string()),
            );
            if summary.failed > 0 {
                eprintln!(
                    "   {} failed (see log above)",
                    red(&summary.failed.to_string())
                );
            }
        }
    } else {
        let output = extract_to_file(&cli.input, &cli.output_dir, &config)
            .await
            .context("Extraction failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize output")?
            );
        }

        // Summary line (the callback already printed the per-chunk log).
        if !cli.quiet && !cli.json {
            let out_path = output_path(&cli.input, &cli.output_dir);
            eprintln!(
                "{}  {}/{} chunks  {}ms  →  {}",
                if output.stats.failed_chunks == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.stats.processed_chunks,
                output.stats.chunk_count,
                output.stats.total_duration_ms,
                bold(&out_path.display().to_string()),
            );
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&output.stats.total_input_tokens.to_string()),
                dim(&output.stats.total_output_tokens.to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .chunk_size(cli.chunk_size)
        .concurrency(cli.concurrency)
        .model(cli.model.clone())
        .max_retries(cli.max_retries);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

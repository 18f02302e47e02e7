//! CLI binary for ocr2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and renders chunk-level progress.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr2md::{run, PipelineConfig, PipelineProgress, ProgressCallback};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over submission units, plus a log
/// line per split chunk and per merged unit.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving upload limit…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl PipelineProgress for CliProgress {
    fn on_run_start(&self, unit_count: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos}/{len} chunks  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(unit_count as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Submitting {unit_count} chunk{}…",
                if unit_count == 1 { "" } else { "s" }
            ))
        ));
    }

    fn on_chunk_written(&self, ordinal: usize, byte_size: u64) {
        self.bar.println(format!(
            "  {} split part {ordinal}  {}",
            dim("·"),
            dim(&format!("{:.2} MB", byte_size as f64 / (1024.0 * 1024.0)))
        ));
    }

    fn on_chunk_start(&self, ordinal: usize, _unit_count: usize) {
        self.bar.set_message(format!("chunk {ordinal}"));
    }

    fn on_chunk_complete(&self, ordinal: usize, unit_count: usize, pages: usize, images: usize) {
        self.bar.println(format!(
            "  {} Chunk {ordinal}/{unit_count}  {}",
            green("✓"),
            dim(&format!("{pages} pages, {images} images")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _output_path: &Path, pages_total: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages converted",
            green("✔"),
            bold(&pages_total.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion
  ocr2md document.pdf

  # Large PDF with a custom fallback limit (used if the capability query fails)
  ocr2md --fallback-limit-mb 45 scanned_book.pdf

  # Put results somewhere else than next to the source
  ocr2md --output-dir ~/ocr document.pdf

OUTPUT:
  <stem>_ocr_results/<stem>_<timestamp>.md      assembled Markdown
  <stem>_ocr_results/images/page_<n>_<id>.png   extracted images
  <stem>_split/<stem>_part_<k>.pdf              retained chunk files

  Chunk files are kept on purpose: re-running the same oversized source
  reuses them and skips the split step. Delete the _split directory to
  force a fresh split.

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY      API key (same as --api-key)

SETUP:
  1. Set API key:      export MISTRAL_API_KEY=...
  2. Convert:          ocr2md document.pdf
"#;

/// Convert PDF documents to Markdown with the Mistral OCR API.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2md",
    version,
    about = "Convert PDF documents to Markdown with the Mistral OCR API",
    long_about = "Convert a PDF document to Markdown plus extracted images using the Mistral \
OCR API. PDFs over the service's upload limit are split into page-range chunks \
automatically, submitted one by one, and reassembled into a single ordered document.",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the PDF document to convert.
    input: PathBuf,

    /// Mistral API key.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    api_key: String,

    /// OCR model identifier.
    #[arg(long, env = "OCR2MD_MODEL", default_value = ocr2md::DEFAULT_MODEL)]
    model: String,

    /// Upload limit in MB used when the capability query fails.
    #[arg(long, env = "OCR2MD_FALLBACK_LIMIT_MB", default_value_t = 50)]
    fallback_limit_mb: u64,

    /// Base directory for results and chunk files (default: next to input).
    #[arg(short, long, env = "OCR2MD_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Total recognition attempts per chunk (transient failures only).
    #[arg(long, env = "OCR2MD_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Delay between recognition attempts, in seconds.
    #[arg(long, env = "OCR2MD_RETRY_DELAY_SECS", default_value_t = 5)]
    retry_delay_secs: u64,

    /// Print the run summary as JSON on stdout (implies --no-progress).
    #[arg(long, env = "OCR2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OCR2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the final path.
    #[arg(short, long, env = "OCR2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides the feedback that matters.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = PipelineConfig::builder()
        .api_key(&cli.api_key)
        .model(&cli.model)
        .fallback_limit_mb(cli.fallback_limit_mb)
        .max_attempts(cli.max_attempts)
        .retry_delay(Duration::from_secs(cli.retry_delay_secs));
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir_checked(dir)?;
    }
    if show_progress {
        let cb = CliProgress::new_dynamic();
        builder = builder.progress_callback(cb as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run the pipeline ─────────────────────────────────────────────────
    let output = run(&cli.input, &config).await.context("Conversion failed")?;

    if cli.json {
        let summary = serde_json::json!({
            "output_path": output.output_path,
            "images_dir": output.images_dir,
            "units_processed": output.units_processed,
            "pages_merged": output.pages_merged,
            "images_written": output.images_written,
            "images_skipped": output.images_skipped,
            "duration_ms": output.duration_ms,
        });
        println!("{summary}");
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} chunks  {} pages  {} images  {}ms",
            green("✔"),
            output.units_processed,
            output.pages_merged,
            output.images_written,
            output.duration_ms,
        );
        if output.images_skipped > 0 {
            eprintln!(
                "   {} images skipped (decode or write failure)",
                output.images_skipped
            );
        }
    }
    println!("{}", output.output_path.display());

    Ok(())
}

trait BuilderExt: Sized {
    fn output_dir_checked(self, dir: &Path) -> Result<Self>;
}

impl BuilderExt for ocr2md::PipelineConfigBuilder {
    /// Fail fast on an output directory that cannot exist, rather than deep
    /// inside the run.
    fn output_dir_checked(self, dir: &Path) -> Result<Self> {
        if dir.is_file() {
            anyhow::bail!("--output-dir '{}' is a file, not a directory", dir.display());
        }
        Ok(self.output_base_dir(dir))
    }
}

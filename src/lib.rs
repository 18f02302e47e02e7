//! # ocr2md
//!
//! Convert PDF documents to Markdown with the Mistral OCR API, splitting
//! oversized PDFs automatically.
//!
//! ## Why this crate?
//!
//! The OCR service rejects uploads above a per-request size limit, which
//! makes large scanned documents awkward to convert by hand: split the PDF,
//! submit each part, stitch the results, fix up the image links. This crate
//! does the whole loop — it resolves the effective limit (live capability
//! query with a configurable fallback), partitions the source into ordinal
//! page-range chunks that each fit, drives every chunk through the remote
//! recognition call with bounded retry, and reassembles the per-page
//! results into one ordered Markdown document with extracted images saved
//! alongside it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Limits     resolve the upload budget (live query → fallback)
//!  ├─ 2. Partition  split into <stem>_part_<n>.pdf chunks if oversized
//!  │                (skipped when a prior run already left chunks)
//!  ├─ 3. Recognize  upload → signed URL → OCR, per chunk, 3 attempts
//!  └─ 4. Merge      save images, rewrite ![id](id) links, append pages
//! ```
//!
//! Chunk files are retained on purpose: a re-run of the same source reuses
//! them and only re-pays the recognition cost.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr2md::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .api_key(std::env::var("MISTRAL_API_KEY")?)
//!         .build()?;
//!     let output = run("document.pdf", &config).await?;
//!     println!("{}", output.output_path.display());
//!     eprintln!("{} pages, {} images", output.pages_merged, output.images_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Output Layout
//!
//! ```text
//! <stem>_ocr_results/<stem>_<timestamp>.md      assembled Markdown
//! <stem>_ocr_results/images/page_<n>_<id>.png   extracted images
//! <stem>_split/<stem>_part_<k>.pdf              retained chunk files
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr2md` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocr2md = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{MistralOcrClient, OcrImage, OcrPage, OcrResponse, OcrService, ServiceError};
pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_MODEL};
pub use error::Ocr2MdError;
pub use pipeline::partition::Chunk;
pub use progress::{NoopProgress, PipelineProgress, ProgressCallback};
pub use run::{run, run_with_service, RunOutput};
pub use stream::{run_with_events, PipelineEvent};

//! Pipeline orchestration: the top-level entry points.
//!
//! [`run_with_service`] sequences the stages against any [`OcrService`]
//! implementation; [`run`] is the convenience wrapper that builds a
//! [`MistralOcrClient`] from the config. Chunks are processed strictly
//! sequentially in ordinal order, so output ordering follows from control
//! flow rather than from any synchronisation.
//!
//! A recognition failure aborts the remaining sequence. Nothing is rolled
//! back: already-merged text, persisted images, and split chunk files stay
//! on disk, so a subsequent run resumes cheaply by reusing the chunks.

use crate::client::{MistralOcrClient, OcrService};
use crate::config::PipelineConfig;
use crate::error::Ocr2MdError;
use crate::pipeline::{limits, merge, partition, recognize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The assembled Markdown document.
    pub output_path: PathBuf,
    /// Companion directory holding the extracted images.
    pub images_dir: PathBuf,
    /// Number of submission units processed (chunks, or 1 if unsplit).
    pub units_processed: usize,
    /// Total pages merged across all units.
    pub pages_merged: usize,
    /// Total images persisted across all units.
    pub images_written: usize,
    /// Images skipped because they failed to decode or persist.
    pub images_skipped: usize,
    /// Wall-clock duration of the whole run.
    pub duration_ms: u64,
}

/// Convert `source` using a [`MistralOcrClient`] built from `config`.
pub async fn run(
    source: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<RunOutput, Ocr2MdError> {
    let client = match config.base_url {
        Some(ref url) => MistralOcrClient::with_base_url(&config.api_key, &config.model, url),
        None => MistralOcrClient::new(&config.api_key, &config.model),
    };
    run_with_service(source, &client, config).await
}

/// Convert `source` to Markdown plus extracted images.
///
/// # Errors
/// Fatal errors only: missing or non-PDF source, split failure, output
/// write failure, or a chunk exhausting its recognition attempts. Partial
/// output written before the failure remains on disk.
pub async fn run_with_service(
    source: impl AsRef<Path>,
    service: &dyn OcrService,
    config: &PipelineConfig,
) -> Result<RunOutput, Ocr2MdError> {
    let start = Instant::now();
    let source = source.as_ref().to_path_buf();
    info!(source = %source.display(), "starting pipeline run");

    // ── Step 1: Validate the source before any side effect ───────────────
    validate_source(&source)?;
    let stem = partition::source_stem(&source)?;

    // ── Step 2: Resolve the upload budget ────────────────────────────────
    let byte_limit = limits::resolve_size_limit(service, config.fallback_limit_mb).await;

    // ── Step 3: Lay out the run's directories and output file ────────────
    let base_dir = match config.output_base_dir {
        Some(ref dir) => dir.clone(),
        None => source.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };
    let output_dir = base_dir.join(format!("{stem}_ocr_results"));
    let images_dir = output_dir.join("images");
    let split_dir = base_dir.join(format!("{stem}_split"));

    tokio::fs::create_dir_all(&images_dir)
        .await
        .map_err(|source| Ocr2MdError::OutputWriteFailed {
            path: images_dir.clone(),
            source,
        })?;
    tokio::fs::create_dir_all(&split_dir)
        .await
        .map_err(|source| Ocr2MdError::SplitDirFailed {
            path: split_dir.clone(),
            source,
        })?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let output_path = output_dir.join(format!("{stem}_{timestamp}.md"));
    // Truncate at run start so two runs never mix in one file.
    tokio::fs::write(&output_path, "")
        .await
        .map_err(|source| Ocr2MdError::OutputWriteFailed {
            path: output_path.clone(),
            source,
        })?;

    // ── Step 4: Partition if needed, reusing prior chunks ────────────────
    let chunks = {
        let source = source.clone();
        let split_dir = split_dir.clone();
        let progress = config.progress_callback.clone();
        tokio::task::spawn_blocking(move || {
            partition::partition(&source, byte_limit, &split_dir, progress.as_ref())
        })
        .await
        .map_err(|e| Ocr2MdError::Internal(format!("partition task: {e}")))??
    };

    // ── Step 5: Process each unit sequentially, merging as we go ─────────
    let units: Vec<(Option<usize>, PathBuf)> = if chunks.is_empty() {
        vec![(None, source.clone())]
    } else {
        chunks.iter().map(|c| (Some(c.ordinal), c.path.clone())).collect()
    };
    let unit_count = units.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(unit_count);
    }

    let mut page_offset = 0usize;
    let mut images_written = 0usize;
    let mut images_skipped = 0usize;
    for (i, (ordinal, path)) in units.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_start(ordinal.unwrap_or(1), unit_count);
        }

        let pages = recognize::process_chunk(service, path, *ordinal, config).await?;
        let outcome =
            merge::merge_page_results(&pages, page_offset, &output_path, &images_dir).await?;

        page_offset += outcome.pages_merged;
        images_written += outcome.images_written;
        images_skipped += outcome.images_skipped;

        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_complete(
                ordinal.unwrap_or(1),
                unit_count,
                outcome.pages_merged,
                outcome.images_written,
            );
        }
        info!(
            unit = i + 1,
            unit_count,
            pages = outcome.pages_merged,
            global_pages = page_offset,
            "unit merged"
        );
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(&output_path, page_offset);
    }
    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        output = %output_path.display(),
        pages = page_offset,
        images = images_written,
        duration_ms,
        "pipeline run complete"
    );

    Ok(RunOutput {
        output_path,
        images_dir,
        units_processed: unit_count,
        pages_merged: page_offset,
        images_written,
        images_skipped,
        duration_ms,
    })
}

/// Check the source resolves to a readable PDF file.
fn validate_source(path: &Path) -> Result<(), Ocr2MdError> {
    if !path.is_file() {
        return Err(Ocr2MdError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut f = std::fs::File::open(path).map_err(|_| Ocr2MdError::SourceNotFound {
        path: path.to_path_buf(),
    })?;
    use std::io::Read;
    let mut magic = [0u8; 4];
    if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(Ocr2MdError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_is_rejected() {
        let err = validate_source(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, Ocr2MdError::SourceNotFound { .. }));
    }

    #[test]
    fn non_pdf_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"PK\x03\x04zipzip").unwrap();
        let err = validate_source(&path).unwrap_err();
        assert!(matches!(err, Ocr2MdError::NotAPdf { .. }));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.pdf");
        std::fs::write(&path, b"%PDF-1.5\n%stub").unwrap();
        validate_source(&path).unwrap();
    }
}

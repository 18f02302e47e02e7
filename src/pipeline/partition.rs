//! Partition an oversized PDF into ordinal page-range chunks.
//!
//! ## Splitting policy
//!
//! Per-page size is estimated uniformly as `total_size / page_count` and the
//! page sequence is walked in fixed strides of
//! `max(1, floor(byte_limit / estimated_page_size))` pages. The estimate is
//! a known approximation: a document with a few image-heavy pages can yield
//! a chunk over the true limit, which then surfaces as a recognition
//! rejection, not a partitioning error. A single page larger than the whole
//! budget still becomes its own chunk for the same reason.
//!
//! ## Idempotent reuse
//!
//! Chunk files are named `<stem>_part_<ordinal>.pdf` and are never deleted
//! by the pipeline. If files matching that pattern already exist in the
//! split directory, partitioning is skipped entirely and the existing set
//! is returned sorted by ordinal — re-running on a large source does not
//! re-pay the split cost.
//!
//! All functions here are synchronous; the orchestrator wraps the stage in
//! `spawn_blocking` because lopdf work is CPU- and disk-bound.

use crate::error::Ocr2MdError;
use crate::progress::ProgressCallback;
use lopdf::Document;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A contiguous page range of the source, materialised as its own PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based, contiguous position among siblings.
    pub ordinal: usize,
    /// The chunk's file under the split directory.
    pub path: PathBuf,
    /// On-disk size of the chunk file.
    pub byte_size: u64,
}

/// Deterministic chunk filename for a source stem and ordinal.
pub fn chunk_file_name(stem: &str, ordinal: usize) -> String {
    format!("{stem}_part_{ordinal}.pdf")
}

/// Compute the fixed stride, in pages, for a split.
///
/// Mirrors the uniform-size estimate: floors at 1 so a grossly oversized
/// single page is still emitted rather than failing here.
pub(crate) fn pages_per_chunk(total_size: u64, page_count: usize, byte_limit: u64) -> usize {
    let estimated_page_size = total_size as f64 / page_count as f64;
    ((byte_limit as f64 / estimated_page_size).floor() as usize).max(1)
}

/// Find chunks left behind by a previous run, sorted by ordinal.
///
/// Returns an empty vec when the split directory does not exist or holds
/// nothing matching `<stem>_part_<n>.pdf`.
pub fn find_existing_chunks(stem: &str, split_dir: &Path) -> Result<Vec<Chunk>, Ocr2MdError> {
    if !split_dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = Regex::new(&format!(r"^{}_part_(\d+)\.pdf$", regex::escape(stem)))
        .map_err(|e| Ocr2MdError::Internal(format!("chunk pattern: {e}")))?;

    let mut chunks = Vec::new();
    let entries = fs::read_dir(split_dir).map_err(|source| Ocr2MdError::SplitDirFailed {
        path: split_dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| Ocr2MdError::SplitDirFailed {
            path: split_dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(caps) = pattern.captures(name) else { continue };
        let Ok(ordinal) = caps[1].parse::<usize>() else { continue };
        let byte_size = entry
            .metadata()
            .map_err(|source| Ocr2MdError::SplitDirFailed {
                path: entry.path(),
                source,
            })?
            .len();
        chunks.push(Chunk {
            ordinal,
            path: entry.path(),
            byte_size,
        });
    }

    chunks.sort_by_key(|c| c.ordinal);
    Ok(chunks)
}

/// Partition `source` into chunks each estimated to fit `byte_limit`.
///
/// Returns the existing chunk set unchanged when one is found (see module
/// docs), an empty vec when the source already fits the budget, and the
/// freshly written chunk set otherwise. The union of the returned chunks'
/// page ranges, in ordinal order, exactly covers the source's pages.
pub fn partition(
    source: &Path,
    byte_limit: u64,
    split_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<Chunk>, Ocr2MdError> {
    let stem = source_stem(source)?;

    let existing = find_existing_chunks(&stem, split_dir)?;
    if !existing.is_empty() {
        info!(
            chunks = existing.len(),
            "reusing chunks from a previous run, skipping split"
        );
        return Ok(existing);
    }

    let total_size = fs::metadata(source)
        .map_err(|_| Ocr2MdError::SourceNotFound {
            path: source.to_path_buf(),
        })?
        .len();
    if total_size <= byte_limit {
        debug!(total_size, byte_limit, "source fits the budget, no split");
        return Ok(Vec::new());
    }

    let doc = Document::load(source).map_err(|e| Ocr2MdError::PdfFailed {
        path: source.to_path_buf(),
        detail: e.to_string(),
    })?;
    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(Ocr2MdError::PdfFailed {
            path: source.to_path_buf(),
            detail: "document has no pages".into(),
        });
    }

    let stride = pages_per_chunk(total_size, page_count, byte_limit);
    info!(
        total_size,
        byte_limit, page_count, stride, "source exceeds the budget, splitting"
    );

    fs::create_dir_all(split_dir).map_err(|source| Ocr2MdError::SplitDirFailed {
        path: split_dir.to_path_buf(),
        source,
    })?;

    let mut chunks = Vec::new();
    for (ordinal, first) in (1..=page_count).step_by(stride).enumerate() {
        let ordinal = ordinal + 1;
        let last = (first + stride - 1).min(page_count);
        let path = split_dir.join(chunk_file_name(&stem, ordinal));

        let byte_size = write_page_range(&doc, first as u32, last as u32, &path)?;
        info!(
            ordinal,
            first,
            last,
            byte_size,
            path = %path.display(),
            "chunk written"
        );
        if let Some(cb) = progress {
            cb.on_chunk_written(ordinal, byte_size);
        }
        chunks.push(Chunk {
            ordinal,
            path,
            byte_size,
        });
    }

    Ok(chunks)
}

/// Write pages `first..=last` (1-based, inclusive) of `doc` as an
/// independent PDF at `path`, returning the written file's size.
fn write_page_range(
    doc: &Document,
    first: u32,
    last: u32,
    path: &Path,
) -> Result<u64, Ocr2MdError> {
    let mut part = doc.clone();
    let total = part.get_pages().len() as u32;
    let drop: Vec<u32> = (1..=total).filter(|p| *p < first || *p > last).collect();
    if !drop.is_empty() {
        part.delete_pages(&drop);
    }
    part.prune_objects();
    part.renumber_objects();
    part.compress();
    part.save(path).map_err(|e| Ocr2MdError::PdfFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let byte_size = fs::metadata(path)
        .map_err(|source| Ocr2MdError::SplitDirFailed {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    Ok(byte_size)
}

/// The source's file stem, used in every derived path.
pub(crate) fn source_stem(source: &Path) -> Result<String, Ocr2MdError> {
    source
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Ocr2MdError::SourceNotFound {
            path: source.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_for_uniform_pages() {
        // 90 MB over 120 pages at a 45 MB limit: 0.75 MB/page → 60 pages.
        let mb = 1024 * 1024;
        assert_eq!(pages_per_chunk(90 * mb, 120, 45 * mb), 60);
    }

    #[test]
    fn stride_floors_at_one_for_oversized_pages() {
        // A single 10 MB page against a 4 MB limit still yields stride 1.
        let mb = 1024 * 1024;
        assert_eq!(pages_per_chunk(10 * mb, 1, 4 * mb), 1);
    }

    #[test]
    fn stride_rounds_down() {
        // 7 pages of ~1.43 MB against a 5 MB limit → floor(3.5) = 3 pages.
        assert_eq!(pages_per_chunk(10_000_000, 7, 5_000_000), 3);
    }

    #[test]
    fn chunk_names_are_deterministic() {
        assert_eq!(chunk_file_name("report", 1), "report_part_1.pdf");
        assert_eq!(chunk_file_name("report", 12), "report_part_12.pdf");
    }

    #[test]
    fn missing_split_dir_yields_no_chunks() {
        let found = find_existing_chunks("doc", Path::new("/no/such/dir")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn discovery_ignores_other_stems_and_sorts_by_ordinal() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["doc_part_2.pdf", "doc_part_1.pdf", "other_part_1.pdf", "doc.pdf"] {
            fs::write(dir.path().join(name), b"%PDF-1.5 stub").unwrap();
        }

        let found = find_existing_chunks("doc", dir.path()).unwrap();
        let ordinals: Vec<usize> = found.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
        assert!(found.iter().all(|c| c.byte_size > 0));
    }

    #[test]
    fn stem_with_dots_is_escaped_in_discovery() {
        let dir = tempfile::tempdir().unwrap();
        // A regex-unescaped "v1.2" would also match "v1x2".
        fs::write(dir.path().join("v1x2_part_1.pdf"), b"x").unwrap();
        fs::write(dir.path().join("v1.2_part_1.pdf"), b"x").unwrap();

        let found = find_existing_chunks("v1.2", dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("v1.2_part_1.pdf"));
    }
}

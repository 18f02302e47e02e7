//! Error types for the ocr2md library.
//!
//! Two layers reflect two failure scopes:
//!
//! * [`Ocr2MdError`] — **Fatal**: the run cannot proceed (missing source,
//!   unreadable PDF, recognition retries exhausted). Returned as
//!   `Err(Ocr2MdError)` from the top-level `run*` functions. Artifacts
//!   written before the failure stay on disk so a later run can resume by
//!   reusing the split chunks.
//!
//! * [`crate::client::ServiceError`] — a single remote-call failure.
//!   [`ServiceError::is_transient`](crate::client::ServiceError::is_transient)
//!   decides whether the chunk processor retries or escalates immediately.
//!
//! Per-image decode and persist failures are deliberately absent from both:
//! they are recovered locally by the merger (log, skip that one image, keep
//! its placeholder unresolved) and never abort a page.

use std::path::PathBuf;
use thiserror::Error;

use crate::client::ServiceError;

/// All fatal errors returned by the ocr2md library.
#[derive(Debug, Error)]
pub enum Ocr2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source path does not resolve to a readable file.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Partitioning errors ───────────────────────────────────────────────
    /// lopdf failed to load or write a document during splitting.
    #[error("PDF operation failed for '{path}': {detail}")]
    PdfFailed { path: PathBuf, detail: String },

    /// Filesystem error while creating or scanning the split directory.
    #[error("Split directory error at '{path}': {source}")]
    SplitDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Recognition errors ────────────────────────────────────────────────
    /// The remote OCR call failed for one chunk after exhausting retries
    /// (or immediately, for a non-transient failure). Fatal for the whole
    /// run; already-merged chunks remain on disk.
    #[error(
        "Recognition failed for '{path}'{} after {attempts} attempt(s): {source}",
        .chunk.map(|n| format!(" (chunk {n})")).unwrap_or_default()
    )]
    RecognitionFailed {
        path: PathBuf,
        /// Ordinal of the failing chunk, `None` when the whole document was
        /// submitted unpartitioned.
        chunk: Option<usize>,
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    /// Could not read a submission unit (chunk file, or the whole document
    /// when unpartitioned) from disk before upload. For chunks this usually
    /// means a split artifact was removed mid-run.
    #[error("Failed to read upload payload '{path}': {source}")]
    ChunkReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, truncate, or append to the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_not_found_display() {
        let e = Ocr2MdError::SourceNotFound {
            path: PathBuf::from("/no/such/file.pdf"),
        };
        assert!(e.to_string().contains("/no/such/file.pdf"));
    }

    #[test]
    fn recognition_failed_names_chunk() {
        let e = Ocr2MdError::RecognitionFailed {
            path: PathBuf::from("doc_part_2.pdf"),
            chunk: Some(2),
            attempts: 3,
            source: ServiceError::Api {
                status: 503,
                message: "overloaded".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("chunk 2"), "got: {msg}");
        assert!(msg.contains("3 attempt(s)"), "got: {msg}");
    }

    #[test]
    fn recognition_failed_unpartitioned_omits_chunk() {
        let e = Ocr2MdError::RecognitionFailed {
            path: PathBuf::from("doc.pdf"),
            chunk: None,
            attempts: 1,
            source: ServiceError::Malformed("missing pages".into()),
        };
        assert!(!e.to_string().contains("chunk"));
    }

    #[test]
    fn not_a_pdf_shows_magic() {
        let e = Ocr2MdError::NotAPdf {
            path: PathBuf::from("x.pdf"),
            magic: *b"PK\x03\x04",
        };
        assert!(e.to_string().contains("not a valid PDF"));
    }
}

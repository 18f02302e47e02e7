//! Pipeline stages for size-aware PDF-to-Markdown OCR.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets the
//! orchestrator in [`crate::run`] stay a straight-line sequence.
//!
//! ## Data Flow
//!
//! ```text
//! limits ──▶ partition ──▶ recognize ──▶ merge
//! (bytes)    (lopdf)       (remote OCR)  (md + images)
//! ```
//!
//! 1. [`limits`]    — resolve the effective upload-size budget in bytes
//! 2. [`partition`] — split the source into ordinal page-range chunks when
//!    it exceeds the budget; reuse chunks left by a prior run
//! 3. [`recognize`] — upload one chunk, obtain a signed URL, request
//!    recognition with inline images; bounded retry on transient failure.
//!    The only stage with network I/O.
//! 4. [`merge`]     — persist embedded images, rewrite their references,
//!    append the pages' markdown to the growing output document

pub mod limits;
pub mod merge;
pub mod partition;
pub mod recognize;

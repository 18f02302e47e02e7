//! Progress-callback trait for run and chunk lifecycle events.
//!
//! Inject an [`Arc<dyn PipelineProgress>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its chunks.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: callers can forward
//! events to a terminal progress bar, a log file, or a channel — the library
//! does not know how the host application communicates.
//! [`crate::stream::run_with_events`] does exactly that forwarding to give
//! interactive front-ends a typed event stream.
//!
//! The pipeline processes chunks strictly sequentially, so unlike a fan-out
//! design the callbacks arrive in order; the trait is still `Send + Sync`
//! because the whole run may execute on a background task.

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it progresses through a run.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `unit_count` is the number of submission units:
/// the chunk count after splitting, or 1 for an unpartitioned document.
pub trait PipelineProgress: Send + Sync {
    /// Called once after partitioning, before the first submission.
    fn on_run_start(&self, unit_count: usize) {
        let _ = unit_count;
    }

    /// Called after the partitioner writes one chunk file to disk.
    ///
    /// Not called for chunks reused from a previous run.
    fn on_chunk_written(&self, ordinal: usize, byte_size: u64) {
        let _ = (ordinal, byte_size);
    }

    /// Called just before a unit is uploaded for recognition.
    /// `ordinal` is 1-based.
    fn on_chunk_start(&self, ordinal: usize, unit_count: usize) {
        let _ = (ordinal, unit_count);
    }

    /// Called when a unit's results have been merged into the output.
    fn on_chunk_complete(&self, ordinal: usize, unit_count: usize, pages: usize, images: usize) {
        let _ = (ordinal, unit_count, pages, images);
    }

    /// Called once after the last unit has been merged.
    fn on_run_complete(&self, output_path: &Path, pages_total: usize) {
        let _ = (output_path, pages_total);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl PipelineProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgress>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracking {
        starts: AtomicUsize,
        completes: AtomicUsize,
        written: AtomicUsize,
        pages_total: AtomicUsize,
    }

    impl PipelineProgress for Tracking {
        fn on_chunk_written(&self, _ordinal: usize, _byte_size: u64) {
            self.written.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_start(&self, _ordinal: usize, _unit_count: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _o: usize, _u: usize, pages: usize, _images: usize) {
            self.completes.fetch_add(pages, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _path: &Path, pages_total: usize) {
            self.pages_total.store(pages_total, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgress;
        cb.on_run_start(2);
        cb.on_chunk_written(1, 1024);
        cb.on_chunk_start(1, 2);
        cb.on_chunk_complete(1, 2, 60, 3);
        cb.on_run_complete(Path::new("out.md"), 120);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = Tracking {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            written: AtomicUsize::new(0),
            pages_total: AtomicUsize::new(0),
        };

        t.on_run_start(2);
        t.on_chunk_written(1, 10);
        t.on_chunk_written(2, 20);
        t.on_chunk_start(1, 2);
        t.on_chunk_complete(1, 2, 60, 0);
        t.on_chunk_start(2, 2);
        t.on_chunk_complete(2, 2, 60, 1);
        t.on_run_complete(Path::new("out.md"), 120);

        assert_eq!(t.written.load(Ordering::SeqCst), 2);
        assert_eq!(t.starts.load(Ordering::SeqCst), 2);
        assert_eq!(t.completes.load(Ordering::SeqCst), 120);
        assert_eq!(t.pages_total.load(Ordering::SeqCst), 120);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn PipelineProgress> = Arc::new(NoopProgress);
        cb.on_run_start(1);
        cb.on_chunk_start(1, 1);
    }
}

//! Event-channel runner for interactive front-ends.
//!
//! A GUI or TUI wants the pipeline off its foreground context with typed
//! progress events flowing back, not a shared mutable object poked from
//! two tasks. [`run_with_events`] spawns the whole run on one background
//! tokio task and forwards every lifecycle event through an unbounded mpsc
//! channel; the foreground consumes the returned stream at its own pace.
//!
//! The pipeline itself stays strictly sequential — this module moves the
//! run, it does not parallelise it.

use crate::config::PipelineConfig;
use crate::error::Ocr2MdError;
use crate::progress::{PipelineProgress, ProgressCallback};
use crate::run::{run, RunOutput};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// One typed lifecycle event of a pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Partitioning finished; `unit_count` submissions will follow.
    RunStarted { unit_count: usize },
    /// The partitioner wrote a chunk file (not emitted for reused chunks).
    ChunkWritten { ordinal: usize, byte_size: u64 },
    /// A unit is being uploaded for recognition.
    ChunkStarted { ordinal: usize, unit_count: usize },
    /// A unit's results were merged into the output document.
    ChunkCompleted {
        ordinal: usize,
        unit_count: usize,
        pages: usize,
        images: usize,
    },
    /// The run finished; the output document is complete.
    RunCompleted {
        output_path: PathBuf,
        pages_total: usize,
    },
    /// The run aborted; partial output remains on disk.
    RunFailed { message: String },
}

/// Forwards [`PipelineProgress`] calls into the event channel.
struct ChannelProgress {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl PipelineProgress for ChannelProgress {
    fn on_run_start(&self, unit_count: usize) {
        let _ = self.tx.send(PipelineEvent::RunStarted { unit_count });
    }

    fn on_chunk_written(&self, ordinal: usize, byte_size: u64) {
        let _ = self.tx.send(PipelineEvent::ChunkWritten { ordinal, byte_size });
    }

    fn on_chunk_start(&self, ordinal: usize, unit_count: usize) {
        let _ = self.tx.send(PipelineEvent::ChunkStarted { ordinal, unit_count });
    }

    fn on_chunk_complete(&self, ordinal: usize, unit_count: usize, pages: usize, images: usize) {
        let _ = self.tx.send(PipelineEvent::ChunkCompleted {
            ordinal,
            unit_count,
            pages,
            images,
        });
    }

    fn on_run_complete(&self, output_path: &Path, pages_total: usize) {
        let _ = self.tx.send(PipelineEvent::RunCompleted {
            output_path: output_path.to_path_buf(),
            pages_total,
        });
    }
}

/// Run the pipeline on a background task, returning its join handle and a
/// stream of [`PipelineEvent`]s.
///
/// The stream ends when the run finishes either way; the final event is
/// always `RunCompleted` or `RunFailed`. The handle yields the same
/// [`RunOutput`] / [`Ocr2MdError`] the eager [`run`] would return, for
/// callers that want the result value in addition to the events.
pub fn run_with_events(
    source: impl AsRef<Path>,
    config: &PipelineConfig,
) -> (
    JoinHandle<Result<RunOutput, Ocr2MdError>>,
    UnboundedReceiverStream<PipelineEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut config = config.clone();
    config.progress_callback = Some(Arc::new(ChannelProgress { tx: tx.clone() }) as ProgressCallback);
    let source = source.as_ref().to_path_buf();

    let handle = tokio::spawn(async move {
        let result = run(&source, &config).await;
        if let Err(ref e) = result {
            let _ = tx.send(PipelineEvent::RunFailed {
                message: e.to_string(),
            });
        }
        result
    });

    (handle, UnboundedReceiverStream::new(rx))
}

//! Drive one chunk through the remote recognition call, with bounded retry.
//!
//! ## Protocol
//!
//! Per attempt: upload the chunk's bytes under the `"ocr"` purpose, obtain
//! a short-lived signed URL for the uploaded artifact, then request
//! recognition against that URL with embedded-image payloads inline. The
//! response's pages map 1:1, in order, to the chunk's pages.
//!
//! ## Retry policy
//!
//! Up to `config.max_attempts` attempts total (default 3). Only failures
//! classified transient by [`ServiceError::is_transient`] are retried,
//! after a fixed `config.retry_delay` (default 5 s); anything else
//! propagates on first occurrence. Exhaustion is fatal for the whole run —
//! there is no per-chunk skip-and-continue, because a silently missing
//! chunk would corrupt the assembled document's page order.

use crate::client::{OcrPage, OcrService, ServiceError};
use crate::config::PipelineConfig;
use crate::error::Ocr2MdError;
use std::path::Path;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Submit one chunk (or the whole document, when `ordinal` is `None`) and
/// return its ordered per-page results.
pub async fn process_chunk(
    service: &dyn OcrService,
    path: &Path,
    ordinal: Option<usize>,
    config: &PipelineConfig,
) -> Result<Vec<OcrPage>, Ocr2MdError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| Ocr2MdError::ChunkReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf")
        .to_string();

    let mut attempt = 1;
    loop {
        match submit_once(service, &file_name, bytes.clone(), config).await {
            Ok(pages) => {
                info!(
                    file = %path.display(),
                    pages = pages.len(),
                    attempt,
                    "recognition complete"
                );
                return Ok(pages);
            }
            Err(e) if e.is_transient() && attempt < config.max_attempts => {
                warn!(
                    file = %path.display(),
                    attempt,
                    max_attempts = config.max_attempts,
                    "transient recognition failure, retrying in {:?}: {e}",
                    config.retry_delay
                );
                sleep(config.retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(Ocr2MdError::RecognitionFailed {
                    path: path.to_path_buf(),
                    chunk: ordinal,
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}

/// One full upload → signed URL → recognize round trip.
async fn submit_once(
    service: &dyn OcrService,
    file_name: &str,
    bytes: Vec<u8>,
    config: &PipelineConfig,
) -> Result<Vec<OcrPage>, ServiceError> {
    let uploaded = service.upload(file_name, bytes, "ocr").await?;
    debug!(file_id = %uploaded.id, "chunk uploaded");

    let signed = service
        .get_signed_url(&uploaded.id, config.url_expiry_hours)
        .await?;

    let response = service.recognize(&signed.url, true).await?;
    if response.pages.is_empty() {
        return Err(ServiceError::Malformed("response contains no pages".into()));
    }
    Ok(response.pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{OcrResponse, SignedUrl, UploadedFile, UsageLimits};
    use crate::config::PipelineConfig;

    /// Panics on any call: the paths under test must fail before the first
    /// remote interaction.
    struct UnreachableService;

    #[async_trait::async_trait]
    impl OcrService for UnreachableService {
        async fn get_limits(&self) -> Result<UsageLimits, ServiceError> {
            unreachable!("no remote call expected")
        }

        async fn upload(
            &self,
            _file_name: &str,
            _bytes: Vec<u8>,
            _purpose: &str,
        ) -> Result<UploadedFile, ServiceError> {
            unreachable!("no remote call expected")
        }

        async fn get_signed_url(
            &self,
            _file_id: &str,
            _expiry_hours: u32,
        ) -> Result<SignedUrl, ServiceError> {
            unreachable!("no remote call expected")
        }

        async fn recognize(
            &self,
            _document_url: &str,
            _include_images: bool,
        ) -> Result<OcrResponse, ServiceError> {
            unreachable!("no remote call expected")
        }
    }

    #[tokio::test]
    async fn vanished_chunk_file_reports_a_read_failure() {
        let config = PipelineConfig::builder().api_key("k").build().unwrap();

        let err = process_chunk(
            &UnreachableService,
            Path::new("/gone/doc_part_1.pdf"),
            Some(1),
            &config,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Ocr2MdError::ChunkReadFailed { .. }));
        // The message names the missing artifact, not the original source.
        assert!(err.to_string().contains("doc_part_1.pdf"));
    }
}

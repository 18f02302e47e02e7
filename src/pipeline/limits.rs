//! Resolve the effective upload-size budget.
//!
//! The service's accepted upload size changes with account tier, so a live
//! capability query is preferred; the caller-supplied fallback keeps the
//! pipeline usable when that query fails. This stage never returns an
//! error — a failed query is logged and recovered locally.

use crate::client::OcrService;
use tracing::{info, warn};

/// Bytes per megabyte, as the service counts them.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Safety margin, in MB, subtracted from the live-queried limit to absorb
/// multipart/container overhead. Not applied to the fallback value.
const SAFETY_MARGIN_MB: u64 = 1;

/// Resolve the maximum submission size in bytes.
///
/// Queries the service; on success returns
/// `(max_upload_size_mb − 1) * 1 048 576`. On any failure (network,
/// malformed response) logs a warning and returns
/// `fallback_mb * 1 048 576`, unconditionally.
pub async fn resolve_size_limit(service: &dyn OcrService, fallback_mb: u64) -> u64 {
    match service.get_limits().await {
        Ok(limits) => {
            let limit = limits.max_upload_size_mb.saturating_sub(SAFETY_MARGIN_MB) * BYTES_PER_MB;
            info!(
                max_upload_size_mb = limits.max_upload_size_mb,
                byte_limit = limit,
                "resolved upload limit from service"
            );
            limit
        }
        Err(e) => {
            warn!(fallback_mb, "capability query failed, using fallback: {e}");
            fallback_mb * BYTES_PER_MB
        }
    }
}

//! Configuration for a pipeline run.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct keeps the
//! pipeline free of global state: the CLI, a script, and the event-channel
//! runner all construct the same value and pass it in.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest, and new fields never break call sites.

use crate::error::Ocr2MdError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default recognition model submitted with every OCR request.
pub const DEFAULT_MODEL: &str = "mistral-ocr-latest";

/// Configuration for a PDF-to-Markdown pipeline run.
///
/// # Example
/// ```rust
/// use ocr2md::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .api_key("sk-…")
///     .fallback_limit_mb(45)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Opaque credential for the remote OCR service.
    pub api_key: String,

    /// Recognition model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Override the service base URL (tests, proxies). Default: None
    /// (the client's production endpoint).
    pub base_url: Option<String>,

    /// Upload-size limit in MB used when the live capability query fails.
    /// Default: 50.
    ///
    /// The live-queried value gets a 1 MB safety margin subtracted to absorb
    /// multipart/container overhead; this fallback is used as-is.
    pub fallback_limit_mb: u64,

    /// Base directory for `<stem>_ocr_results/` and `<stem>_split/`.
    /// Default: the source file's parent directory.
    pub output_base_dir: Option<PathBuf>,

    /// Total recognition attempts per chunk, including the first. Default: 3.
    ///
    /// Only transient service failures (timeouts, 429, 5xx) are retried;
    /// anything else is fatal on the first occurrence.
    pub max_attempts: u32,

    /// Fixed delay between recognition attempts. Default: 5 s.
    ///
    /// Tests inject a zero delay so retry paths run instantly; there is no
    /// exponential growth because the service's transient errors clear on
    /// their own timescale, not in response to client pressure.
    pub retry_delay: Duration,

    /// Expiry, in hours, requested for the signed access URL of an uploaded
    /// chunk. Default: 1. The URL only needs to outlive one recognition call.
    pub url_expiry_hours: u32,

    /// Optional observer for run/chunk lifecycle events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            fallback_limit_mb: 50,
            output_base_dir: None,
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            url_expiry_hours: 1,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    // The credential is redacted: configs get logged.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("fallback_limit_mb", &self.fallback_limit_mb)
            .field("output_base_dir", &self.output_base_dir)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("url_expiry_hours", &self.url_expiry_hours)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgress>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn fallback_limit_mb(mut self, mb: u64) -> Self {
        self.config.fallback_limit_mb = mb;
        self
    }

    pub fn output_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_base_dir = Some(dir.into());
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn url_expiry_hours(mut self, hours: u32) -> Self {
        self.config.url_expiry_hours = hours.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Ocr2MdError> {
        let c = &self.config;
        if c.fallback_limit_mb == 0 {
            return Err(Ocr2MdError::InvalidConfig(
                "fallback_limit_mb must be ≥ 1".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(Ocr2MdError::InvalidConfig("max_attempts must be ≥ 1".into()));
        }
        if c.model.is_empty() {
            return Err(Ocr2MdError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PipelineConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.fallback_limit_mb, 50);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_delay, Duration::from_secs(5));
        assert_eq!(c.url_expiry_hours, 1);
    }

    #[test]
    fn builder_rejects_zero_fallback() {
        let err = PipelineConfig::builder()
            .api_key("k")
            .fallback_limit_mb(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("fallback_limit_mb"));
    }

    #[test]
    fn max_attempts_clamps_to_one() {
        let c = PipelineConfig::builder().max_attempts(0).build().unwrap();
        assert_eq!(c.max_attempts, 1);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = PipelineConfig::builder().api_key("super-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}

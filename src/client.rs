//! Remote OCR collaborator: trait, HTTP implementation, wire types.
//!
//! The pipeline talks to the service through the [`OcrService`] trait so the
//! core (partition → recognize → merge) can be exercised in tests with a
//! scripted implementation and no network. [`MistralOcrClient`] is the
//! production implementation against the Mistral HTTP API:
//!
//! ```text
//! GET  /v1/usage/limits          capability query (max upload size)
//! POST /v1/files                 multipart upload, purpose=ocr
//! GET  /v1/files/{id}/url        short-lived signed access URL
//! POST /v1/ocr                   recognition against the signed URL
//! ```
//!
//! [`ServiceError::is_transient`] is the single place that classifies remote
//! failures; the chunk processor's retry policy is driven entirely by it.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Production endpoint used when the config does not override `base_url`.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";

/// A failure of one remote call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The HTTP request never produced a response (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response arrived but did not contain what the contract promises.
    #[error("malformed service response: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// Whether the chunk processor should retry after this failure.
    ///
    /// Transport errors and server-side statuses (429, 5xx) clear on their
    /// own; client-side statuses and malformed payloads will not.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Transport(_) => true,
            ServiceError::Api { status, .. } => *status == 429 || *status >= 500,
            ServiceError::Malformed(_) => false,
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

/// Capability limits reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageLimits {
    /// Maximum accepted upload size, in megabytes.
    #[serde(rename = "ocr_max_file_size_mb")]
    pub max_upload_size_mb: u64,
}

/// Handle to an uploaded artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub id: String,
}

/// Short-lived access reference for an uploaded artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrl {
    pub url: String,
}

/// One embedded image returned inline with a recognised page.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrImage {
    /// Identifier the page markdown references as `![id](id)`.
    pub id: String,
    /// Base64 payload, usually a full `data:image/…;base64,…` URI.
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// One recognised page: markdown-flavoured text plus embedded images.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrPage {
    #[serde(default)]
    pub index: usize,
    pub markdown: String,
    #[serde(default)]
    pub images: Vec<OcrImage>,
}

/// Structured response for one submitted document; pages map 1:1, in
/// order, to the document's pages.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrResponse {
    pub pages: Vec<OcrPage>,
}

// ── Service trait ────────────────────────────────────────────────────────

/// The remote recognition collaborator, as the pipeline sees it.
///
/// Object safe so the orchestrator can hold a `&dyn OcrService`; tests
/// implement it with a scripted mock.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Query the service's capability limits.
    async fn get_limits(&self) -> Result<UsageLimits, ServiceError>;

    /// Upload a document's bytes under a purpose designation (`"ocr"`).
    async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        purpose: &str,
    ) -> Result<UploadedFile, ServiceError>;

    /// Obtain a short-lived access URL for an uploaded artifact.
    async fn get_signed_url(
        &self,
        file_id: &str,
        expiry_hours: u32,
    ) -> Result<SignedUrl, ServiceError>;

    /// Run recognition against an accessible document URL.
    async fn recognize(
        &self,
        document_url: &str,
        include_images: bool,
    ) -> Result<OcrResponse, ServiceError>;
}

// ── HTTP implementation ──────────────────────────────────────────────────

/// [`OcrService`] implementation against the Mistral HTTP API.
pub struct MistralOcrClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl MistralOcrClient {
    /// Create a client with the production base URL.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Create a client against a non-default endpoint (tests, proxies).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Turn a non-success response into `ServiceError::Api`, keeping the
    /// body as the message (the service puts its diagnostics there).
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ServiceError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl OcrService for MistralOcrClient {
    async fn get_limits(&self) -> Result<UsageLimits, ServiceError> {
        let resp = self
            .http
            .get(format!("{}/v1/usage/limits", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let limits: UsageLimits = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        debug!(max_upload_size_mb = limits.max_upload_size_mb, "capability query ok");
        Ok(limits)
    }

    async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        purpose: &str,
    ) -> Result<UploadedFile, ServiceError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ServiceError::Malformed(format!("invalid mime: {e}")))?;
        let form = multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part("file", part);

        let resp = self
            .http
            .post(format!("{}/v1/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }

    async fn get_signed_url(
        &self,
        file_id: &str,
        expiry_hours: u32,
    ) -> Result<SignedUrl, ServiceError> {
        let resp = self
            .http
            .get(format!("{}/v1/files/{}/url", self.base_url, file_id))
            .query(&[("expiry", expiry_hours)])
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }

    async fn recognize(
        &self,
        document_url: &str,
        include_images: bool,
    ) -> Result<OcrResponse, ServiceError> {
        let body = serde_json::json!({
            "model": self.model,
            "document": {
                "type": "document_url",
                "document_url": document_url,
            },
            "include_image_base64": include_images,
        });

        let resp = self
            .http
            .post(format!("{}/v1/ocr", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: OcrResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        debug!(pages = parsed.pages.len(), "recognition response received");
        Ok(parsed)
    }
}

// Image acquisition strategies for the post form
use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::api::MemoriesApi;
use crate::config::{ImageStrategy, UploadConfig};
use crate::error::UploadError;
use crate::models::{ImageRef, UploadedAsset};

pub const GENERIC_UPLOAD_ERROR: &str = "Upload failed. Please try again.";

/// Turns a local file into an image reference a post can carry.
#[async_trait]
pub trait ImageAcquirer: Send + Sync {
    async fn acquire(&self, path: &Path) -> Result<ImageRef, UploadError>;
}

/// Reads the file into a data URL for immediate preview. No network call.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineImage;

#[async_trait]
impl ImageAcquirer for InlineImage {
    async fn acquire(&self, path: &Path) -> Result<ImageRef, UploadError> {
        let bytes = read_file(path).await?;
        Ok(ImageRef::Inline(data_url(path, &bytes)))
    }
}

pub fn data_url(path: &Path, bytes: &[u8]) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    format!(
        "data:{};base64,{}",
        mime.essence_str(),
        BASE64_STANDARD.encode(bytes)
    )
}

/// Fetches a one-time signature from the Memories API, then uploads the
/// file straight to the asset host.
pub struct SignedUpload<A: ?Sized> {
    api: Arc<A>,
    client: Client,
    config: UploadConfig,
}

impl<A: MemoriesApi + ?Sized> SignedUpload<A> {
    pub fn new(api: Arc<A>, config: UploadConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build upload client: {}", e);
                UploadError::Host {
                    status: None,
                    message: GENERIC_UPLOAD_ERROR.to_string(),
                }
            })?;
        Ok(Self {
            api,
            client,
            config,
        })
    }
}

#[async_trait]
impl<A: MemoriesApi + ?Sized> ImageAcquirer for SignedUpload<A> {
    async fn acquire(&self, path: &Path) -> Result<ImageRef, UploadError> {
        let bytes = read_file(path).await?;
        let signature = self
            .api
            .request_upload_signature()
            .await
            .map_err(UploadError::Signature)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| UploadError::Read(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("api_key", signature.api_key)
            .text("timestamp", signature.timestamp.to_string())
            .text("signature", signature.signature);

        let url = self.config.upload_url_for(&signature.cloud_name);
        tracing::debug!("Uploading {} to {}", path.display(), url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::warn!("Upload to {} timed out", url);
                } else {
                    tracing::warn!("Upload request failed: {}", e);
                }
                UploadError::Host {
                    status: None,
                    message: GENERIC_UPLOAD_ERROR.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(host_error(status.as_u16(), &body));
        }

        let asset: UploadedAsset = serde_json::from_str(&body).map_err(|_| UploadError::Host {
            status: Some(status.as_u16()),
            message: GENERIC_UPLOAD_ERROR.to_string(),
        })?;
        Ok(ImageRef::Remote {
            url: asset.secure_url,
            public_id: Some(asset.public_id),
        })
    }
}

/// Message precedence: the host's `error.message`, then a generic message
/// for JSON without one, then the status code when the body is not JSON.
pub fn host_error(status: u16, body: &str) -> UploadError {
    let message = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .pointer("/error/message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .unwrap_or(GENERIC_UPLOAD_ERROR)
            .to_string(),
        Err(_) => format!("Upload failed with status {}.", status),
    };
    UploadError::Host {
        status: Some(status),
        message,
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, UploadError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| UploadError::Read(format!("{}: {}", path.display(), e)))
}

/// Build the acquirer for the configured strategy.
pub fn acquirer_for<A>(
    api: Arc<A>,
    config: &UploadConfig,
) -> Result<Box<dyn ImageAcquirer>, UploadError>
where
    A: MemoriesApi + ?Sized + 'static,
{
    Ok(match config.strategy {
        ImageStrategy::Inline => Box::new(InlineImage),
        ImageStrategy::Signed => Box::new(SignedUpload::new(api, config.clone())?),
    })
}

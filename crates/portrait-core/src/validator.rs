//! Pre-download validation
//!
//! A HEAD probe decides whether a candidate is worth the bandwidth.
//! Any probe failure is a rejection.

use std::sync::Arc;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::client::HttpClient;
use crate::error::{PortraitError, Result};
use crate::types::ImageCandidate;

/// Decide from probe headers alone
///
/// Accept iff the type is `image/*` and the length is unknown or at
/// least `min_bytes`.
///
/// # Example
/// ```
/// use portrait_core::validator::evaluate_probe;
/// assert!(evaluate_probe(Some("image/jpeg"), Some(40_000), 1024).is_ok());
/// assert!(evaluate_probe(Some("image/png"), None, 1024).is_ok());
/// assert!(evaluate_probe(Some("image/gif"), Some(43), 1024).is_err());
/// assert!(evaluate_probe(Some("text/html"), Some(40_000), 1024).is_err());
/// ```
pub fn evaluate_probe(
    content_type: Option<&str>,
    content_length: Option<u64>,
    min_bytes: u64,
) -> Result<()> {
    let content_type = content_type.unwrap_or_default();
    if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(PortraitError::ValidationRejected(format!(
            "content type '{}' is not an image",
            content_type
        )));
    }

    if let Some(length) = content_length
        && length < min_bytes
    {
        return Err(PortraitError::ValidationRejected(format!(
            "{} bytes is below the {} byte minimum",
            length, min_bytes
        )));
    }

    Ok(())
}

/// Metadata-only gate in front of the downloader
pub struct Validator {
    client: Arc<HttpClient>,
    min_bytes: u64,
}

impl Validator {
    pub fn new(client: Arc<HttpClient>, min_bytes: u64) -> Self {
        Self { client, min_bytes }
    }

    /// Probe `candidate` without transferring its body
    ///
    /// # Errors
    /// - `Cancelled` if `cancel` is already set
    /// - `ValidationRejected` for a non-image, undersized or failed probe
    pub async fn validate(&self, candidate: &ImageCandidate, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(PortraitError::Cancelled);
        }

        let info = self.client.probe(&candidate.url).await.map_err(|e| {
            debug!(url = %candidate.url, error = %e, "probe failed");
            PortraitError::ValidationRejected(format!("probe failed: {}", e))
        })?;

        evaluate_probe(info.content_type.as_deref(), info.content_length, self.min_bytes)
    }
}

//! Streaming image downloader
//!
//! Bytes go to `<name>.part` first and are renamed into place only after
//! the size gate passes, so an aborted or rejected download leaves
//! nothing behind.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use reqwest::header;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::client::HttpClient;
use crate::error::{PortraitError, Result};
use crate::naming::image_file_name;
use crate::parser::image_extension;
use crate::types::{DownloadResult, DownloadedImage, ImageCandidate};

/// Extension for a declared content type (`image/jpeg` → `jpg`)
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Content type first, then the URL suffix, then `jpg`
pub fn infer_extension(content_type: Option<&str>, url: &str) -> &'static str {
    content_type
        .and_then(extension_for_content_type)
        .or_else(|| image_extension(url))
        .unwrap_or("jpg")
}

pub struct Downloader {
    client: Arc<HttpClient>,
    min_bytes: u64,
}

impl Downloader {
    pub fn new(client: Arc<HttpClient>, min_bytes: u64) -> Self {
        Self { client, min_bytes }
    }

    /// Stream `candidate` into `dest_dir`
    ///
    /// # Errors
    /// - `Cancelled` if `cancel` is set before or during the transfer
    /// - `HttpError` / `HttpStatus` / `RateLimited` for a failed GET
    /// - `ValidationRejected` for a non-image response or a file under
    ///   the byte minimum
    /// - `Filesystem` if the file cannot be written
    pub async fn download(
        &self,
        candidate: &ImageCandidate,
        dest_dir: &Path,
        cancel: &CancelToken,
    ) -> DownloadResult {
        if cancel.is_cancelled() {
            return Err(PortraitError::Cancelled);
        }

        let response = self.client.get_stream(&candidate.url).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase());

        match content_type.as_deref() {
            Some(ct) if !ct.starts_with("image/") => {
                return Err(PortraitError::ValidationRejected(format!(
                    "server sent '{}' instead of an image",
                    ct
                )));
            }
            None if image_extension(&candidate.url).is_none() => {
                return Err(PortraitError::ValidationRejected(
                    "no content type and no image extension".to_string(),
                ));
            }
            _ => {}
        }

        let extension = infer_extension(content_type.as_deref(), &candidate.url);
        let file_name = image_file_name(&candidate.source_label, &candidate.url, extension);
        let final_path = dest_dir.join(&file_name);
        let part_path = dest_dir.join(format!("{}.part", file_name));

        let written = match self.stream_to(response, &part_path, cancel).await {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        if written < self.min_bytes {
            let _ = fs::remove_file(&part_path).await;
            return Err(PortraitError::ValidationRejected(format!(
                "downloaded {} bytes, below the {} byte minimum",
                written, self.min_bytes
            )));
        }

        if let Err(e) = fs::rename(&part_path, &final_path).await {
            let _ = fs::remove_file(&part_path).await;
            return Err(PortraitError::filesystem(final_path, e));
        }

        debug!(url = %candidate.url, path = %final_path.display(), bytes = written, "saved");

        Ok(DownloadedImage {
            path: final_path,
            byte_size: written,
            source_label: candidate.source_label.clone(),
        })
    }

    async fn stream_to(
        &self,
        response: reqwest::Response,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<u64> {
        let mut file = fs::File::create(path)
            .await
            .map_err(|e| PortraitError::filesystem(path, e))?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(PortraitError::Cancelled);
            }
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PortraitError::filesystem(path, e))?;
            written += chunk.len() as u64;
        }

        if cancel.is_cancelled() {
            return Err(PortraitError::Cancelled);
        }

        file.flush()
            .await
            .map_err(|e| PortraitError::filesystem(path, e))?;

        Ok(written)
    }
}

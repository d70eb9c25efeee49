//! JSON run manifest
//!
//! Written as `scraping_results.json` inside the person folder after a
//! session ends.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{PortraitError, Result};

pub const MANIFEST_FILE_NAME: &str = "scraping_results.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub person_name: String,
    pub download_folder: String,
    pub total_images: usize,
    /// Accepted candidate URLs in discovery order
    pub scraped_urls: Vec<String>,
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

impl Manifest {
    pub fn new(
        person_name: impl Into<String>,
        person_dir: &Path,
        total_images: usize,
        scraped_urls: Vec<String>,
    ) -> Self {
        Self {
            person_name: person_name.into(),
            download_folder: person_dir.display().to_string(),
            total_images,
            scraped_urls,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Write the manifest into `dir`, replacing any previous one
    pub async fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PortraitError::ParseError(format!("manifest encoding failed: {}", e)))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| PortraitError::filesystem(&path, e))?;
        Ok(path)
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PortraitError::filesystem(path, e))?;
        serde_json::from_str(&json)
            .map_err(|e| PortraitError::ParseError(format!("invalid manifest: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::new(
            "Jane Doe",
            dir.path(),
            1,
            vec!["https://cdn.example.com/a.jpg".to_string()],
        );

        let path = manifest.write(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("scraping_results.json"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["person_name"], "Jane Doe");
        assert_eq!(raw["total_images"], 1);
        assert_eq!(raw["scraped_urls"][0], "https://cdn.example.com/a.jpg");
        assert_eq!(raw["timestamp"].as_str().unwrap().len(), 19);

        assert_eq!(Manifest::read(&path).await.unwrap(), manifest);
    }

    #[tokio::test]
    async fn test_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = Manifest::new("Jane", &missing, 0, Vec::new())
            .write(&missing)
            .await
            .unwrap_err();
        assert!(matches!(err, PortraitError::Filesystem { .. }));
    }
}

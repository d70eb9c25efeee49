//! Core data types for the portrait scraper
//!
//! Contains the request, candidate and download records that flow
//! through the pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PortraitError, Result};

/// Upper bound for [`ScrapeRequest::max_images`]
pub const MAX_IMAGES_LIMIT: u32 = 100;

/// Where a candidate came from
///
/// The first five variants are keyed by a user-supplied identifier; the
/// rest are search engines driven by the person's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Twitter,
    GitHub,
    Website,
    SearchPage,
    Google,
    DuckDuckGo,
    Bing,
    Medium,
    Substack,
}

impl Platform {
    /// Label used in log lines and output file names
    pub fn label(self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Twitter => "Twitter",
            Platform::GitHub => "GitHub",
            Platform::Website => "Website",
            Platform::SearchPage => "SearchPage",
            Platform::Google => "Google",
            Platform::DuckDuckGo => "DuckDuckGo",
            Platform::Bing => "Bing",
            Platform::Medium => "Medium",
            Platform::Substack => "Substack",
        }
    }

    /// Whether the platform takes an identifier from the request
    pub fn is_identifier_keyed(self) -> bool {
        matches!(
            self,
            Platform::LinkedIn
                | Platform::Twitter
                | Platform::GitHub
                | Platform::Website
                | Platform::SearchPage
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = PortraitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" => Ok(Platform::LinkedIn),
            "twitter" | "x" => Ok(Platform::Twitter),
            "github" => Ok(Platform::GitHub),
            "website" | "web" => Ok(Platform::Website),
            "searchpage" | "search" => Ok(Platform::SearchPage),
            "google" => Ok(Platform::Google),
            "duckduckgo" | "ddg" => Ok(Platform::DuckDuckGo),
            "bing" => Ok(Platform::Bing),
            "medium" => Ok(Platform::Medium),
            "substack" => Ok(Platform::Substack),
            other => Err(PortraitError::InvalidRequest(format!(
                "unknown platform '{}'",
                other
            ))),
        }
    }
}

/// A discovered image URL plus provenance, not yet downloaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// Absolute http(s) URL of the image
    pub url: String,

    /// Label used for logging and file naming (e.g. "GitHub")
    pub source_label: String,

    /// Platform that produced the candidate
    pub platform: Platform,

    /// Name of the extraction rule that matched (e.g. "og:image")
    pub discovery_method: String,

    /// Title or alt text when the source exposes one
    pub title: Option<String>,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>, platform: Platform, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source_label: platform.label().to_string(),
            platform,
            discovery_method: method.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }
}

/// Input to one scraping session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    /// Person to look for; must not be blank
    pub person_name: String,

    /// Identifier per platform (username, profile URL, site URL)
    pub platform_identifiers: BTreeMap<Platform, String>,

    /// Number of images wanted, in `1..=100`
    pub max_images: u32,

    /// Root folder; files land in `<folder>/<sanitized name>/`
    pub download_folder: PathBuf,

    /// Probe candidates with a HEAD request before downloading
    pub validate_before_download: bool,

    /// Optional company or title appended to search queries
    pub qualifier: Option<String>,
}

impl ScrapeRequest {
    /// Create a request with ten images and pre-download validation on
    pub fn new(person_name: impl Into<String>, download_folder: impl Into<PathBuf>) -> Self {
        Self {
            person_name: person_name.into(),
            platform_identifiers: BTreeMap::new(),
            max_images: 10,
            download_folder: download_folder.into(),
            validate_before_download: true,
            qualifier: None,
        }
    }

    /// Add an identifier; blank values are ignored
    pub fn with_identifier(mut self, platform: Platform, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        if !identifier.trim().is_empty() {
            self.platform_identifiers
                .insert(platform, identifier.trim().to_string());
        }
        self
    }

    pub fn with_max_images(mut self, max_images: u32) -> Self {
        self.max_images = max_images;
        self
    }

    pub fn with_validation(mut self, validate_before_download: bool) -> Self {
        self.validate_before_download = validate_before_download;
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        let qualifier = qualifier.into();
        self.qualifier = Some(qualifier.trim().to_string()).filter(|q| !q.is_empty());
        self
    }

    /// Check the request before any network activity
    ///
    /// # Errors
    /// - `InvalidRequest` if the name is blank or `max_images` is outside `1..=100`
    pub fn validate(&self) -> Result<()> {
        if self.person_name.trim().is_empty() {
            return Err(PortraitError::InvalidRequest(
                "Person name cannot be empty".to_string(),
            ));
        }

        if self.max_images == 0 || self.max_images > MAX_IMAGES_LIMIT {
            return Err(PortraitError::InvalidRequest(format!(
                "max_images must be between 1 and {}, got {}",
                MAX_IMAGES_LIMIT, self.max_images
            )));
        }

        Ok(())
    }

    /// Query text handed to search adapters
    pub fn search_query(&self) -> String {
        let name = self.person_name.trim();
        match &self.qualifier {
            Some(q) => format!("{} {}", name, q),
            None => name.to_string(),
        }
    }
}

/// A candidate that made it to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedImage {
    pub path: PathBuf,
    pub byte_size: u64,
    pub source_label: String,
}

/// Outcome of one download: a file on disk or the reason there is none
pub type DownloadResult = Result<DownloadedImage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = ScrapeRequest::new("Jane Doe", "out");
        assert_eq!(request.max_images, 10);
        assert!(request.validate_before_download);
        assert!(request.platform_identifiers.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_rejects_blank_name() {
        let request = ScrapeRequest::new("   ", "out");
        match request.validate() {
            Err(PortraitError::InvalidRequest(msg)) => assert!(msg.contains("empty")),
            other => panic!("Expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_request_max_images_bounds() {
        let base = ScrapeRequest::new("Jane Doe", "out");
        assert!(base.clone().with_max_images(0).validate().is_err());
        assert!(base.clone().with_max_images(1).validate().is_ok());
        assert!(base.clone().with_max_images(100).validate().is_ok());
        assert!(base.with_max_images(101).validate().is_err());
    }

    #[test]
    fn test_blank_identifier_ignored() {
        let request = ScrapeRequest::new("Jane Doe", "out")
            .with_identifier(Platform::GitHub, "  ")
            .with_identifier(Platform::Twitter, " janedoe ");
        assert_eq!(request.platform_identifiers.len(), 1);
        assert_eq!(
            request.platform_identifiers.get(&Platform::Twitter),
            Some(&"janedoe".to_string())
        );
    }

    #[test]
    fn test_search_query_with_qualifier() {
        let request = ScrapeRequest::new(" Jane Doe ", "out").with_qualifier("Acme Corp");
        assert_eq!(request.search_query(), "Jane Doe Acme Corp");

        let request = ScrapeRequest::new("Jane Doe", "out").with_qualifier("  ");
        assert_eq!(request.qualifier, None);
        assert_eq!(request.search_query(), "Jane Doe");
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!("GitHub".parse::<Platform>().unwrap(), Platform::GitHub);
        assert_eq!("x".parse::<Platform>().unwrap(), Platform::Twitter);
        assert_eq!("ddg".parse::<Platform>().unwrap(), Platform::DuckDuckGo);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_keying() {
        assert!(Platform::GitHub.is_identifier_keyed());
        assert!(Platform::SearchPage.is_identifier_keyed());
        assert!(!Platform::Google.is_identifier_keyed());
        assert!(!Platform::Substack.is_identifier_keyed());
    }

    #[test]
    fn test_candidate_serialization() {
        let candidate = ImageCandidate::new(
            "https://avatars.githubusercontent.com/u/1?v=4&s=400",
            Platform::GitHub,
            "api",
        )
        .with_title(Some("Jane Doe".to_string()));

        let json = serde_json::to_string(&candidate).expect("Serialization should succeed");
        assert!(json.contains("\"platform\":\"github\""));
        let back: ImageCandidate =
            serde_json::from_str(&json).expect("Deserialization should succeed");
        assert_eq!(candidate, back);
        assert_eq!(back.source_label, "GitHub");
    }

    #[test]
    fn test_candidate_blank_title_dropped() {
        let candidate = ImageCandidate::new("https://a.example/x.jpg", Platform::Bing, "murl")
            .with_title(Some("  ".to_string()));
        assert_eq!(candidate.title, None);
    }
}

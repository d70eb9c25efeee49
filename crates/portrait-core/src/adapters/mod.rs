//! Source adapters
//!
//! Each adapter turns an identifier (profile adapters) or a query
//! (search adapters) into image candidates. Adapters never fail: any
//! fetch or parse error comes back inside [`AdapterOutcome`] next to
//! whatever was found before it happened.

mod profile;
mod registry;
mod search;

use async_trait::async_trait;

use crate::client::HttpClient;
use crate::error::{PortraitError, Result};
use crate::parser::{Extracted, RuleSet};
use crate::types::{ImageCandidate, Platform};

pub use profile::{GitHubAdapter, LinkedInAdapter, TwitterAdapter, WebsiteAdapter};
pub use registry::AdapterRegistry;
pub use search::{
    BingAdapter, DuckDuckGoAdapter, GoogleImagesAdapter, SearchPageAdapter, SiteSearchAdapter,
};

/// Adapter family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// One canonical picture per identifier
    Profile,
    /// Several candidates per call, up to the quota
    Search,
}

/// Result of one adapter call
///
/// `failure` may be set even when `candidates` is not empty, e.g. when
/// the second of two search queries timed out.
#[derive(Debug, Default)]
pub struct AdapterOutcome {
    pub candidates: Vec<ImageCandidate>,
    pub failure: Option<PortraitError>,
}

impl AdapterOutcome {
    pub fn found(candidates: Vec<ImageCandidate>) -> Self {
        Self {
            candidates,
            failure: None,
        }
    }

    pub fn failed(error: PortraitError) -> Self {
        Self {
            candidates: Vec::new(),
            failure: Some(error),
        }
    }

    pub fn from_result(result: Result<Vec<ImageCandidate>>) -> Self {
        match result {
            Ok(candidates) => Self::found(candidates),
            Err(e) => Self::failed(e),
        }
    }
}

/// A source of image candidates
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    fn kind(&self) -> AdapterKind;

    fn label(&self) -> &'static str {
        self.platform().label()
    }

    /// Fetch up to `quota` candidates for `identifier`
    ///
    /// Profile adapters return at most one candidate regardless of quota.
    async fn fetch(&self, identifier: &str, quota: usize) -> AdapterOutcome;
}

pub(crate) fn to_candidates(found: Vec<Extracted>, platform: Platform) -> Vec<ImageCandidate> {
    found
        .into_iter()
        .map(|e| ImageCandidate::new(e.url, platform, e.method).with_title(e.title))
        .collect()
}

/// Fetch `pages` in order and return the first URL `rules` yields
///
/// A page that fails to load is skipped. The error of the last failed
/// page is returned only if no page could be loaded at all.
pub(crate) async fn first_match_across(
    client: &HttpClient,
    pages: &[String],
    rules: &RuleSet,
) -> Result<Option<Extracted>> {
    let mut last_error = None;
    let mut loaded_any = false;

    for page in pages {
        match client.fetch_text(page).await {
            Ok(html) => {
                loaded_any = true;
                if let Some(found) = rules.first_match(&html, page) {
                    return Ok(Some(found));
                }
            }
            Err(e) => {
                tracing::debug!(page = %page, error = %e, "profile page unavailable");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if !loaded_any => Err(e),
        _ => Ok(None),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ExtractionRule, ImageFilter};
    use test_support::quiet_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn og_rules() -> RuleSet {
        RuleSet::new(
            vec![ExtractionRule::MetaTag { key: "og:image" }],
            ImageFilter::strict(),
        )
    }

    #[test]
    fn test_outcome_from_result() {
        let ok = AdapterOutcome::from_result(Ok(vec![ImageCandidate::new(
            "https://e.com/a.jpg",
            Platform::Bing,
            "raw-scan",
        )]));
        assert_eq!(ok.candidates.len(), 1);
        assert!(ok.failure.is_none());

        let err = AdapterOutcome::from_result(Err(PortraitError::RateLimited));
        assert!(err.candidates.is_empty());
        assert!(matches!(err.failure, Some(PortraitError::RateLimited)));
    }

    #[tokio::test]
    async fn test_first_match_falls_through_failed_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/up"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<meta property="og:image" content="https://cdn.example.com/jane.jpg">"#,
            ))
            .mount(&server)
            .await;

        let pages = vec![
            format!("{}/down", server.uri()),
            format!("{}/up", server.uri()),
        ];
        let found = first_match_across(&quiet_client(), &pages, &og_rules())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.url, "https://cdn.example.com/jane.jpg");
    }

    #[tokio::test]
    async fn test_first_match_reports_error_when_nothing_loads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let pages = vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())];
        let err = first_match_across(&quiet_client(), &pages, &og_rules())
            .await
            .unwrap_err();
        assert!(matches!(err, PortraitError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_first_match_empty_page_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let pages = vec![format!("{}/a", server.uri())];
        let found = first_match_across(&quiet_client(), &pages, &og_rules())
            .await
            .unwrap();
        assert!(found.is_none());
    }
}

//! Search adapters
//!
//! Query a results page and scan it for embedded image URLs, keeping up
//! to the quota in page order.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use super::{AdapterKind, AdapterOutcome, SourceAdapter, first_match_across, to_candidates};
use crate::client::HttpClient;
use crate::parser::{ExtractionRule, ImageFilter, RuleSet};
use crate::types::Platform;
use crate::url::{
    BING_BASE, DUCKDUCKGO_BASE, GOOGLE_BASE, build_bing_images_url, build_duckduckgo_url,
    build_google_images_url, build_google_web_url, host_of, resolve_url, unwrap_redirect_link,
};

/// Result links followed by a site-restricted search
const SITE_SEARCH_LINKS: usize = 3;

/// Run each query in turn, pooling distinct results up to `quota`
///
/// A failed query is remembered and the next one still runs.
async fn collect_queries(
    client: &HttpClient,
    platform: Platform,
    rules: &RuleSet,
    pages: Vec<String>,
    quota: usize,
) -> AdapterOutcome {
    let mut outcome = AdapterOutcome::default();
    let mut seen = HashSet::new();

    for page in pages {
        let remaining = quota.saturating_sub(outcome.candidates.len());
        if remaining == 0 {
            break;
        }

        match client.fetch_text(&page).await {
            Ok(html) => {
                let found = rules
                    .collect(&html, &page, quota)
                    .into_iter()
                    .filter(|e| seen.insert(e.url.clone()))
                    .take(remaining)
                    .collect();
                outcome.candidates.extend(to_candidates(found, platform));
            }
            Err(e) => {
                debug!(page = %page, error = %e, "search page unavailable");
                outcome.failure = Some(e);
            }
        }
    }

    outcome
}

/// Google Images, queried as "profile picture" then "headshot"
pub struct GoogleImagesAdapter {
    client: Arc<HttpClient>,
    base: String,
    rules: RuleSet,
}

impl GoogleImagesAdapter {
    pub fn new(client: Arc<HttpClient>) -> Self {
        let rules = RuleSet::new(
            vec![
                ExtractionRule::JsonKey { key: "ou" },
                ExtractionRule::RawUrls,
                ExtractionRule::Selector {
                    css: "img",
                    attrs: &["data-src", "src"],
                },
            ],
            ImageFilter::strict(),
        );
        Self {
            client,
            base: GOOGLE_BASE.to_string(),
            rules,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for GoogleImagesAdapter {
    fn platform(&self) -> Platform {
        Platform::Google
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Search
    }

    async fn fetch(&self, query: &str, quota: usize) -> AdapterOutcome {
        let pages = ["profile picture", "headshot"]
            .iter()
            .map(|suffix| build_google_images_url(&self.base, &format!("{} {}", query, suffix)))
            .collect();
        collect_queries(&self.client, Platform::Google, &self.rules, pages, quota).await
    }
}

/// DuckDuckGo HTML endpoint, raw URL scan
pub struct DuckDuckGoAdapter {
    client: Arc<HttpClient>,
    base: String,
    rules: RuleSet,
}

impl DuckDuckGoAdapter {
    pub fn new(client: Arc<HttpClient>) -> Self {
        let rules = RuleSet::new(
            vec![
                ExtractionRule::RawUrls,
                ExtractionRule::Selector {
                    css: "img",
                    attrs: &["src"],
                },
            ],
            ImageFilter::strict(),
        );
        Self {
            client,
            base: DUCKDUCKGO_BASE.to_string(),
            rules,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for DuckDuckGoAdapter {
    fn platform(&self) -> Platform {
        Platform::DuckDuckGo
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Search
    }

    async fn fetch(&self, query: &str, quota: usize) -> AdapterOutcome {
        let page = build_duckduckgo_url(&self.base, &format!("{} profile", query));
        collect_queries(&self.client, Platform::DuckDuckGo, &self.rules, vec![page], quota).await
    }
}

/// Bing Images: `a.iusc[m]` metadata first, then a raw scan
pub struct BingAdapter {
    client: Arc<HttpClient>,
    base: String,
    rules: RuleSet,
}

impl BingAdapter {
    pub fn new(client: Arc<HttpClient>) -> Self {
        let rules = RuleSet::new(
            vec![
                ExtractionRule::JsonAttribute {
                    css: "a.iusc",
                    attr: "m",
                    field: "murl",
                    title_field: Some("t"),
                },
                ExtractionRule::RawUrls,
            ],
            ImageFilter::strict(),
        );
        Self {
            client,
            base: BING_BASE.to_string(),
            rules,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for BingAdapter {
    fn platform(&self) -> Platform {
        Platform::Bing
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Search
    }

    async fn fetch(&self, query: &str, quota: usize) -> AdapterOutcome {
        let page = build_bing_images_url(&self.base, &format!("{} profile", query));
        collect_queries(&self.client, Platform::Bing, &self.rules, vec![page], quota).await
    }
}

/// Result links on `domain` from a Google web results page
fn result_links(html: &str, page_url: &str, domain: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(unwrap_redirect_link)
        .filter_map(|href| resolve_url(page_url, &href))
        .filter(|link| {
            host_of(link).is_some_and(|host| host == domain || host.ends_with(&format!(".{}", domain)))
        })
        .filter(|link| seen.insert(link.clone()))
        .take(limit)
        .collect()
}

/// `site:<domain>` search, then the first image on the first result
/// page that has one
pub struct SiteSearchAdapter {
    client: Arc<HttpClient>,
    platform: Platform,
    domain: String,
    google_base: String,
    rules: RuleSet,
}

impl SiteSearchAdapter {
    pub fn new(client: Arc<HttpClient>, platform: Platform, domain: impl Into<String>) -> Self {
        let rules = RuleSet::new(
            vec![
                ExtractionRule::MetaTag { key: "og:image" },
                ExtractionRule::MetaTag {
                    key: "twitter:image",
                },
                ExtractionRule::JsonLd,
                ExtractionRule::Selector {
                    css: "article img, img",
                    attrs: &["src", "data-src"],
                },
            ],
            ImageFilter::strict(),
        );
        Self {
            client,
            platform,
            domain: domain.into(),
            google_base: GOOGLE_BASE.to_string(),
            rules,
        }
    }

    pub fn medium(client: Arc<HttpClient>) -> Self {
        Self::new(client, Platform::Medium, "medium.com")
    }

    pub fn substack(client: Arc<HttpClient>) -> Self {
        Self::new(client, Platform::Substack, "substack.com")
    }

    pub fn with_google_base(mut self, base: impl Into<String>) -> Self {
        self.google_base = base.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for SiteSearchAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Search
    }

    async fn fetch(&self, query: &str, _quota: usize) -> AdapterOutcome {
        let results_url =
            build_google_web_url(&self.google_base, &format!("site:{} {}", self.domain, query));

        let html = match self.client.fetch_text(&results_url).await {
            Ok(html) => html,
            Err(e) => return AdapterOutcome::failed(e),
        };

        let links = result_links(&html, &results_url, &self.domain, SITE_SEARCH_LINKS);
        if links.is_empty() {
            debug!(domain = %self.domain, "no result links");
            return AdapterOutcome::default();
        }

        AdapterOutcome::from_result(
            first_match_across(&self.client, &links, &self.rules)
                .await
                .map(|found| to_candidates(found.into_iter().collect(), self.platform)),
        )
    }
}

/// A user-supplied results page scanned with generic avatar selectors
pub struct SearchPageAdapter {
    client: Arc<HttpClient>,
    rules: RuleSet,
}

impl SearchPageAdapter {
    pub fn new(client: Arc<HttpClient>) -> Self {
        let rules = RuleSet::new(
            vec![ExtractionRule::Selector {
                css: r#"img[src*="profile"], img[src*="avatar"], img[alt*="profile" i], img[class*="profile" i], img[class*="avatar" i]"#,
                attrs: &["src", "data-src"],
            }],
            ImageFilter::strict(),
        );
        Self { client, rules }
    }
}

#[async_trait]
impl SourceAdapter for SearchPageAdapter {
    fn platform(&self) -> Platform {
        Platform::SearchPage
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Search
    }

    async fn fetch(&self, search_url: &str, quota: usize) -> AdapterOutcome {
        collect_queries(
            &self.client,
            Platform::SearchPage,
            &self.rules,
            vec![search_url.trim().to_string()],
            quota,
        )
        .await
    }
}

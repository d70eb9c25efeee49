//! Profile adapters
//!
//! One request (or a short list of fallbacks) per identifier, first
//! well-formed image wins.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{AdapterKind, AdapterOutcome, SourceAdapter, first_match_across, to_candidates};
use crate::client::HttpClient;
use crate::error::{PortraitError, Result};
use crate::parser::{ExtractionRule, ImageFilter, RuleSet};
use crate::types::{ImageCandidate, Platform};
use crate::url::{
    GITHUB_API_BASE, LINKEDIN_BASE, TWITTER_BASE, X_BASE, build_github_user_url,
    build_linkedin_profile_url, build_twitter_profile_url, build_website_url,
};

const GITHUB_AVATAR_SIZE: &str = "400";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

/// Avatar from the GitHub REST API
pub struct GitHubAdapter {
    client: Arc<HttpClient>,
    api_base: String,
    filter: ImageFilter,
}

impl GitHubAdapter {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            api_base: GITHUB_API_BASE.to_string(),
            // Avatar URLs carry no extension; the downloader checks the content type
            filter: ImageFilter::strict().extension_optional(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn lookup(&self, identifier: &str) -> Result<Vec<ImageCandidate>> {
        let endpoint = build_github_user_url(&self.api_base, identifier);
        let user: GitHubUser = self.client.fetch_json(&endpoint).await?;

        let avatar = user
            .avatar_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| PortraitError::ParseError(format!("no avatar_url in {}", endpoint)))?;
        let avatar = with_avatar_size(&avatar);

        if let Err(reason) = self.filter.check(&avatar) {
            debug!(url = %avatar, %reason, "GitHub avatar rejected");
            return Ok(Vec::new());
        }

        Ok(vec![
            ImageCandidate::new(avatar, Platform::GitHub, "api:avatar_url").with_title(user.name),
        ])
    }
}

/// Ask GitHub for the 400px rendition of an avatar
fn with_avatar_size(avatar_url: &str) -> String {
    let Ok(mut url) = Url::parse(avatar_url) else {
        return avatar_url.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "s" && k != "size")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("s", GITHUB_AVATAR_SIZE);
    url.to_string()
}

#[async_trait]
impl SourceAdapter for GitHubAdapter {
    fn platform(&self) -> Platform {
        Platform::GitHub
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Profile
    }

    async fn fetch(&self, identifier: &str, _quota: usize) -> AdapterOutcome {
        AdapterOutcome::from_result(self.lookup(identifier).await)
    }
}

/// Upgrade `_normal` / `_bigger` / `_mini` thumbnails to 400x400
pub fn upgrade_twitter_thumbnail(url: &str) -> String {
    ["_normal.", "_bigger.", "_mini."]
        .iter()
        .fold(url.to_string(), |acc, size| acc.replace(size, "_400x400."))
}

/// Profile picture from the public x.com / twitter.com page
pub struct TwitterAdapter {
    client: Arc<HttpClient>,
    bases: Vec<String>,
    rules: RuleSet,
}

impl TwitterAdapter {
    pub fn new(client: Arc<HttpClient>) -> Self {
        let rules = RuleSet::new(
            vec![
                ExtractionRule::MetaTag { key: "og:image" },
                ExtractionRule::MetaTag {
                    key: "twitter:image",
                },
                ExtractionRule::Selector {
                    css: r#"img[src*="profile_images"], img[data-testid="ProfileAvatar-image"], div[data-testid^="UserAvatar-Container-"] img"#,
                    attrs: &["src"],
                },
                ExtractionRule::JsonLd,
            ],
            ImageFilter::strict()
                .on_host("twimg.com")
                .rejecting(&["default_profile"]),
        )
        .with_rewrite(upgrade_twitter_thumbnail);

        Self {
            client,
            bases: vec![X_BASE.to_string(), TWITTER_BASE.to_string()],
            rules,
        }
    }

    /// Hosts tried in order (default: x.com, then twitter.com)
    pub fn with_bases(mut self, bases: Vec<String>) -> Self {
        self.bases = bases;
        self
    }
}

#[async_trait]
impl SourceAdapter for TwitterAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Profile
    }

    async fn fetch(&self, identifier: &str, _quota: usize) -> AdapterOutcome {
        let pages: Vec<String> = self
            .bases
            .iter()
            .map(|base| build_twitter_profile_url(base, identifier))
            .collect();

        AdapterOutcome::from_result(
            first_match_across(&self.client, &pages, &self.rules)
                .await
                .map(|found| to_candidates(found.into_iter().collect(), Platform::Twitter)),
        )
    }
}

/// Public LinkedIn profile photo
pub struct LinkedInAdapter {
    client: Arc<HttpClient>,
    base: String,
    rules: RuleSet,
}

impl LinkedInAdapter {
    pub fn new(client: Arc<HttpClient>) -> Self {
        let rules = RuleSet::new(
            vec![
                ExtractionRule::MetaTag { key: "og:image" },
                ExtractionRule::Selector {
                    css: r#"img[data-delayed-url*="profile-displayphoto"]"#,
                    attrs: &["data-delayed-url", "src"],
                },
                ExtractionRule::Selector {
                    css: ".profile-photo img, .pv-top-card__photo img, img.pv-top-card-profile-picture__image",
                    attrs: &["src", "data-delayed-url"],
                },
                ExtractionRule::JsonLd,
            ],
            // licdn image paths end in opaque ids, not extensions
            ImageFilter::strict().on_host("licdn.com").extension_optional(),
        );

        Self {
            client,
            base: LINKEDIN_BASE.to_string(),
            rules,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for LinkedInAdapter {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Profile
    }

    async fn fetch(&self, identifier: &str, _quota: usize) -> AdapterOutcome {
        let page = build_linkedin_profile_url(&self.base, identifier);
        AdapterOutcome::from_result(
            first_match_across(&self.client, &[page], &self.rules)
                .await
                .map(|found| to_candidates(found.into_iter().collect(), Platform::LinkedIn)),
        )
    }
}

/// Portrait from a personal homepage
pub struct WebsiteAdapter {
    client: Arc<HttpClient>,
    rules: RuleSet,
}

impl WebsiteAdapter {
    pub fn new(client: Arc<HttpClient>) -> Self {
        let rules = RuleSet::new(
            vec![
                ExtractionRule::MetaTag { key: "og:image" },
                ExtractionRule::MetaTag {
                    key: "twitter:image",
                },
                ExtractionRule::Selector {
                    css: r#"img[alt*="profile" i], img[class*="avatar" i], img[class*="profile" i], .profile img, .avatar img"#,
                    attrs: &["src", "data-src"],
                },
                ExtractionRule::JsonLd,
            ],
            ImageFilter::strict(),
        );
        Self { client, rules }
    }
}

#[async_trait]
impl SourceAdapter for WebsiteAdapter {
    fn platform(&self) -> Platform {
        Platform::Website
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Profile
    }

    async fn fetch(&self, identifier: &str, _quota: usize) -> AdapterOutcome {
        let page = build_website_url(identifier);
        AdapterOutcome::from_result(
            first_match_across(&self.client, &[page], &self.rules)
                .await
                .map(|found| to_candidates(found.into_iter().collect(), Platform::Website)),
        )
    }
}

//! Adapter registry
//!
//! Holds the two ordered adapter lists the planner walks: identifier-keyed
//! adapters first, then search adapters.

use std::sync::Arc;

use super::{
    BingAdapter, DuckDuckGoAdapter, GitHubAdapter, GoogleImagesAdapter, LinkedInAdapter,
    SearchPageAdapter, SiteSearchAdapter, SourceAdapter, TwitterAdapter, WebsiteAdapter,
};
use crate::client::HttpClient;
use crate::types::Platform;

#[derive(Clone, Default)]
pub struct AdapterRegistry {
    identified: Vec<Arc<dyn SourceAdapter>>,
    search: Vec<Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// No adapters at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// The production line-up
    ///
    /// Identified: LinkedIn, Twitter, GitHub, Website, custom search page.
    /// Search: Google Images, DuckDuckGo, Bing, Medium, Substack.
    pub fn standard(client: Arc<HttpClient>) -> Self {
        Self::empty()
            .with_adapter(LinkedInAdapter::new(client.clone()))
            .with_adapter(TwitterAdapter::new(client.clone()))
            .with_adapter(GitHubAdapter::new(client.clone()))
            .with_adapter(WebsiteAdapter::new(client.clone()))
            .with_adapter(SearchPageAdapter::new(client.clone()))
            .with_adapter(GoogleImagesAdapter::new(client.clone()))
            .with_adapter(DuckDuckGoAdapter::new(client.clone()))
            .with_adapter(BingAdapter::new(client.clone()))
            .with_adapter(SiteSearchAdapter::medium(client.clone()))
            .with_adapter(SiteSearchAdapter::substack(client))
    }

    /// Append an adapter to the list its platform belongs to
    pub fn with_adapter(self, adapter: impl SourceAdapter + 'static) -> Self {
        if adapter.platform().is_identifier_keyed() {
            self.with_identified(adapter)
        } else {
            self.with_search(adapter)
        }
    }

    /// Append an adapter driven by the request identifier for its platform
    pub fn with_identified(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.identified.push(Arc::new(adapter));
        self
    }

    /// Append an adapter driven by the person-name query
    pub fn with_search(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.search.push(Arc::new(adapter));
        self
    }

    pub fn identified(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.identified
    }

    pub fn search(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.search
    }

    /// Platforms in the order they will be consulted
    pub fn platforms(&self) -> Vec<Platform> {
        self.identified
            .iter()
            .chain(self.search.iter())
            .map(|a| a.platform())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::quiet_client;

    #[test]
    fn test_standard_order() {
        let registry = AdapterRegistry::standard(quiet_client());
        assert_eq!(
            registry.platforms(),
            vec![
                Platform::LinkedIn,
                Platform::Twitter,
                Platform::GitHub,
                Platform::Website,
                Platform::SearchPage,
                Platform::Google,
                Platform::DuckDuckGo,
                Platform::Bing,
                Platform::Medium,
                Platform::Substack,
            ]
        );
    }

    #[test]
    fn test_with_adapter_routes_by_platform() {
        let client = quiet_client();
        let registry = AdapterRegistry::empty()
            .with_adapter(BingAdapter::new(client.clone()))
            .with_adapter(SearchPageAdapter::new(client.clone()))
            .with_adapter(GitHubAdapter::new(client));

        let identified: Vec<_> = registry.identified().iter().map(|a| a.platform()).collect();
        let search: Vec<_> = registry.search().iter().map(|a| a.platform()).collect();
        assert_eq!(identified, vec![Platform::SearchPage, Platform::GitHub]);
        assert_eq!(search, vec![Platform::Bing]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = AdapterRegistry::empty();
        assert!(registry.identified().is_empty());
        assert!(registry.search().is_empty());
    }
}

//! Session configuration

use std::time::Duration;

use crate::client::ClientConfig;

/// Knobs for one planner
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// HTTP client settings shared by every source
    pub client: ClientConfig,
    /// Pause between consecutive adapter calls (default: 1s)
    pub adapter_delay: Duration,
    /// Smallest acceptable image in bytes (default: 1024)
    pub min_image_bytes: u64,
    /// Write `scraping_results.json` into the person folder (default: true)
    pub write_manifest: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            adapter_delay: Duration::from_secs(1),
            min_image_bytes: 1024,
            write_manifest: true,
        }
    }
}

impl ScrapeConfig {
    pub fn with_adapter_delay(mut self, delay: Duration) -> Self {
        self.adapter_delay = delay;
        self
    }

    pub fn with_min_image_bytes(mut self, bytes: u64) -> Self {
        self.min_image_bytes = bytes;
        self
    }

    pub fn with_manifest(mut self, write_manifest: bool) -> Self {
        self.write_manifest = write_manifest;
        self
    }

    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }
}

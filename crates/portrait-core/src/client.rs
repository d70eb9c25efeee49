//! HTTP client with rate limiting and retry logic
//!
//! Every adapter, the validator and the downloader share one client so
//! request pacing, timeouts and headers are uniform across sources.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{PortraitError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum requests per second across all sources (default: 4.0)
    pub requests_per_second: f64,
    /// Whole-request timeout in seconds (default: 15)
    pub timeout_secs: u64,
    /// Connect timeout in seconds (default: 10)
    pub connect_timeout_secs: u64,
    /// Retry attempts for transient page-fetch errors (default: 2)
    pub max_retries: u32,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 4.0,
            timeout_secs: 15,
            connect_timeout_secs: 10,
            max_retries: 2,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Rate limiter to control request frequency
///
/// Ensures calls to [`RateLimiter::acquire`] are spaced at least
/// `min_interval` apart. The first call never waits.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// A non-positive rate disables limiting.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self::with_interval(min_interval)
    }

    /// Create a rate limiter from a fixed interval
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Acquire permission to make a request
    ///
    /// If called before the minimum interval has passed since the last
    /// acquisition, sleeps until the interval has elapsed.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Headers returned by a metadata-only probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInfo {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

/// HTTP client wrapper with rate limiting and retry logic
///
/// Handles all outbound HTTP for a session:
/// - Rate limiting so no source is hammered
/// - Retries with exponential backoff for transient page-fetch errors
/// - Bounded connect and read timeouts on every call
pub struct HttpClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .default_headers(headers)
            .build()
            .map_err(PortraitError::HttpError)?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            max_retries: config.max_retries,
        })
    }

    /// Fetch a page body as text
    ///
    /// # Errors
    /// - `HttpError` - Network errors, including timeouts
    /// - `HttpStatus` - Server answered with status >= 400
    /// - `RateLimited` - Server returned 429 after all retries exhausted
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut attempt = 0;

        loop {
            self.rate_limiter.acquire().await;

            match self.do_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    // Exponential backoff: 1s, 2s, 4s
                    let backoff = Duration::from_secs(1 << attempt);
                    debug!(url, attempt, error = %e, "retrying after {:?}", backoff);
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch and deserialize a JSON document
    ///
    /// # Errors
    /// Same as [`HttpClient::fetch_text`], plus `ParseError` for malformed JSON
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| PortraitError::ParseError(format!("invalid JSON from {}: {}", url, e)))
    }

    /// Issue a HEAD request and report the declared type and length
    ///
    /// The length is read from the `Content-Length` header directly;
    /// the body of a HEAD response is always empty.
    pub async fn probe(&self, url: &str) -> Result<ProbeInfo> {
        self.rate_limiter.acquire().await;

        let response = self.client.head(url).send().await?;
        let response = Self::check_status(response, url)?;
        let headers = response.headers();

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase());
        let content_length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        Ok(ProbeInfo {
            status: response.status().as_u16(),
            content_type,
            content_length,
        })
    }

    /// Start a GET whose body the caller streams
    ///
    /// Single attempt; the status has already been checked.
    pub async fn get_stream(&self, url: &str) -> Result<reqwest::Response> {
        self.rate_limiter.acquire().await;

        let response = self.client.get(url).send().await?;
        Self::check_status(response, url)
    }

    /// Perform a single fetch attempt
    async fn do_fetch(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response, url)?;
        response.text().await.map_err(PortraitError::HttpError)
    }

    fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PortraitError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(PortraitError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    /// Check if an error is retryable
    fn is_retryable(error: &PortraitError) -> bool {
        match error {
            PortraitError::RateLimited => true,
            PortraitError::HttpStatus { status, .. } => *status >= 500,
            PortraitError::HttpError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Get a reference to the rate limiter (for testing)
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quiet_client() -> HttpClient {
        HttpClient::with_config(ClientConfig {
            requests_per_second: 0.0,
            max_retries: 0,
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(2.0);
        assert_eq!(limiter.min_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let limiter = RateLimiter::new(0.0);
        assert_eq!(limiter.min_interval(), Duration::ZERO);
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.requests_per_second, 4.0);
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_client_creation() {
        assert!(HttpClient::new().is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_acquire() {
        let limiter = RateLimiter::new(10.0); // 100ms interval

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_rate_limiter_first_acquire_is_immediate() {
        let limiter = RateLimiter::with_interval(Duration::from_secs(5));

        let start = Instant::now();
        limiter.acquire().await;

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_fetch_text_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let body = quiet_client()
            .fetch_text(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_fetch_text_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let result = quiet_client().fetch_text(&format!("{}/x", server.uri())).await;
        match result {
            Err(PortraitError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_text_maps_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        let result = quiet_client().fetch_text(&format!("{}/x", server.uri())).await;
        assert!(matches!(result, Err(PortraitError::RateLimited)));
    }

    #[tokio::test]
    async fn test_fetch_json_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let result: Result<serde_json::Value> =
            quiet_client().fetch_json(&format!("{}/x", server.uri())).await;
        assert!(matches!(result, Err(PortraitError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_probe_reads_headers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/a.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/PNG")
                    .insert_header("content-length", "2048"),
            )
            .mount(&server)
            .await;

        let info = quiet_client()
            .probe(&format!("{}/a.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(info.status, 200);
        assert_eq!(info.content_type.as_deref(), Some("image/png"));
    }
}

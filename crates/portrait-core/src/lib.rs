//! Portrait Scraper Core Library
//!
//! Finds profile pictures of a named person across social profiles,
//! personal websites and image search engines, then validates and
//! downloads them.
//!
//! # Overview
//!
//! A session walks a fixed pipeline on one background worker:
//! - Source adapters (LinkedIn, Twitter/X, GitHub, a personal website, a
//!   custom results page, then Google Images, DuckDuckGo, Bing and
//!   Medium/Substack site searches) turn identifiers and queries into
//!   image candidates
//! - A per-session deduplicator drops URLs already seen
//! - A HEAD probe rejects non-images and tiny files before download
//! - The downloader streams accepted images to
//!   `<folder>/<person>/<source>_<hash8>.<ext>` and deletes anything
//!   under the byte minimum
//!
//! A failing source is logged and skipped; only an invalid request or an
//! unwritable destination folder aborts a session.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use portrait_core::{Platform, QueryPlanner, Result, ScrapeConfig, ScrapeRequest, spawn_session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let planner = Arc::new(QueryPlanner::new(ScrapeConfig::default())?);
//!     let request = ScrapeRequest::new("Jane Doe", "profile_images")
//!         .with_identifier(Platform::GitHub, "janedoe")
//!         .with_max_images(5);
//!
//!     let mut session = spawn_session(planner, request);
//!     while let Some(event) = session.next_event().await {
//!         println!("[{:?}] {}", event.level, event.message);
//!     }
//!
//!     let summary = session.wait().await?;
//!     println!("{} downloaded, {} failed", summary.downloaded, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! # Cancellation
//!
//! [`SessionHandle::cancel`] sets a shared flag the worker polls before
//! each adapter call, before each probe and between download chunks. A
//! file that was mid-download when the flag was seen is removed.

pub mod adapters;
mod cancel;
mod client;
mod config;
mod dedup;
pub mod downloader;
mod error;
mod events;
pub mod manifest;
pub mod naming;
pub mod parser;
mod planner;
mod session;
mod types;
pub mod url;
pub mod validator;

// Re-export adapter types
pub use adapters::{AdapterKind, AdapterOutcome, AdapterRegistry, SourceAdapter};

// Re-export cancellation and dedup primitives
pub use cancel::CancelToken;
pub use dedup::Deduplicator;

// Re-export client and configuration types
pub use client::{ClientConfig, HttpClient, ProbeInfo, RateLimiter};
pub use config::ScrapeConfig;

// Re-export error types
pub use error::{ErrorKind, PortraitError, Result};

// Re-export progress events
pub use events::{EVENT_TARGET, EventLevel, EventSink, ProgressEvent, drain};

// Re-export the pipeline stages
pub use downloader::Downloader;
pub use manifest::Manifest;
pub use planner::{QueryPlanner, SessionHandle, spawn_session};
pub use session::{ScrapeSession, ScrapeSummary, SessionState};
pub use validator::Validator;

// Re-export data types
pub use types::{
    DownloadResult, DownloadedImage, ImageCandidate, MAX_IMAGES_LIMIT, Platform, ScrapeRequest,
};

//! Query planner
//!
//! Drives one session from request to summary. Everything runs on a
//! single sequential worker: adapters in declared order, then probes,
//! then downloads. The cancel token is polled before every adapter call,
//! before every probe and inside the download stream.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::adapters::{AdapterKind, AdapterRegistry, SourceAdapter};
use crate::cancel::CancelToken;
use crate::client::{HttpClient, RateLimiter};
use crate::config::ScrapeConfig;
use crate::downloader::Downloader;
use crate::error::{PortraitError, Result};
use crate::events::{EventSink, ProgressEvent};
use crate::manifest::Manifest;
use crate::naming::sanitize_folder_name;
use crate::session::{ScrapeSession, ScrapeSummary, SessionState};
use crate::types::ScrapeRequest;
use crate::validator::Validator;

/// Orchestrates adapters, validation and downloads for a request
pub struct QueryPlanner {
    client: Arc<HttpClient>,
    registry: AdapterRegistry,
    config: ScrapeConfig,
}

impl QueryPlanner {
    /// Planner with the standard adapter line-up
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = Arc::new(HttpClient::with_config(config.client.clone())?);
        let registry = AdapterRegistry::standard(client.clone());
        Ok(Self {
            client,
            registry,
            config,
        })
    }

    /// Replace the adapter line-up
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Shared client, for building adapters that pace with the planner
    pub fn client(&self) -> Arc<HttpClient> {
        self.client.clone()
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Run a session to completion on the current task
    ///
    /// A cancelled session still returns `Ok`, with
    /// `final_state == SessionState::Cancelled` and whatever was saved
    /// before the flag was seen.
    ///
    /// # Errors
    /// - `InvalidRequest` before any network activity
    /// - `Filesystem` if the person folder cannot be created
    pub async fn run(
        &self,
        request: ScrapeRequest,
        cancel: &CancelToken,
        events: &EventSink,
    ) -> Result<ScrapeSummary> {
        let mut session = match ScrapeSession::start(request) {
            Ok(session) => session,
            Err(e) => {
                events.error(e.to_string());
                return Err(e);
            }
        };

        let person_dir = session
            .request()
            .download_folder
            .join(sanitize_folder_name(&session.request().person_name));
        if let Err(e) = tokio::fs::create_dir_all(&person_dir).await {
            let error = PortraitError::filesystem(&person_dir, e);
            events.error(error.to_string());
            return Err(error);
        }

        enter(&mut session, SessionState::Collecting);
        events.info(format!(
            "Starting search for {} (target: {} images)",
            session.request().person_name.trim(),
            session.request().max_images
        ));

        if !self.collect(&mut session, cancel, events).await {
            return Ok(Self::abort(session, events));
        }
        events.info(format!("Collected {} unique candidates", session.candidates().len()));

        enter(&mut session, SessionState::Validating);
        if session.request().validate_before_download
            && !self.validate(&mut session, cancel, events).await
        {
            return Ok(Self::abort(session, events));
        }

        enter(&mut session, SessionState::Downloading);
        if !self.download(&mut session, &person_dir, cancel, events).await {
            return Ok(Self::abort(session, events));
        }

        enter(&mut session, SessionState::Done);
        events.info(format!(
            "Completed: downloaded {} images",
            session.downloaded().len()
        ));

        let manifest = if self.config.write_manifest {
            self.write_manifest(&session, &person_dir, events).await
        } else {
            None
        };

        Ok(session.finish(manifest))
    }

    /// Walk identified adapters, then search adapters; false if cancelled
    async fn collect(
        &self,
        session: &mut ScrapeSession,
        cancel: &CancelToken,
        events: &EventSink,
    ) -> bool {
        let pacing = RateLimiter::with_interval(self.config.adapter_delay);

        let mut calls: Vec<(Arc<dyn SourceAdapter>, String)> = self
            .registry
            .identified()
            .iter()
            .filter_map(|adapter| {
                session
                    .request()
                    .platform_identifiers
                    .get(&adapter.platform())
                    .map(|id| (adapter.clone(), id.clone()))
            })
            .collect();
        let query = session.request().search_query();
        calls.extend(
            self.registry
                .search()
                .iter()
                .map(|adapter| (adapter.clone(), query.clone())),
        );

        for (adapter, input) in calls {
            if cancel.is_cancelled() {
                return false;
            }
            if session.quota_met() {
                debug!("quota met, skipping remaining adapters");
                break;
            }

            pacing.acquire().await;
            if cancel.is_cancelled() {
                return false;
            }

            let label = adapter.label();
            events.info(format!("Searching {}...", label));

            let quota = match adapter.kind() {
                AdapterKind::Profile => 1,
                AdapterKind::Search => session.remaining_quota(),
            };
            let outcome = adapter.fetch(&input, quota).await;
            if let Some(e) = &outcome.failure {
                events.warning(format!("{} unavailable: {}", label, e));
            }

            let mut added = 0;
            for candidate in outcome.candidates {
                if session.accept(candidate) {
                    added += 1;
                }
            }
            if added > 0 {
                events.info(format!("Found {} from {}", added, label));
            } else if outcome.failure.is_none() {
                events.info(format!("No new images from {}", label));
            }
        }

        true
    }

    /// Probe every candidate and drop rejects; false if cancelled
    async fn validate(
        &self,
        session: &mut ScrapeSession,
        cancel: &CancelToken,
        events: &EventSink,
    ) -> bool {
        let validator = Validator::new(self.client.clone(), self.config.min_image_bytes);
        let mut rejected = HashSet::new();

        for candidate in session.candidates() {
            match validator.validate(candidate, cancel).await {
                Ok(()) => {}
                Err(PortraitError::Cancelled) => return false,
                Err(e) => {
                    events.warning(format!(
                        "Skipped {} candidate {}: {}",
                        candidate.source_label, candidate.url, e
                    ));
                    rejected.insert(candidate.url.clone());
                }
            }
        }

        session.retain_candidates(|c| !rejected.contains(&c.url));
        true
    }

    /// Download survivors in discovery order; false if cancelled
    async fn download(
        &self,
        session: &mut ScrapeSession,
        person_dir: &Path,
        cancel: &CancelToken,
        events: &EventSink,
    ) -> bool {
        let downloader = Downloader::new(self.client.clone(), self.config.min_image_bytes);
        let candidates = session.candidates().to_vec();
        let total = candidates.len();

        for (index, candidate) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                return false;
            }
            if !session.has_download_capacity() {
                break;
            }

            events.info(format!(
                "Downloading {}/{} from {}",
                index + 1,
                total,
                candidate.source_label
            ));

            match downloader.download(candidate, person_dir, cancel).await {
                Ok(image) => {
                    let name = image
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    events.success(format!(
                        "Downloaded {} from {}",
                        name, candidate.source_label
                    ));
                    session.record_download(image);
                }
                Err(PortraitError::Cancelled) => return false,
                Err(e) => {
                    events.warning(format!(
                        "Download from {} failed: {}",
                        candidate.source_label, e
                    ));
                    session.record_failure();
                }
            }
        }

        true
    }

    async fn write_manifest(
        &self,
        session: &ScrapeSession,
        person_dir: &Path,
        events: &EventSink,
    ) -> Option<PathBuf> {
        let manifest = Manifest::new(
            session.request().person_name.trim(),
            person_dir,
            session.downloaded().len(),
            session.scraped_urls().to_vec(),
        );

        match manifest.write(person_dir).await {
            Ok(path) => {
                events.info(format!("Results exported to {}", path.display()));
                Some(path)
            }
            Err(e) => {
                events.warning(format!("Could not write manifest: {}", e));
                None
            }
        }
    }

    fn abort(mut session: ScrapeSession, events: &EventSink) -> ScrapeSummary {
        enter(&mut session, SessionState::Cancelled);
        events.warning(format!(
            "Cancelled after {} downloads",
            session.downloaded().len()
        ));
        session.finish(None)
    }
}

/// Advance the session; the planner only ever requests legal transitions
fn enter(session: &mut ScrapeSession, next: SessionState) {
    let moved = session.advance(next);
    debug_assert!(moved, "illegal session transition {} -> {}", session.state(), next);
}

/// A session running on a background task
pub struct SessionHandle {
    cancel: CancelToken,
    events: UnboundedReceiver<ProgressEvent>,
    join: JoinHandle<Result<ScrapeSummary>>,
}

impl SessionHandle {
    /// Token shared with the worker; setting it stops the session
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next progress event, or `None` once the worker has finished
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Wait for the summary, draining no events
    pub async fn wait(self) -> Result<ScrapeSummary> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(PortraitError::Cancelled),
        }
    }
}

/// Run `request` on a tokio task and hand back its controls
pub fn spawn_session(planner: Arc<QueryPlanner>, request: ScrapeRequest) -> SessionHandle {
    let cancel = CancelToken::new();
    let (sink, events) = EventSink::channel();

    let token = cancel.clone();
    let join = tokio::spawn(async move { planner.run(request, &token, &sink).await });

    SessionHandle {
        cancel,
        events,
        join,
    }
}

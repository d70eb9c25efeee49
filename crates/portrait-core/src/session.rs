//! Session state machine
//!
//! A [`ScrapeSession`] lives for exactly one run and is owned by the
//! planner. Adapters never see it; they get an identifier and a quota.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dedup::Deduplicator;
use crate::error::Result;
use crate::types::{DownloadedImage, ImageCandidate, ScrapeRequest};

/// Lifecycle of one run
///
/// `Init → Collecting → Validating → Downloading → Done`, with
/// `Cancelled` reachable from the three working states. Nothing leaves
/// `Done` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    Collecting,
    Validating,
    Downloading,
    Done,
    Cancelled,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Init, Collecting)
                | (Collecting, Validating)
                | (Validating, Downloading)
                | (Downloading, Done)
                | (Collecting | Validating | Downloading, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Cancelled)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::Collecting => "collecting",
            SessionState::Validating => "validating",
            SessionState::Downloading => "downloading",
            SessionState::Done => "done",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Mutable state of a single run
#[derive(Debug)]
pub struct ScrapeSession {
    request: ScrapeRequest,
    state: SessionState,
    candidates: Vec<ImageCandidate>,
    seen: Deduplicator,
    downloaded: Vec<DownloadedImage>,
    failed: usize,
}

impl ScrapeSession {
    /// Open a session for `request`
    ///
    /// # Errors
    /// - `InvalidRequest` if the request fails [`ScrapeRequest::validate`];
    ///   such a session never exists, so it can never reach `Collecting`
    pub fn start(request: ScrapeRequest) -> Result<Self> {
        request.validate()?;
        Ok(Self {
            request,
            state: SessionState::Init,
            candidates: Vec::new(),
            seen: Deduplicator::new(),
            downloaded: Vec::new(),
            failed: 0,
        })
    }

    pub fn request(&self) -> &ScrapeRequest {
        &self.request
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next` if the transition is legal; returns whether it moved
    #[must_use]
    pub fn advance(&mut self, next: SessionState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Test-and-insert a candidate
    ///
    /// Returns `false` for a URL already accepted this run or when the
    /// quota is already met.
    pub fn accept(&mut self, candidate: ImageCandidate) -> bool {
        if self.quota_met() || !self.seen.insert(&candidate.url) {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    /// Number of candidates still needed to reach `max_images`
    pub fn remaining_quota(&self) -> usize {
        (self.request.max_images as usize).saturating_sub(self.candidates.len())
    }

    pub fn quota_met(&self) -> bool {
        self.remaining_quota() == 0
    }

    pub fn candidates(&self) -> &[ImageCandidate] {
        &self.candidates
    }

    /// Every URL accepted this run, in discovery order
    pub fn scraped_urls(&self) -> &[String] {
        self.seen.urls()
    }

    /// Keep only candidates for which `keep` returns true
    pub fn retain_candidates(&mut self, keep: impl FnMut(&ImageCandidate) -> bool) {
        self.candidates.retain(keep);
    }

    pub fn record_download(&mut self, image: DownloadedImage) {
        self.downloaded.push(image);
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn downloaded(&self) -> &[DownloadedImage] {
        &self.downloaded
    }

    /// Whether another download still fits under `max_images`
    pub fn has_download_capacity(&self) -> bool {
        self.downloaded.len() < self.request.max_images as usize
    }

    /// Close the session and produce the terminal summary
    pub fn finish(self, manifest: Option<PathBuf>) -> ScrapeSummary {
        ScrapeSummary {
            person_name: self.request.person_name,
            downloaded: self.downloaded.len(),
            failed: self.failed,
            candidates: self.candidates.len(),
            scraped_urls: self.seen.urls().to_vec(),
            files: self.downloaded,
            final_state: self.state,
            manifest,
        }
    }
}

/// What the caller gets back when a session ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSummary {
    pub person_name: String,
    pub downloaded: usize,
    pub failed: usize,
    /// Deduplicated candidates collected
    pub candidates: usize,
    /// Accepted candidate URLs in discovery order
    pub scraped_urls: Vec<String>,
    pub files: Vec<DownloadedImage>,
    pub final_state: SessionState,
    pub manifest: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortraitError;
    use crate::types::Platform;

    fn request(max: u32) -> ScrapeRequest {
        ScrapeRequest::new("Jane Doe", "/tmp/out").with_max_images(max)
    }

    fn candidate(url: &str) -> ImageCandidate {
        ImageCandidate::new(url, Platform::Bing, "raw_urls")
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = ScrapeSession::start(request(2)).unwrap();
        assert_eq!(session.state(), SessionState::Init);
        assert!(session.advance(SessionState::Collecting));
        assert!(session.advance(SessionState::Validating));
        assert!(session.advance(SessionState::Downloading));
        assert!(session.advance(SessionState::Done));
        assert!(session.state().is_terminal());
    }

    #[test]
    fn test_no_skipping_states() {
        let mut session = ScrapeSession::start(request(2)).unwrap();
        assert!(!session.advance(SessionState::Downloading));
        assert!(!session.advance(SessionState::Cancelled));
        assert_eq!(session.state(), SessionState::Init);
    }

    #[test]
    fn test_cancelled_is_absorbing() {
        let mut session = ScrapeSession::start(request(2)).unwrap();
        assert!(session.advance(SessionState::Collecting));
        assert!(session.advance(SessionState::Cancelled));
        for next in [
            SessionState::Init,
            SessionState::Collecting,
            SessionState::Validating,
            SessionState::Downloading,
            SessionState::Done,
        ] {
            assert!(!session.advance(next));
        }
        assert_eq!(session.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_nothing_leaves_done() {
        assert!(!SessionState::Done.can_transition_to(SessionState::Cancelled));
        assert!(!SessionState::Done.can_transition_to(SessionState::Collecting));
    }

    #[test]
    fn test_invalid_request_never_starts() {
        let err = ScrapeSession::start(request(0)).unwrap_err();
        assert!(matches!(err, PortraitError::InvalidRequest(_)));
        let err = ScrapeSession::start(ScrapeRequest::new("  ", "/tmp")).unwrap_err();
        assert!(matches!(err, PortraitError::InvalidRequest(_)));
    }

    #[test]
    fn test_accept_dedups_and_caps() {
        let mut session = ScrapeSession::start(request(2)).unwrap();
        assert!(session.accept(candidate("https://e.com/a.jpg")));
        assert!(!session.accept(candidate("https://e.com/a.jpg")));
        assert_eq!(session.remaining_quota(), 1);
        assert!(session.accept(candidate("https://e.com/b.jpg")));
        assert!(session.quota_met());
        assert!(!session.accept(candidate("https://e.com/c.jpg")));
        assert_eq!(session.candidates().len(), 2);
    }

    #[test]
    fn test_summary_counts() {
        let mut session = ScrapeSession::start(request(3)).unwrap();
        session.accept(candidate("https://e.com/a.jpg"));
        session.accept(candidate("https://e.com/b.jpg"));
        session.record_failure();
        session.record_download(DownloadedImage {
            path: PathBuf::from("/tmp/out/Jane_Doe/Bing_00000000.jpg"),
            byte_size: 2048,
            source_label: "Bing".to_string(),
        });

        let summary = session.finish(None);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.scraped_urls, vec!["https://e.com/a.jpg", "https://e.com/b.jpg"]);
        assert_eq!(summary.final_state, SessionState::Init);
    }
}

//! Error types for the portrait scraper
//!
//! One enum covers every failure the pipeline can observe. Only a small
//! subset is fatal to a session; see [`PortraitError::is_session_fatal`].

use std::path::PathBuf;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all portrait scraper operations
///
/// Implements Display for human-readable messages and Serialize so the
/// message can be handed to a presentation layer as plain text.
#[derive(Error, Debug)]
pub enum PortraitError {
    /// Request rejected before any network activity
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP request failed (timeout, connection, body read)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server answered with an error status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Rate limited by server (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Markup or JSON did not have the expected shape
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Candidate failed the probe or the post-download size gate
    #[error("Validation rejected: {0}")]
    ValidationRejected(String),

    /// Folder or file could not be created or written
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Session was cancelled by the caller
    #[error("Cancelled")]
    Cancelled,
}

/// Coarse classification of [`PortraitError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    Network,
    Parse,
    ValidationRejected,
    Filesystem,
    Cancelled,
}

impl PortraitError {
    /// Map the error onto its taxonomy bucket
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortraitError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            PortraitError::HttpError(_)
            | PortraitError::HttpStatus { .. }
            | PortraitError::RateLimited => ErrorKind::Network,
            PortraitError::ParseError(_) | PortraitError::InvalidUrl(_) => ErrorKind::Parse,
            PortraitError::ValidationRejected(_) => ErrorKind::ValidationRejected,
            PortraitError::Filesystem { .. } => ErrorKind::Filesystem,
            PortraitError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether the error aborts the whole session rather than one source
    /// or candidate.
    ///
    /// Destination-folder failures are also fatal, but the planner decides
    /// that from context since a per-file write failure has the same shape.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, PortraitError::InvalidRequest(_))
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PortraitError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

impl Serialize for PortraitError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for portrait scraper operations
pub type Result<T> = std::result::Result<T, PortraitError>;

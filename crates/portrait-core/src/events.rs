//! Progress event stream
//!
//! The session worker appends [`ProgressEvent`]s; the caller drains them
//! for display. Every event is mirrored to `tracing` at the matching level
//! under [`EVENT_TARGET`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{error, info, warn};

/// `tracing` target of the event mirror, so front ends can silence it alone
pub const EVENT_TARGET: &str = "portrait::events";

/// Severity of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One line of the progress log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub message: String,
}

/// Write side of the progress stream
///
/// A detached sink only logs; one created with [`EventSink::channel`]
/// also forwards events to the receiver. A dropped receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl EventSink {
    /// Sink that only logs through `tracing`
    pub fn detached() -> Self {
        Self::default()
    }

    /// Sink plus the receiver the caller reads from
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, level: EventLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            EventLevel::Info | EventLevel::Success => info!(target: EVENT_TARGET, "{}", message),
            EventLevel::Warning => warn!(target: EVENT_TARGET, "{}", message),
            EventLevel::Error => error!(target: EVENT_TARGET, "{}", message),
        }

        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent {
                timestamp: Utc::now(),
                level,
                message,
            });
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(EventLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(EventLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(EventLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(EventLevel::Error, message);
    }
}

/// Drain everything currently buffered in `rx`
pub fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

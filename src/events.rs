//! Structured progress events and the best-effort event bus.
//!
//! Every orchestrator and writer reports progress through an [`EventBus`].
//! The bus forwards each event to an optional [`EventSink`] and guarantees
//! that a failing or panicking subscriber can never propagate back into a
//! download worker.
//!
//! Events serialize to the JSON shape consumed by presentation layers:
//!
//! ```text
//! {"event":"page","action":"start","page":"Page-A"}
//! {"event":"file","status":"done","page":"Page-A","name":"cat.jpg","filename":"download/Page-A/000_cat.jpg"}
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Page lifecycle marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageAction {
    /// Page resolved; bucket workers are about to start.
    Start,
    /// All bucket workers for the page have finished.
    End,
}

/// Terminal status of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Fetched and written (and transformed when enabled).
    Done,
    /// Target already existed; nothing fetched.
    Skipped,
    /// File usable but a secondary step failed, or the directory could not be created.
    Warning,
    /// Fetch or write failed; no file at the target path.
    Error,
}

/// Page lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEvent {
    /// Start or end.
    pub action: PageAction,
    /// Page id.
    pub page: String,
}

/// Terminal event for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    /// Outcome.
    pub status: FileStatus,
    /// Page id.
    pub page: String,
    /// Asset display name.
    pub name: String,
    /// Target path.
    pub filename: String,
    /// Error message for `warning` and `error` outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tagged union of everything the engine reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Page lifecycle.
    Page(PageEvent),
    /// Per-asset outcome.
    File(FileEvent),
}

impl ProgressEvent {
    /// Builds a page start/end event.
    pub fn page(action: PageAction, page: impl Into<String>) -> Self {
        Self::Page(PageEvent {
            action,
            page: page.into(),
        })
    }

    /// Serializes to a single JSON line.
    ///
    /// # Errors
    ///
    /// Only fails if serde cannot encode a string, which does not happen for
    /// these types in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<FileEvent> for ProgressEvent {
    fn from(event: FileEvent) -> Self {
        Self::File(event)
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(PageEvent { action, page }) => match action {
                PageAction::Start => write!(f, "[page start] {page}"),
                PageAction::End => write!(f, "[page end] {page}"),
            },
            Self::File(event) => {
                let label = match event.status {
                    FileStatus::Done => "done",
                    FileStatus::Skipped => "skipped",
                    FileStatus::Warning => "warning",
                    FileStatus::Error => "error",
                };
                write!(f, "[{label}] {}", event.filename)?;
                if let Some(error) = &event.error {
                    write!(f, " ({}: {error})", event.name)?;
                }
                Ok(())
            }
        }
    }
}

/// Delivery failure reported by a subscriber.
#[derive(Debug, Error)]
#[error("event delivery failed: {0}")]
pub struct SinkError(pub String);

/// A progress subscriber.
///
/// Implementations are invoked concurrently from every worker and must be
/// cheap; returning an error only drops that one event.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the subscriber could not accept the event.
    fn emit(&self, event: &ProgressEvent) -> Result<(), SinkError>;
}

impl<F> EventSink for F
where
    F: Fn(&ProgressEvent) -> Result<(), SinkError> + Send + Sync,
{
    fn emit(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        self(event)
    }
}

/// Forwards events into an unbounded tokio channel.
///
/// Once the receiver is dropped every emit fails, and the bus discards it.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        self.tx
            .send(event.clone())
            .map_err(|_| SinkError("receiver dropped".to_string()))
    }
}

/// Best-effort, non-blocking dispatch point shared by all workers.
///
/// The bus holds no history and applies no backpressure. With no subscriber
/// attached each event is logged as one human-readable line instead.
#[derive(Clone, Default)]
pub struct EventBus {
    sink: Option<Arc<dyn EventSink>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribed", &self.sink.is_some())
            .finish()
    }
}

impl EventBus {
    /// Bus with a subscriber.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Bus without a subscriber; events are only logged.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Whether a subscriber is attached.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.sink.is_some()
    }

    /// Delivers `event` to the subscriber, swallowing errors and panics.
    pub fn emit(&self, event: impl Into<ProgressEvent>) {
        let event = event.into();
        let Some(sink) = &self.sink else {
            info!("{event}");
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| sink.emit(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "dropping progress event"),
            Err(_) => warn!("progress subscriber panicked; event dropped"),
        }
    }
}

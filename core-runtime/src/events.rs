//! # Event Bus
//!
//! Broadcasts orchestrator events over `tokio::sync::broadcast` so hosts can
//! follow sync progress without polling the ledger.
//!
//! Events are advisory. The sync task ledger is the source of truth; a
//! subscriber that lags and drops events can always re-read it.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ServerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Server(ServerEvent::Added {
//!         server_id: "srv-1".to_string(),
//!         name: "Living room".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Server added");
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Subscribers that fall further behind receive `RecvError::Lagged`
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Sync job lifecycle
    Sync(SyncEvent),
    /// Server registry changes
    Server(ServerEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Server(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Rejected { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) | CoreEvent::Server(_) => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }

    /// Server the event concerns
    pub fn server_id(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.server_id(),
            CoreEvent::Server(e) => e.server_id(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Per-record counters carried by step and job events
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordCounts {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Job accepted into the server's FIFO queue.
    Queued {
        server_id: String,
        /// Job kind (`full-sync`, `recent-items`...)
        job: String,
        /// `manual`, `periodic` or `retry`
        trigger: String,
        /// Jobs ahead of this one, including the running job
        position: usize,
    },
    /// Submission refused.
    Rejected {
        server_id: String,
        job: String,
        reason: String,
    },
    /// Ledger task opened; the job is running.
    Started {
        task_id: String,
        server_id: String,
        job: String,
        sync_type: String,
    },
    /// One domain step finished.
    StepCompleted {
        task_id: String,
        server_id: String,
        /// Domain of the step (`users`, `libraries`, `items`, `activities`)
        step: String,
        counts: RecordCounts,
    },
    /// Job finished; its task closed without error.
    Completed {
        task_id: String,
        server_id: String,
        job: String,
        counts: RecordCounts,
        duration_ms: u64,
    },
    /// Job failed; its task closed with an error code.
    Failed {
        task_id: String,
        server_id: String,
        job: String,
        error_code: String,
        message: String,
        /// Whether a later attempt could succeed
        recoverable: bool,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Queued { .. } => "Sync queued",
            SyncEvent::Rejected { .. } => "Sync rejected",
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::StepCompleted { .. } => "Sync step completed",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Failed { .. } => "Sync failed",
        }
    }

    fn server_id(&self) -> &str {
        match self {
            SyncEvent::Queued { server_id, .. }
            | SyncEvent::Rejected { server_id, .. }
            | SyncEvent::Started { server_id, .. }
            | SyncEvent::StepCompleted { server_id, .. }
            | SyncEvent::Completed { server_id, .. }
            | SyncEvent::Failed { server_id, .. } => server_id,
        }
    }
}

// ============================================================================
// Server Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ServerEvent {
    Added { server_id: String, name: String },
    Updated { server_id: String },
    /// Server and all its mirrored rows deleted
    Removed { server_id: String },
}

impl ServerEvent {
    fn description(&self) -> &str {
        match self {
            ServerEvent::Added { .. } => "Server added",
            ServerEvent::Updated { .. } => "Server updated",
            ServerEvent::Removed { .. } => "Server removed",
        }
    }

    fn server_id(&self) -> &str {
        match self {
            ServerEvent::Added { server_id, .. }
            | ServerEvent::Updated { server_id }
            | ServerEvent::Removed { server_id } => server_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Cheap to clone; all clones share one channel
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fails only when nobody is subscribed; publishers ignore that with `.ok()`
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Past events are not replayed
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

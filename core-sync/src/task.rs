//! # Sync Task Records
//!
//! Types stored in the sync task ledger: one `SyncTask` per admitted job.
//!
//! ## Lifecycle
//!
//! ```text
//! admitted ──> open (completed_at = NULL) ──> closed (completed_at set)
//!                                               ├─ success: error_code NULL
//!                                               └─ failure: error_code + message
//! ```
//!
//! A task is written once when its job is admitted and mutated exactly once
//! when the job finishes. Tasks are never deleted.

use crate::error::{ErrorCode, Result, SyncError};
use core_library::models::{ServerId, UpsertOutcome};
use core_runtime::events::RecordCounts;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncTaskId(Uuid);

impl SyncTaskId {
    /// Create a new random task ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a task ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidTaskId(e.to_string()))?,
        ))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncTaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SyncTaskId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Sync Type
// ============================================================================

/// What a sync task covered, as recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncType {
    Users,
    Libraries,
    Items,
    Activities,
    /// Libraries, users, items and activities in full
    Full,
    RecentItems,
    RecentActivities,
}

impl SyncType {
    /// Ledger types whose success moves the items incremental cursor
    pub const ITEMS_CURSOR_SOURCES: [SyncType; 3] =
        [SyncType::Items, SyncType::Full, SyncType::RecentItems];

    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Users => "users",
            SyncType::Libraries => "libraries",
            SyncType::Items => "items",
            SyncType::Activities => "activities",
            SyncType::Full => "full",
            SyncType::RecentItems => "recent-items",
            SyncType::RecentActivities => "recent-activities",
        }
    }
}

impl FromStr for SyncType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "users" => Ok(SyncType::Users),
            "libraries" => Ok(SyncType::Libraries),
            "items" => Ok(SyncType::Items),
            "activities" => Ok(SyncType::Activities),
            "full" => Ok(SyncType::Full),
            "recent-items" => Ok(SyncType::RecentItems),
            "recent-activities" => Ok(SyncType::RecentActivities),
            _ => Err(SyncError::InvalidSyncType(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Outcome of one domain worker run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStats {
    /// Records returned by the external server, including malformed ones
    pub fetched: u64,
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    /// Records that could not be mapped to the local shape
    pub skipped: u64,
}

impl DomainStats {
    /// Count one upsert
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.added += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Count one record that could not be mapped
    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    /// Rows written (inserted or modified)
    pub fn changed(&self) -> u64 {
        self.added + self.updated
    }
}

/// Counters persisted on a sync task, summed over the job's steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTaskStats {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped: u64,
}

impl SyncTaskStats {
    pub fn absorb(&mut self, step: &DomainStats) {
        self.added += step.added;
        self.updated += step.updated;
        self.unchanged += step.unchanged;
        self.skipped += step.skipped;
    }

    pub fn counts(&self) -> RecordCounts {
        RecordCounts {
            added: self.added,
            updated: self.updated,
            unchanged: self.unchanged,
            skipped: self.skipped,
        }
    }
}

impl From<&DomainStats> for SyncTaskStats {
    fn from(stats: &DomainStats) -> Self {
        let mut total = SyncTaskStats::default();
        total.absorb(stats);
        total
    }
}

// ============================================================================
// Sync Task
// ============================================================================

/// Ledger record of one job execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTask {
    pub id: SyncTaskId,
    pub server_id: ServerId,
    pub sync_type: SyncType,
    pub started_at: i64,
    /// `None` while running (or if the process died mid-job)
    pub completed_at: Option<i64>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub stats: SyncTaskStats,
}

impl SyncTask {
    /// Open task as written on admission
    pub fn open(server_id: ServerId, sync_type: SyncType, started_at: i64) -> Self {
        Self {
            id: SyncTaskId::new(),
            server_id,
            sync_type,
            started_at,
            completed_at: None,
            error_code: None,
            error_message: None,
            stats: SyncTaskStats::default(),
        }
    }

    /// Still holding the server's ledger slot
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }

    /// Closed without error
    pub fn is_success(&self) -> bool {
        self.completed_at.is_some() && self.error_code.is_none()
    }

    /// Seconds between start and completion
    pub fn duration_secs(&self) -> Option<i64> {
        self.completed_at.map(|end| (end - self.started_at).max(0))
    }
}

/// Terminal state written when a job finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    pub completed_at: i64,
    pub error: Option<(ErrorCode, String)>,
    pub stats: SyncTaskStats,
}

impl TaskCompletion {
    pub fn success(completed_at: i64, stats: SyncTaskStats) -> Self {
        Self {
            completed_at,
            error: None,
            stats,
        }
    }

    pub fn failure(completed_at: i64, error: &SyncError, stats: SyncTaskStats) -> Self {
        Self {
            completed_at,
            error: Some((error.code(), error.to_string())),
            stats,
        }
    }
}

//! Domain models for the local mirror
//!
//! This module contains the server registry model and the four mirrored
//! domains (users, libraries, items, activity entries), with validation and
//! database mapping.

use bridge_traits::media_server::ServerConnection;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::error::{LibraryError, Result};

// =============================================================================
// ID Types
// =============================================================================

/// Stable identifier of an external server
///
/// Generated as a UUID by default, but operators may pick a readable slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ServerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// =============================================================================
// Server
// =============================================================================

/// External media server registered for mirroring
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Server {
    /// Stable identifier, never changes across syncs
    pub id: ServerId,
    /// Display name
    pub name: String,
    /// Address reachable from the orchestrator's network
    pub internal_url: Option<String>,
    /// Public address, used when no internal address is configured
    pub external_url: Option<String>,
    /// Access credential
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Set while a removal is in progress
    pub removing: bool,
    /// When registered
    pub created_at: i64,
    /// Last connection update
    pub updated_at: i64,
}

impl Server {
    /// Create a new server record with a generated id
    pub fn new(
        name: impl Into<String>,
        internal_url: Option<String>,
        external_url: Option<String>,
        api_key: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: ServerId::new(),
            name: name.into(),
            internal_url: normalize_url(internal_url),
            external_url: normalize_url(external_url),
            api_key: api_key.into(),
            removing: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the generated id with a caller-chosen one
    pub fn with_id(mut self, id: impl Into<ServerId>) -> Self {
        self.id = id.into();
        self
    }

    /// Validate server data
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(invalid("id", "Server id cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name", "Server name cannot be empty"));
        }
        if self.internal_url.is_none() && self.external_url.is_none() {
            return Err(invalid(
                "url",
                "At least one of internal_url or external_url is required",
            ));
        }
        for url in [&self.internal_url, &self.external_url].into_iter().flatten() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid("url", &format!("Unsupported URL scheme: {}", url)));
            }
        }
        if self.api_key.trim().is_empty() {
            return Err(invalid("api_key", "API key cannot be empty"));
        }
        Ok(())
    }

    /// URL used for server-to-server calls: internal first, external otherwise
    pub fn base_url(&self) -> Option<&str> {
        self.internal_url
            .as_deref()
            .or(self.external_url.as_deref())
    }

    /// Resolve connection details for a sync job
    pub fn connection(&self) -> Result<ServerConnection> {
        let base_url = self.base_url().ok_or_else(|| {
            invalid("url", &format!("Server {} has no usable URL", self.id))
        })?;

        Ok(ServerConnection::new(
            self.id.as_str(),
            base_url,
            self.api_key.clone(),
        ))
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("internal_url", &self.internal_url)
            .field("external_url", &self.external_url)
            .field("api_key", &"[REDACTED]")
            .field("removing", &self.removing)
            .finish()
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
}

fn invalid(field: &str, message: &str) -> LibraryError {
    LibraryError::InvalidInput {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// =============================================================================
// Upsert Bookkeeping
// =============================================================================

/// What an idempotent upsert did to the row keyed by (server, external id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    /// Row did not exist and was created
    Inserted,
    /// Row existed and at least one column changed
    Updated,
    /// Row existed with identical content; nothing was written
    Unchanged,
}

impl UpsertOutcome {
    pub(crate) fn classify(existed: bool, rows_affected: u64) -> Self {
        match (existed, rows_affected) {
            (false, _) => UpsertOutcome::Inserted,
            (true, 0) => UpsertOutcome::Unchanged,
            (true, _) => UpsertOutcome::Updated,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// User mirrored from an external server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub server_id: ServerId,
    pub external_id: String,
    pub name: String,
    pub is_administrator: bool,
    pub last_login_at: Option<i64>,
    pub last_activity_at: Option<i64>,
    pub synced_at: i64,
}

/// Upsert payload for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub external_id: String,
    pub name: String,
    pub is_administrator: bool,
    pub last_login_at: Option<i64>,
    pub last_activity_at: Option<i64>,
}

// =============================================================================
// Libraries
// =============================================================================

/// Library folder mirrored from an external server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Library {
    pub id: i64,
    pub server_id: ServerId,
    pub external_id: String,
    pub name: String,
    pub collection_type: Option<String>,
    pub synced_at: i64,
}

/// Upsert payload for a library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRecord {
    pub external_id: String,
    pub name: String,
    pub collection_type: Option<String>,
}

// =============================================================================
// Items
// =============================================================================

/// Media item mirrored from an external server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub server_id: ServerId,
    pub external_id: String,
    pub name: String,
    pub item_type: Option<String>,
    pub parent_external_id: Option<String>,
    /// Creation time on the external server
    pub date_created: Option<i64>,
    /// Duration in 100ns ticks
    pub run_time_ticks: Option<i64>,
    pub production_year: Option<i32>,
    pub synced_at: i64,
}

/// Upsert payload for an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub external_id: String,
    pub name: String,
    pub item_type: Option<String>,
    pub parent_external_id: Option<String>,
    pub date_created: Option<i64>,
    pub run_time_ticks: Option<i64>,
    pub production_year: Option<i32>,
}

// =============================================================================
// Activity
// =============================================================================

/// Activity log entry mirrored from an external server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ActivityEntry {
    pub id: i64,
    pub server_id: ServerId,
    pub external_id: String,
    pub name: String,
    pub overview: Option<String>,
    pub activity_type: Option<String>,
    pub item_external_id: Option<String>,
    pub user_external_id: Option<String>,
    pub severity: Option<String>,
    /// When the activity happened on the external server
    pub date: i64,
    pub synced_at: i64,
}

/// Upsert payload for an activity entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub external_id: String,
    pub name: String,
    pub overview: Option<String>,
    pub activity_type: Option<String>,
    pub item_external_id: Option<String>,
    pub user_external_id: Option<String>,
    pub severity: Option<String>,
    pub date: i64,
}

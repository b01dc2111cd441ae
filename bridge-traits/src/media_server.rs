//! Media Server API Abstraction
//!
//! Read-only view of an external media server as consumed by the sync
//! orchestrator: paginated listings of users, library folders, items and
//! activity log entries.
//!
//! ## Overview
//!
//! Every listing call takes the [`ServerConnection`] resolved once per job and
//! a [`ListRequest`] describing the page window. Implementations return a
//! [`RemotePage`] whose records have already been decoded individually: a
//! record that does not decode is counted in `malformed` instead of failing the
//! whole page.
//!
//! ```ignore
//! use bridge_traits::media_server::{ListRequest, MediaServerApi, SortOrder};
//!
//! let mut request = Some(ListRequest::first(100, SortOrder::Ascending));
//! while let Some(current) = request {
//!     let page = api.list_items(&connection, current).await?;
//!     // upsert page.records ...
//!     request = page.next_request(&current);
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

// ============================================================================
// Connection
// ============================================================================

/// Connection details for one external server.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConnection {
    /// Local identifier of the server (used for logging only)
    pub server_id: String,
    /// Base URL without a trailing slash
    pub base_url: String,
    /// Access credential sent with every request
    pub api_key: String,
}

impl ServerConnection {
    pub fn new(
        server_id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            server_id: server_id.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for ServerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConnection")
            .field("server_id", &self.server_id)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Sort direction for listings that support it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "Ascending",
            SortOrder::Descending => "Descending",
        }
    }
}

/// Window of a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    pub start_index: u32,
    pub limit: u32,
    pub order: SortOrder,
}

impl ListRequest {
    /// Request for the first page
    pub fn first(limit: u32, order: SortOrder) -> Self {
        Self {
            start_index: 0,
            limit,
            order,
        }
    }
}

/// One page of a remote listing
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage<T> {
    /// Records that decoded successfully, in the order returned by the server
    pub records: Vec<T>,
    /// Records present in the payload that could not be decoded
    pub malformed: u64,
    /// Total number of records reported by the server, when known
    pub total: Option<u64>,
}

impl<T> RemotePage<T> {
    /// A page that holds every record of an unpaginated listing
    pub fn complete(records: Vec<T>) -> Self {
        let total = records.len() as u64;
        Self {
            records,
            malformed: 0,
            total: Some(total),
        }
    }

    /// Number of entries the server returned, decodable or not
    pub fn returned(&self) -> u64 {
        self.records.len() as u64 + self.malformed
    }

    /// Request for the following page, or `None` when the listing is exhausted.
    ///
    /// An empty page always terminates pagination, even if the reported total
    /// suggests otherwise.
    pub fn next_request(&self, current: &ListRequest) -> Option<ListRequest> {
        let returned = self.returned();
        if returned == 0 {
            return None;
        }

        let consumed = current.start_index as u64 + returned;
        match self.total {
            Some(total) if consumed < total => Some(ListRequest {
                start_index: consumed as u32,
                ..*current
            }),
            _ => None,
        }
    }
}

// ============================================================================
// Remote Records
// ============================================================================

/// User account as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    pub name: Option<String>,
    pub is_administrator: bool,
    /// Unix timestamp (seconds)
    pub last_login_at: Option<i64>,
    /// Unix timestamp (seconds)
    pub last_activity_at: Option<i64>,
}

/// Top-level library folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLibrary {
    pub id: String,
    pub name: Option<String>,
    pub collection_type: Option<String>,
}

/// Media item (movie, episode, track, folder...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    pub name: Option<String>,
    pub item_type: Option<String>,
    pub parent_id: Option<String>,
    /// Unix timestamp (seconds)
    pub date_created: Option<i64>,
    pub run_time_ticks: Option<i64>,
    pub production_year: Option<i32>,
}

/// Activity log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteActivity {
    pub id: String,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub activity_type: Option<String>,
    pub item_id: Option<String>,
    pub user_id: Option<String>,
    pub severity: Option<String>,
    /// Unix timestamp (seconds)
    pub date: Option<i64>,
}

// ============================================================================
// Trait
// ============================================================================

/// Read-only access to an external media server
///
/// Implementations never mutate the remote server. Errors must be classified
/// through [`BridgeError`](crate::error::BridgeError): transport failures as
/// `Timeout`/`Connection`, non-success statuses as `Unauthorized`,
/// `NotFound` or `Http`.
#[async_trait]
pub trait MediaServerApi: Send + Sync {
    /// List user accounts
    async fn list_users(
        &self,
        connection: &ServerConnection,
        request: ListRequest,
    ) -> Result<RemotePage<RemoteUser>>;

    /// List top-level library folders
    async fn list_libraries(
        &self,
        connection: &ServerConnection,
        request: ListRequest,
    ) -> Result<RemotePage<RemoteLibrary>>;

    /// List media items ordered by creation date in `request.order`
    async fn list_items(
        &self,
        connection: &ServerConnection,
        request: ListRequest,
    ) -> Result<RemotePage<RemoteItem>>;

    /// List activity log entries, newest first
    async fn list_activities(
        &self,
        connection: &ServerConnection,
        request: ListRequest,
    ) -> Result<RemotePage<RemoteActivity>>;
}

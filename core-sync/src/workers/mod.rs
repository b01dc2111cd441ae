//! # Domain Sync Workers
//!
//! One worker per mirrored domain. Each pages through the external listing,
//! maps every record to the local shape and upserts it by
//! (server id, external id).
//!
//! ## Modes
//!
//! - `sync_full`: every page, in API order, until the server reports no more.
//! - `sync_recent` (items, activities): pages sorted newest first; stops once a
//!   page reaches records older than the cursor.
//!
//! Records that cannot be mapped are skipped and counted, never fatal.
//! External failures go through the job's [`RetryPolicy`] and end the worker
//! with a classified [`SyncError`](crate::SyncError).

pub mod activities;
pub mod items;
pub mod libraries;
pub mod users;

pub use activities::ActivitiesWorker;
pub use items::ItemsWorker;
pub use libraries::LibrariesWorker;
pub use users::UsersWorker;

use crate::retry::RetryPolicy;
use crate::task::SyncTaskId;
use bridge_traits::media_server::{MediaServerApi, ServerConnection};
use core_library::models::ServerId;
use std::sync::Arc;

/// Everything a worker needs for one job, resolved once when the job starts
#[derive(Clone)]
pub struct SyncContext {
    pub server_id: ServerId,
    pub connection: ServerConnection,
    pub task_id: SyncTaskId,
    pub api: Arc<dyn MediaServerApi>,
    pub retry: RetryPolicy,
    pub page_size: u32,
    /// Timestamp stamped on every row written by the job
    pub synced_at: i64,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("server_id", &self.server_id)
            .field("connection", &self.connection)
            .field("task_id", &self.task_id)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Name is required by every domain; blank counts as missing
pub(crate) fn required_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Whether a page sorted newest first has reached records older than `since`
pub(crate) fn page_reaches_before<I>(dates: I, since: i64) -> bool
where
    I: IntoIterator<Item = Option<i64>>,
{
    dates.into_iter().flatten().min().is_some_and(|oldest| oldest < since)
}

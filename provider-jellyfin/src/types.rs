//! Jellyfin API response types
//!
//! Data structures for deserializing Jellyfin (and Emby-compatible) REST
//! responses. Field names follow the server's PascalCase convention.

use serde::{Deserialize, Serialize};

/// Generic paginated envelope returned by list endpoints
///
/// Records are kept as raw JSON so that each one can be decoded on its own;
/// a single malformed entry must not poison the page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResult {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,

    /// Total number of records matching the query
    #[serde(default)]
    pub total_record_count: Option<u64>,

    /// Offset of the first record in this page
    #[serde(default)]
    pub start_index: Option<u64>,
}

/// `UserDto`
///
/// See: https://api.jellyfin.org/#tag/User
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JellyfinUser {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub policy: Option<UserPolicy>,

    /// ISO 8601 timestamp
    #[serde(default)]
    pub last_login_date: Option<String>,

    /// ISO 8601 timestamp
    #[serde(default)]
    pub last_activity_date: Option<String>,
}

/// Subset of `UserPolicy` the mirror cares about
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPolicy {
    #[serde(default)]
    pub is_administrator: bool,
}

/// `BaseItemDto`, used for both library folders and media items
///
/// See: https://api.jellyfin.org/#tag/Items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItem {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Item kind (`Movie`, `Episode`, `Audio`, `CollectionFolder`...)
    #[serde(rename = "Type", default)]
    pub item_type: Option<String>,

    #[serde(default)]
    pub parent_id: Option<String>,

    /// Library content type (`movies`, `tvshows`, `music`...), folders only
    #[serde(default)]
    pub collection_type: Option<String>,

    /// ISO 8601 timestamp
    #[serde(default)]
    pub date_created: Option<String>,

    #[serde(default)]
    pub run_time_ticks: Option<i64>,

    #[serde(default)]
    pub production_year: Option<i32>,
}

/// Activity log ids are numeric on Jellyfin and strings on some forks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryId::Number(n) => write!(f, "{}", n),
            EntryId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// `ActivityLogEntry`
///
/// See: https://api.jellyfin.org/#tag/ActivityLog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivityLogEntry {
    pub id: EntryId,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub overview: Option<String>,

    #[serde(default)]
    pub short_overview: Option<String>,

    #[serde(rename = "Type", default)]
    pub entry_type: Option<String>,

    #[serde(default)]
    pub item_id: Option<String>,

    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub severity: Option<String>,

    /// ISO 8601 timestamp
    #[serde(default)]
    pub date: Option<String>,
}

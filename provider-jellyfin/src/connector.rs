//! Jellyfin API connector implementation
//!
//! Implements the `MediaServerApi` trait for Jellyfin 10.8+ (and Emby servers
//! exposing the same read endpoints).

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media_server::{
    ListRequest, MediaServerApi, RemoteActivity, RemoteItem, RemoteLibrary, RemotePage,
    RemoteUser, ServerConnection,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::JellyfinError;
use crate::types::{ActivityLogEntry, BaseItem, JellyfinUser, QueryResult};

/// Header carrying the server API key
const AUTH_HEADER: &str = "X-Emby-Token";

/// Fields requested for item listings
const ITEM_FIELDS: &str = "DateCreated,ParentId,ProductionYear";

/// Default per-request timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Jellyfin API connector
///
/// Implements `MediaServerApi` on top of an injected `HttpClient`.
///
/// # Features
///
/// - API-key authentication via the `X-Emby-Token` header
/// - Paginated item and activity listings (`StartIndex`/`Limit`)
/// - Per-record decoding: malformed entries are counted, not fatal
/// - Status classification (401/403 unauthorized, 404 not found, others by code)
///
/// Retrying is left to the caller; each method performs a single request.
///
/// # Example
///
/// ```ignore
/// use provider_jellyfin::JellyfinConnector;
/// use bridge_traits::media_server::{ListRequest, MediaServerApi, SortOrder};
///
/// let connector = JellyfinConnector::new(http_client);
/// let page = connector
///     .list_items(&connection, ListRequest::first(100, SortOrder::Ascending))
///     .await?;
/// ```
pub struct JellyfinConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Timeout applied to every request
    request_timeout: Duration,
}

impl JellyfinConnector {
    /// Create a new connector with the default request timeout
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build an absolute URL for `path` with encoded query parameters
    fn build_url(connection: &ServerConnection, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", connection.base_url, path);

        for (index, (key, value)) in query.iter().enumerate() {
            url.push(if index == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        url
    }

    /// Parse an ISO 8601 timestamp to Unix seconds.
    ///
    /// Jellyfin emits seven fractional digits and sometimes omits the offset;
    /// offset-less values are taken as UTC.
    fn parse_timestamp(value: &str) -> Option<i64> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc).timestamp());
        }

        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc().timestamp())
    }

    /// Execute a GET and classify the response status
    #[instrument(skip(self, connection, url), fields(server_id = %connection.server_id))]
    async fn get(
        &self,
        connection: &ServerConnection,
        path: &str,
        url: String,
    ) -> std::result::Result<HttpResponse, JellyfinError> {
        let request = HttpRequest::get(url)
            .header(AUTH_HEADER, connection.api_key.clone())
            .header("Accept", "application/json")
            .timeout(self.request_timeout);

        let response = self.http_client.execute(request).await?;
        let status = response.status;

        if response.is_success() {
            debug!(status, "API request succeeded");
            return Ok(response);
        }

        let message = response.body_snippet(200);
        warn!(status, "API request failed");

        match status {
            401 | 403 => Err(JellyfinError::AuthenticationFailed {
                status_code: status,
                message,
            }),
            404 => Err(JellyfinError::NotFound {
                path: path.to_string(),
            }),
            _ => Err(JellyfinError::ApiError {
                status_code: status,
                message,
            }),
        }
    }

    /// Decode each raw record on its own, counting the ones that fail
    fn decode_records<T, R, F>(path: &str, raw: Vec<serde_json::Value>, convert: F) -> (Vec<R>, u64)
    where
        T: DeserializeOwned,
        F: Fn(T) -> R,
    {
        let mut records = Vec::with_capacity(raw.len());
        let mut malformed = 0u64;

        for value in raw {
            match serde_json::from_value::<T>(value) {
                Ok(record) => records.push(convert(record)),
                Err(e) => {
                    malformed += 1;
                    warn!(path, error = %e, "Skipping malformed record");
                }
            }
        }

        (records, malformed)
    }

    /// Fetch and decode a `QueryResult` page
    async fn query_page<T, R, F>(
        &self,
        connection: &ServerConnection,
        path: &str,
        query: &[(&str, String)],
        convert: F,
    ) -> std::result::Result<RemotePage<R>, JellyfinError>
    where
        T: DeserializeOwned,
        F: Fn(T) -> R,
    {
        let url = Self::build_url(connection, path, query);
        let response = self.get(connection, path, url).await?;

        let envelope: QueryResult = serde_json::from_slice(&response.body).map_err(|e| {
            JellyfinError::ParseError(format!("Failed to parse {} response: {}", path, e))
        })?;

        let (records, malformed) = Self::decode_records::<T, R, F>(path, envelope.items, convert);

        Ok(RemotePage {
            records,
            malformed,
            total: envelope.total_record_count,
        })
    }

    fn convert_user(user: JellyfinUser) -> RemoteUser {
        RemoteUser {
            id: user.id,
            name: user.name,
            is_administrator: user.policy.map(|p| p.is_administrator).unwrap_or(false),
            last_login_at: user.last_login_date.as_deref().and_then(Self::parse_timestamp),
            last_activity_at: user
                .last_activity_date
                .as_deref()
                .and_then(Self::parse_timestamp),
        }
    }

    fn convert_library(item: BaseItem) -> RemoteLibrary {
        RemoteLibrary {
            id: item.id,
            name: item.name,
            collection_type: item.collection_type,
        }
    }

    fn convert_item(item: BaseItem) -> RemoteItem {
        RemoteItem {
            id: item.id,
            name: item.name,
            item_type: item.item_type,
            parent_id: item.parent_id,
            date_created: item.date_created.as_deref().and_then(Self::parse_timestamp),
            run_time_ticks: item.run_time_ticks,
            production_year: item.production_year,
        }
    }

    fn convert_activity(entry: ActivityLogEntry) -> RemoteActivity {
        RemoteActivity {
            id: entry.id.to_string(),
            name: entry.name,
            overview: entry.overview.or(entry.short_overview),
            activity_type: entry.entry_type,
            item_id: entry.item_id,
            user_id: entry.user_id,
            severity: entry.severity,
            date: entry.date.as_deref().and_then(Self::parse_timestamp),
        }
    }
}

#[async_trait]
impl MediaServerApi for JellyfinConnector {
    #[instrument(skip(self, connection), fields(server_id = %connection.server_id))]
    async fn list_users(
        &self,
        connection: &ServerConnection,
        _request: ListRequest,
    ) -> Result<RemotePage<RemoteUser>> {
        const PATH: &str = "/Users";

        let url = Self::build_url(connection, PATH, &[]);
        let response = self.get(connection, PATH, url).await?;

        // `/Users` is an unpaginated JSON array
        let raw: Vec<serde_json::Value> = serde_json::from_slice(&response.body).map_err(|e| {
            JellyfinError::ParseError(format!("Failed to parse {} response: {}", PATH, e))
        })?;

        let (records, malformed) = Self::decode_records(PATH, raw, Self::convert_user);
        let total = records.len() as u64 + malformed;

        debug!(count = records.len(), malformed, "Listed users");

        Ok(RemotePage {
            records,
            malformed,
            total: Some(total),
        })
    }

    #[instrument(skip(self, connection), fields(server_id = %connection.server_id))]
    async fn list_libraries(
        &self,
        connection: &ServerConnection,
        _request: ListRequest,
    ) -> Result<RemotePage<RemoteLibrary>> {
        let mut page = self
            .query_page(connection, "/Library/MediaFolders", &[], Self::convert_library)
            .await?;

        // Media folders come back in one response even when the total is omitted
        page.total = Some(page.returned());

        debug!(count = page.records.len(), "Listed libraries");
        Ok(page)
    }

    #[instrument(skip(self, connection), fields(server_id = %connection.server_id, start = request.start_index))]
    async fn list_items(
        &self,
        connection: &ServerConnection,
        request: ListRequest,
    ) -> Result<RemotePage<RemoteItem>> {
        let query = [
            ("Recursive", "true".to_string()),
            ("StartIndex", request.start_index.to_string()),
            ("Limit", request.limit.to_string()),
            ("SortBy", "DateCreated".to_string()),
            ("SortOrder", request.order.as_str().to_string()),
            ("Fields", ITEM_FIELDS.to_string()),
            ("EnableImages", "false".to_string()),
            ("EnableUserData", "false".to_string()),
        ];

        let page = self
            .query_page(connection, "/Items", &query, Self::convert_item)
            .await?;

        debug!(
            count = page.records.len(),
            malformed = page.malformed,
            total = ?page.total,
            "Listed items"
        );
        Ok(page)
    }

    #[instrument(skip(self, connection), fields(server_id = %connection.server_id, start = request.start_index))]
    async fn list_activities(
        &self,
        connection: &ServerConnection,
        request: ListRequest,
    ) -> Result<RemotePage<RemoteActivity>> {
        // The activity log is always served newest first; `request.order` is ignored.
        let query = [
            ("startIndex", request.start_index.to_string()),
            ("limit", request.limit.to_string()),
        ];

        let page = self
            .query_page(
                connection,
                "/System/ActivityLog/Entries",
                &query,
                Self::convert_activity,
            )
            .await?;

        debug!(
            count = page.records.len(),
            malformed = page.malformed,
            total = ?page.total,
            "Listed activity entries"
        );
        Ok(page)
    }
}

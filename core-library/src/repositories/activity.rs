//! Activity log repository trait and implementation

use crate::error::Result;
use crate::models::{ActivityEntry, ActivityRecord, ServerId, UpsertOutcome};
use crate::repositories::{count_mirrored_rows, mirrored_row_exists, Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Mirrored activity log entries of external servers
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Insert or refresh an entry keyed by (server, external id)
    async fn upsert(
        &self,
        server_id: &ServerId,
        record: &ActivityRecord,
        synced_at: i64,
    ) -> Result<UpsertOutcome>;

    /// Query a server's activity, newest first
    async fn query_by_server(
        &self,
        server_id: &ServerId,
        page_request: PageRequest,
    ) -> Result<Page<ActivityEntry>>;

    /// Count entries mirrored for a server
    async fn count_by_server(&self, server_id: &ServerId) -> Result<i64>;

    /// Date of the newest mirrored entry; the activities incremental cursor
    async fn latest_date(&self, server_id: &ServerId) -> Result<Option<i64>>;
}

/// SQLite implementation of ActivityRepository
pub struct SqliteActivityRepository {
    pool: SqlitePool,
}

impl SqliteActivityRepository {
    /// Create a new SQLite activity repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for SqliteActivityRepository {
    async fn upsert(
        &self,
        server_id: &ServerId,
        record: &ActivityRecord,
        synced_at: i64,
    ) -> Result<UpsertOutcome> {
        let existed =
            mirrored_row_exists(&self.pool, "activities", server_id, &record.external_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO activities (
                server_id, external_id, name, overview, activity_type,
                item_external_id, user_external_id, severity, date, synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(server_id, external_id) DO UPDATE SET
                name = excluded.name,
                overview = excluded.overview,
                activity_type = excluded.activity_type,
                item_external_id = excluded.item_external_id,
                user_external_id = excluded.user_external_id,
                severity = excluded.severity,
                date = excluded.date,
                synced_at = excluded.synced_at
            WHERE activities.name IS NOT excluded.name
               OR activities.overview IS NOT excluded.overview
               OR activities.activity_type IS NOT excluded.activity_type
               OR activities.item_external_id IS NOT excluded.item_external_id
               OR activities.user_external_id IS NOT excluded.user_external_id
               OR activities.severity IS NOT excluded.severity
               OR activities.date IS NOT excluded.date
            "#,
        )
        .bind(server_id.as_str())
        .bind(&record.external_id)
        .bind(&record.name)
        .bind(&record.overview)
        .bind(&record.activity_type)
        .bind(&record.item_external_id)
        .bind(&record.user_external_id)
        .bind(&record.severity)
        .bind(record.date)
        .bind(synced_at)
        .execute(&self.pool)
        .await?;

        Ok(UpsertOutcome::classify(existed, result.rows_affected()))
    }

    async fn query_by_server(
        &self,
        server_id: &ServerId,
        page_request: PageRequest,
    ) -> Result<Page<ActivityEntry>> {
        let total = self.count_by_server(server_id).await?;

        let entries = query_as::<_, ActivityEntry>(
            r#"
            SELECT * FROM activities
            WHERE server_id = ?
            ORDER BY date DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(server_id.as_str())
        .bind(page_request.limit() as i64)
        .bind(page_request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(entries, total as u64, page_request))
    }

    async fn count_by_server(&self, server_id: &ServerId) -> Result<i64> {
        count_mirrored_rows(&self.pool, "activities", server_id).await
    }

    async fn latest_date(&self, server_id: &ServerId) -> Result<Option<i64>> {
        let latest: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(date) FROM activities WHERE server_id = ?")
                .bind(server_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(latest.0)
    }
}

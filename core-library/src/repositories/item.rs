//! Item repository trait and implementation

use crate::error::Result;
use crate::models::{Item, ItemRecord, ServerId, UpsertOutcome};
use crate::repositories::{count_mirrored_rows, mirrored_row_exists, Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Mirrored media items of external servers
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Insert or refresh an item keyed by (server, external id)
    async fn upsert(
        &self,
        server_id: &ServerId,
        record: &ItemRecord,
        synced_at: i64,
    ) -> Result<UpsertOutcome>;

    /// Find an item by its external id on a server
    async fn find_by_external_id(
        &self,
        server_id: &ServerId,
        external_id: &str,
    ) -> Result<Option<Item>>;

    /// Query a server's items, newest first
    async fn query_by_server(
        &self,
        server_id: &ServerId,
        page_request: PageRequest,
    ) -> Result<Page<Item>>;

    /// Count items mirrored for a server
    async fn count_by_server(&self, server_id: &ServerId) -> Result<i64>;

    /// Creation time of the newest mirrored item, if any
    async fn latest_date_created(&self, server_id: &ServerId) -> Result<Option<i64>>;
}

/// SQLite implementation of ItemRepository
pub struct SqliteItemRepository {
    pool: SqlitePool,
}

impl SqliteItemRepository {
    /// Create a new SQLite item repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn upsert(
        &self,
        server_id: &ServerId,
        record: &ItemRecord,
        synced_at: i64,
    ) -> Result<UpsertOutcome> {
        let existed =
            mirrored_row_exists(&self.pool, "items", server_id, &record.external_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO items (
                server_id, external_id, name, item_type, parent_external_id,
                date_created, run_time_ticks, production_year, synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(server_id, external_id) DO UPDATE SET
                name = excluded.name,
                item_type = excluded.item_type,
                parent_external_id = excluded.parent_external_id,
                date_created = excluded.date_created,
                run_time_ticks = excluded.run_time_ticks,
                production_year = excluded.production_year,
                synced_at = excluded.synced_at
            WHERE items.name IS NOT excluded.name
               OR items.item_type IS NOT excluded.item_type
               OR items.parent_external_id IS NOT excluded.parent_external_id
               OR items.date_created IS NOT excluded.date_created
               OR items.run_time_ticks IS NOT excluded.run_time_ticks
               OR items.production_year IS NOT excluded.production_year
            "#,
        )
        .bind(server_id.as_str())
        .bind(&record.external_id)
        .bind(&record.name)
        .bind(&record.item_type)
        .bind(&record.parent_external_id)
        .bind(record.date_created)
        .bind(record.run_time_ticks)
        .bind(record.production_year)
        .bind(synced_at)
        .execute(&self.pool)
        .await?;

        Ok(UpsertOutcome::classify(existed, result.rows_affected()))
    }

    async fn find_by_external_id(
        &self,
        server_id: &ServerId,
        external_id: &str,
    ) -> Result<Option<Item>> {
        let item = query_as::<_, Item>(
            "SELECT * FROM items WHERE server_id = ? AND external_id = ?",
        )
        .bind(server_id.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn query_by_server(
        &self,
        server_id: &ServerId,
        page_request: PageRequest,
    ) -> Result<Page<Item>> {
        let total = self.count_by_server(server_id).await?;

        let items = query_as::<_, Item>(
            r#"
            SELECT * FROM items
            WHERE server_id = ?
            ORDER BY date_created DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(server_id.as_str())
        .bind(page_request.limit() as i64)
        .bind(page_request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total as u64, page_request))
    }

    async fn count_by_server(&self, server_id: &ServerId) -> Result<i64> {
        count_mirrored_rows(&self.pool, "items", server_id).await
    }

    async fn latest_date_created(&self, server_id: &ServerId) -> Result<Option<i64>> {
        let latest: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(date_created) FROM items WHERE server_id = ?")
                .bind(server_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(latest.0)
    }
}

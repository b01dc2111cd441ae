//! User repository trait and implementation

use crate::error::Result;
use crate::models::{ServerId, UpsertOutcome, User, UserRecord};
use crate::repositories::{count_mirrored_rows, mirrored_row_exists, Page, PageRequest};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Mirrored users of external servers
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert or refresh a user keyed by (server, external id)
    async fn upsert(
        &self,
        server_id: &ServerId,
        record: &UserRecord,
        synced_at: i64,
    ) -> Result<UpsertOutcome>;

    /// Find a user by its external id on a server
    async fn find_by_external_id(
        &self,
        server_id: &ServerId,
        external_id: &str,
    ) -> Result<Option<User>>;

    /// Query a server's users ordered by name
    async fn query_by_server(
        &self,
        server_id: &ServerId,
        page_request: PageRequest,
    ) -> Result<Page<User>>;

    /// Count users mirrored for a server
    async fn count_by_server(&self, server_id: &ServerId) -> Result<i64>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new SQLite user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn upsert(
        &self,
        server_id: &ServerId,
        record: &UserRecord,
        synced_at: i64,
    ) -> Result<UpsertOutcome> {
        let existed =
            mirrored_row_exists(&self.pool, "users", server_id, &record.external_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                server_id, external_id, name, is_administrator,
                last_login_at, last_activity_at, synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(server_id, external_id) DO UPDATE SET
                name = excluded.name,
                is_administrator = excluded.is_administrator,
                last_login_at = excluded.last_login_at,
                last_activity_at = excluded.last_activity_at,
                synced_at = excluded.synced_at
            WHERE users.name IS NOT excluded.name
               OR users.is_administrator IS NOT excluded.is_administrator
               OR users.last_login_at IS NOT excluded.last_login_at
               OR users.last_activity_at IS NOT excluded.last_activity_at
            "#,
        )
        .bind(server_id.as_str())
        .bind(&record.external_id)
        .bind(&record.name)
        .bind(record.is_administrator)
        .bind(record.last_login_at)
        .bind(record.last_activity_at)
        .bind(synced_at)
        .execute(&self.pool)
        .await?;

        Ok(UpsertOutcome::classify(existed, result.rows_affected()))
    }

    async fn find_by_external_id(
        &self,
        server_id: &ServerId,
        external_id: &str,
    ) -> Result<Option<User>> {
        let user = query_as::<_, User>(
            "SELECT * FROM users WHERE server_id = ? AND external_id = ?",
        )
        .bind(server_id.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn query_by_server(
        &self,
        server_id: &ServerId,
        page_request: PageRequest,
    ) -> Result<Page<User>> {
        let total = self.count_by_server(server_id).await?;

        let users = query_as::<_, User>(
            "SELECT * FROM users WHERE server_id = ? ORDER BY name, id LIMIT ? OFFSET ?",
        )
        .bind(server_id.as_str())
        .bind(page_request.limit() as i64)
        .bind(page_request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(users, total as u64, page_request))
    }

    async fn count_by_server(&self, server_id: &ServerId) -> Result<i64> {
        count_mirrored_rows(&self.pool, "users", server_id).await
    }
}

//! Library repository trait and implementation

use crate::error::Result;
use crate::models::{Library, LibraryRecord, ServerId, UpsertOutcome};
use crate::repositories::{count_mirrored_rows, mirrored_row_exists};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Mirrored library folders of external servers
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    /// Insert or refresh a library keyed by (server, external id)
    async fn upsert(
        &self,
        server_id: &ServerId,
        record: &LibraryRecord,
        synced_at: i64,
    ) -> Result<UpsertOutcome>;

    /// All libraries of a server ordered by name
    async fn list_by_server(&self, server_id: &ServerId) -> Result<Vec<Library>>;

    /// Count libraries mirrored for a server
    async fn count_by_server(&self, server_id: &ServerId) -> Result<i64>;
}

/// SQLite implementation of LibraryRepository
pub struct SqliteLibraryRepository {
    pool: SqlitePool,
}

impl SqliteLibraryRepository {
    /// Create a new SQLite library repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibraryRepository for SqliteLibraryRepository {
    async fn upsert(
        &self,
        server_id: &ServerId,
        record: &LibraryRecord,
        synced_at: i64,
    ) -> Result<UpsertOutcome> {
        let existed =
            mirrored_row_exists(&self.pool, "libraries", server_id, &record.external_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO libraries (server_id, external_id, name, collection_type, synced_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(server_id, external_id) DO UPDATE SET
                name = excluded.name,
                collection_type = excluded.collection_type,
                synced_at = excluded.synced_at
            WHERE libraries.name IS NOT excluded.name
               OR libraries.collection_type IS NOT excluded.collection_type
            "#,
        )
        .bind(server_id.as_str())
        .bind(&record.external_id)
        .bind(&record.name)
        .bind(&record.collection_type)
        .bind(synced_at)
        .execute(&self.pool)
        .await?;

        Ok(UpsertOutcome::classify(existed, result.rows_affected()))
    }

    async fn list_by_server(&self, server_id: &ServerId) -> Result<Vec<Library>> {
        let libraries = query_as::<_, Library>(
            "SELECT * FROM libraries WHERE server_id = ? ORDER BY name, id",
        )
        .bind(server_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(libraries)
    }

    async fn count_by_server(&self, server_id: &ServerId) -> Result<i64> {
        count_mirrored_rows(&self.pool, "libraries", server_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, insert_test_server};

    fn movies() -> LibraryRecord {
        LibraryRecord {
            external_id: "lib-movies".to_string(),
            name: "Movies".to_string(),
            collection_type: Some("movies".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upsert_outcomes() {
        let pool = create_test_pool().await.unwrap();
        insert_test_server(&pool, "srv-1").await.unwrap();
        let repo = SqliteLibraryRepository::new(pool);
        let server = ServerId::from("srv-1");

        assert_eq!(repo.upsert(&server, &movies(), 1).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(repo.upsert(&server, &movies(), 2).await.unwrap(), UpsertOutcome::Unchanged);

        let mut renamed = movies();
        renamed.name = "Films".to_string();
        assert_eq!(repo.upsert(&server, &renamed, 3).await.unwrap(), UpsertOutcome::Updated);

        let libraries = repo.list_by_server(&server).await.unwrap();
        assert_eq!(libraries.len(), 1);
        assert_eq!(libraries[0].name, "Films");
    }

    #[tokio::test]
    async fn test_null_collection_type_is_stable() {
        let pool = create_test_pool().await.unwrap();
        insert_test_server(&pool, "srv-1").await.unwrap();
        let repo = SqliteLibraryRepository::new(pool);
        let server = ServerId::from("srv-1");

        let mut mixed = movies();
        mixed.collection_type = None;
        repo.upsert(&server, &mixed, 1).await.unwrap();

        assert_eq!(repo.upsert(&server, &mixed, 2).await.unwrap(), UpsertOutcome::Unchanged);
        assert_eq!(repo.count_by_server(&server).await.unwrap(), 1);
    }
}

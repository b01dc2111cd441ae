//! Server registry repository

use crate::error::{LibraryError, Result};
use crate::models::{Server, ServerId};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Registry of external servers being mirrored
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Find a server by its ID
    async fn find_by_id(&self, id: &ServerId) -> Result<Option<Server>>;

    /// Register a new server
    ///
    /// # Errors
    /// Returns error if:
    /// - A server with the same ID already exists
    /// - Server validation fails
    async fn insert(&self, server: &Server) -> Result<()>;

    /// Replace name, URLs and credential of an existing server
    ///
    /// # Errors
    /// Returns `NotFound` if the server does not exist.
    async fn update_connection(&self, server: &Server) -> Result<()>;

    /// Flag a server as being removed
    ///
    /// # Returns
    /// - `Ok(true)` if the flag was set
    /// - `Ok(false)` if the server was not found
    async fn mark_removing(&self, id: &ServerId, now: i64) -> Result<bool>;

    /// Delete a server and, through cascading keys, all its mirrored rows
    ///
    /// # Returns
    /// - `Ok(true)` if the server was deleted
    /// - `Ok(false)` if the server was not found
    async fn delete(&self, id: &ServerId) -> Result<bool>;

    /// All registered servers, oldest first
    async fn list(&self) -> Result<Vec<Server>>;

    /// Servers eligible for periodic sync (not being removed)
    async fn list_active(&self) -> Result<Vec<Server>>;
}

/// SQLite implementation of ServerRepository
pub struct SqliteServerRepository {
    pool: SqlitePool,
}

impl SqliteServerRepository {
    /// Create a new SQLite server repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServerRepository for SqliteServerRepository {
    async fn find_by_id(&self, id: &ServerId) -> Result<Option<Server>> {
        let server = query_as::<_, Server>("SELECT * FROM servers WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(server)
    }

    async fn insert(&self, server: &Server) -> Result<()> {
        server.validate()?;

        sqlx::query(
            r#"
            INSERT INTO servers (
                id, name, internal_url, external_url, api_key, removing, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(server.id.as_str())
        .bind(&server.name)
        .bind(&server.internal_url)
        .bind(&server.external_url)
        .bind(&server.api_key)
        .bind(server.removing)
        .bind(server.created_at)
        .bind(server.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_connection(&self, server: &Server) -> Result<()> {
        server.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE servers
            SET name = ?, internal_url = ?, external_url = ?, api_key = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&server.name)
        .bind(&server.internal_url)
        .bind(&server.external_url)
        .bind(&server.api_key)
        .bind(server.updated_at)
        .bind(server.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::ServerNotFound(server.id.to_string()));
        }

        Ok(())
    }

    async fn mark_removing(&self, id: &ServerId, now: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE servers SET removing = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &ServerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM servers WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Server>> {
        let servers = query_as::<_, Server>("SELECT * FROM servers ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        Ok(servers)
    }

    async fn list_active(&self) -> Result<Vec<Server>> {
        let servers = query_as::<_, Server>(
            "SELECT * FROM servers WHERE removing = 0 ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(servers)
    }
}

//! # Sync Task Ledger
//!
//! Durable record of every admitted job, and the source of truth for
//! "is this server syncing" and "when did it last complete".
//!
//! ## Overview
//!
//! The ledger slot of a server is its single open task (`completed_at IS NULL`).
//! [`SyncTaskLedger::try_begin`] claims the slot with one conditional insert,
//! so the check and the write cannot be separated by another admission, even
//! from a second process sharing the database. A partial unique index on
//! `sync_tasks(server_id) WHERE completed_at IS NULL` backs the same rule at
//! the schema level.
//!
//! ## Leases
//!
//! An open task carries `lease_expires_at`. The runner holding it renews the
//! lease while the job runs, so a task whose lease lapsed belongs to a runner
//! that is gone (crashed process, lost close). Only such tasks are reclaimed
//! by [`SyncTaskLedger::recover_abandoned`]; live tasks of this or any other
//! process sharing the database are left alone.

use crate::error::{ErrorCode, Result, SyncError};
use crate::task::{SyncTask, SyncTaskId, SyncTaskStats, SyncType, TaskCompletion};
use async_trait::async_trait;
use core_library::models::ServerId;
use core_runtime::config::DEFAULT_TASK_LEASE;
use sqlx::{FromRow, SqlitePool};
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait SyncTaskLedger: Send + Sync {
    /// Open a task for `server_id` if the server holds no open task
    ///
    /// The new task's lease runs from `started_at`.
    ///
    /// # Returns
    /// - `Ok(Some(task))` if the slot was free and is now held by `task`
    /// - `Ok(None)` if another task is still open for the server
    async fn try_begin(
        &self,
        server_id: &ServerId,
        sync_type: SyncType,
        started_at: i64,
    ) -> Result<Option<SyncTask>>;

    /// Close an open task
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for an unknown id and `TaskAlreadyFinished`
    /// if the task was closed before.
    async fn finish(&self, task_id: &SyncTaskId, completion: &TaskCompletion) -> Result<SyncTask>;

    /// Extend the lease of an open task to `now` plus the lease length
    ///
    /// Returns `false` if the task is no longer open.
    async fn renew(&self, task_id: &SyncTaskId, now: i64) -> Result<bool>;

    async fn find_by_id(&self, task_id: &SyncTaskId) -> Result<Option<SyncTask>>;

    /// The task currently holding the server's slot
    async fn find_open(&self, server_id: &ServerId) -> Result<Option<SyncTask>>;

    /// Most recent task of one of `sync_types` that closed without error
    async fn last_successful(
        &self,
        server_id: &ServerId,
        sync_types: &[SyncType],
    ) -> Result<Option<SyncTask>>;

    /// Tasks for a server, most recent first
    async fn history(&self, server_id: &ServerId, limit: u32) -> Result<Vec<SyncTask>>;

    /// Close open tasks whose lease lapsed before `now` as `interrupted`
    async fn recover_abandoned(&self, now: i64) -> Result<u64>;
}

/// SQLite implementation of SyncTaskLedger
pub struct SqliteSyncTaskLedger {
    pool: SqlitePool,
    lease_secs: i64,
}

impl SqliteSyncTaskLedger {
    /// Create a ledger with the default task lease
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            lease_secs: DEFAULT_TASK_LEASE.as_secs() as i64,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease_secs = lease.as_secs().max(1) as i64;
        self
    }
}

/// Database row representation of a sync task
#[derive(Debug, FromRow)]
struct SyncTaskRow {
    id: String,
    server_id: String,
    sync_type: String,
    started_at: i64,
    completed_at: Option<i64>,
    error_code: Option<String>,
    error_message: Option<String>,
    records_added: i64,
    records_updated: i64,
    records_unchanged: i64,
    records_skipped: i64,
}

impl TryFrom<SyncTaskRow> for SyncTask {
    type Error = SyncError;

    fn try_from(row: SyncTaskRow) -> Result<Self> {
        let error_code = row
            .error_code
            .as_deref()
            .map(str::parse::<ErrorCode>)
            .transpose()?;

        Ok(SyncTask {
            id: SyncTaskId::from_string(&row.id)?,
            server_id: ServerId::from(row.server_id),
            sync_type: row.sync_type.parse()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_code,
            error_message: row.error_message,
            stats: SyncTaskStats {
                added: row.records_added.max(0) as u64,
                updated: row.records_updated.max(0) as u64,
                unchanged: row.records_unchanged.max(0) as u64,
                skipped: row.records_skipped.max(0) as u64,
            },
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, server_id, sync_type, started_at, completed_at, error_code, error_message,
           records_added, records_updated, records_unchanged, records_skipped
    FROM sync_tasks
"#;

#[async_trait]
impl SyncTaskLedger for SqliteSyncTaskLedger {
    async fn try_begin(
        &self,
        server_id: &ServerId,
        sync_type: SyncType,
        started_at: i64,
    ) -> Result<Option<SyncTask>> {
        let task = SyncTask::open(server_id.clone(), sync_type, started_at);

        let result = sqlx::query(
            r#"
            INSERT INTO sync_tasks (id, server_id, sync_type, started_at, lease_expires_at)
            SELECT ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM sync_tasks WHERE server_id = ? AND completed_at IS NULL
            )
            "#,
        )
        .bind(task.id.as_str())
        .bind(server_id.as_str())
        .bind(sync_type.as_str())
        .bind(started_at)
        .bind(started_at + self.lease_secs)
        .bind(server_id.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => {
                debug!(server_id = %server_id, task_id = %task.id, sync_type = %sync_type, "Ledger slot claimed");
                Ok(Some(task))
            }
            Ok(_) => Ok(None),
            // Lost a race against a writer on another connection
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(SyncError::Database(e.to_string())),
        }
    }

    async fn finish(&self, task_id: &SyncTaskId, completion: &TaskCompletion) -> Result<SyncTask> {
        let (error_code, error_message) = match &completion.error {
            Some((code, message)) => (Some(code.as_str()), Some(message.as_str())),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE sync_tasks SET
                completed_at = ?,
                error_code = ?,
                error_message = ?,
                records_added = ?,
                records_updated = ?,
                records_unchanged = ?,
                records_skipped = ?
            WHERE id = ? AND completed_at IS NULL
            "#,
        )
        .bind(completion.completed_at)
        .bind(error_code)
        .bind(error_message)
        .bind(completion.stats.added as i64)
        .bind(completion.stats.updated as i64)
        .bind(completion.stats.unchanged as i64)
        .bind(completion.stats.skipped as i64)
        .bind(task_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        let task = self.find_by_id(task_id).await?;
        match task {
            Some(task) if result.rows_affected() == 1 => Ok(task),
            Some(_) => Err(SyncError::TaskAlreadyFinished {
                task_id: task_id.to_string(),
            }),
            None => Err(SyncError::TaskNotFound {
                task_id: task_id.to_string(),
            }),
        }
    }

    async fn renew(&self, task_id: &SyncTaskId, now: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sync_tasks SET lease_expires_at = ? WHERE id = ? AND completed_at IS NULL",
        )
        .bind(now + self.lease_secs)
        .bind(task_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, task_id: &SyncTaskId) -> Result<Option<SyncTask>> {
        let row = sqlx::query_as::<_, SyncTaskRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(task_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        row.map(SyncTask::try_from).transpose()
    }

    async fn find_open(&self, server_id: &ServerId) -> Result<Option<SyncTask>> {
        let row = sqlx::query_as::<_, SyncTaskRow>(&format!(
            "{} WHERE server_id = ? AND completed_at IS NULL",
            SELECT_COLUMNS
        ))
        .bind(server_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        row.map(SyncTask::try_from).transpose()
    }

    async fn last_successful(
        &self,
        server_id: &ServerId,
        sync_types: &[SyncType],
    ) -> Result<Option<SyncTask>> {
        if sync_types.is_empty() {
            return Ok(None);
        }

        let placeholders = vec!["?"; sync_types.len()].join(", ");
        let sql = format!(
            r#"{}
            WHERE server_id = ?
              AND completed_at IS NOT NULL
              AND error_code IS NULL
              AND sync_type IN ({})
            ORDER BY started_at DESC, rowid DESC
            LIMIT 1"#,
            SELECT_COLUMNS, placeholders
        );

        let mut query = sqlx::query_as::<_, SyncTaskRow>(&sql).bind(server_id.as_str());
        for sync_type in sync_types {
            query = query.bind(sync_type.as_str());
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        row.map(SyncTask::try_from).transpose()
    }

    async fn history(&self, server_id: &ServerId, limit: u32) -> Result<Vec<SyncTask>> {
        let rows = sqlx::query_as::<_, SyncTaskRow>(&format!(
            "{} WHERE server_id = ? ORDER BY started_at DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(server_id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        rows.into_iter().map(SyncTask::try_from).collect()
    }

    async fn recover_abandoned(&self, now: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sync_tasks SET
                completed_at = MAX(?, started_at),
                error_code = ?,
                error_message = 'Task lease expired before the job closed it'
            WHERE completed_at IS NULL
              AND COALESCE(lease_expires_at, started_at) < ?
            "#,
        )
        .bind(now)
        .bind(ErrorCode::Interrupted.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        let recovered = result.rows_affected();
        if recovered > 0 {
            warn!(count = recovered, "Closed sync tasks whose lease expired");
        }

        Ok(recovered)
    }
}

//! # Repository Pattern Implementation
//!
//! Repository traits and SQLite implementations for the server registry and
//! the four mirrored domains.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - Domain upserts are keyed by (server id, external id) and report an
//!   [`UpsertOutcome`](crate::models::UpsertOutcome); a row whose content is
//!   unchanged is not written
//! - Read queries are paginated via the `Page<T>` wrapper
//!
//! ## Available Repositories
//!
//! - `ServerRepository` - Registered external servers
//! - `UserRepository` - Mirrored users
//! - `LibraryRepository` - Mirrored library folders
//! - `ItemRepository` - Mirrored media items
//! - `ActivityRepository` - Mirrored activity log entries

pub mod activity;
pub mod item;
pub mod library;
pub mod pagination;
pub mod server;
pub mod user;

pub use activity::{ActivityRepository, SqliteActivityRepository};
pub use item::{ItemRepository, SqliteItemRepository};
pub use library::{LibraryRepository, SqliteLibraryRepository};
pub use pagination::{Page, PageRequest};
pub use server::{ServerRepository, SqliteServerRepository};
pub use user::{SqliteUserRepository, UserRepository};

use crate::error::Result;
use crate::models::ServerId;
use sqlx::SqlitePool;

/// Whether a mirrored row already exists for (server, external id)
///
/// `table` is always one of the crate's own table names, never user input.
pub(crate) async fn mirrored_row_exists(
    pool: &SqlitePool,
    table: &str,
    server_id: &ServerId,
    external_id: &str,
) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE server_id = ? AND external_id = ?)",
        table
    );
    let exists: (bool,) = sqlx::query_as(&sql)
        .bind(server_id.as_str())
        .bind(external_id)
        .fetch_one(pool)
        .await?;

    Ok(exists.0)
}

/// Row count of a mirrored table for one server
pub(crate) async fn count_mirrored_rows(
    pool: &SqlitePool,
    table: &str,
    server_id: &ServerId,
) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE server_id = ?", table);
    let count: (i64,) = sqlx::query_as(&sql)
        .bind(server_id.as_str())
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

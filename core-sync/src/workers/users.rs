use super::{required_name, SyncContext};
use crate::error::Result;
use crate::task::DomainStats;
use bridge_traits::media_server::{ListRequest, RemoteUser, SortOrder};
use core_library::models::UserRecord;
use core_library::repositories::UserRepository;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Mirrors the user list of a server
pub struct UsersWorker {
    repository: Arc<dyn UserRepository>,
}

impl UsersWorker {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, ctx), fields(server_id = %ctx.server_id, task_id = %ctx.task_id))]
    pub async fn sync_full(&self, ctx: &SyncContext) -> Result<DomainStats> {
        let mut stats = DomainStats::default();
        let mut request = Some(ListRequest::first(ctx.page_size, SortOrder::Ascending));

        while let Some(current) = request {
            let page = ctx
                .retry
                .run("list_users", || ctx.api.list_users(&ctx.connection, current))
                .await?;
            request = page.next_request(&current);

            stats.fetched += page.returned();
            stats.skipped += page.malformed;

            for remote in &page.records {
                let Some(record) = to_record(remote) else {
                    warn!(external_id = %remote.id, "Skipping user without a name");
                    stats.skipped += 1;
                    continue;
                };

                let outcome = self
                    .repository
                    .upsert(&ctx.server_id, &record, ctx.synced_at)
                    .await?;
                stats.record(outcome);
            }
        }

        info!(
            fetched = stats.fetched,
            added = stats.added,
            updated = stats.updated,
            skipped = stats.skipped,
            "Users synced"
        );
        Ok(stats)
    }
}

fn to_record(remote: &RemoteUser) -> Option<UserRecord> {
    if remote.id.trim().is_empty() {
        return None;
    }

    Some(UserRecord {
        external_id: remote.id.clone(),
        name: required_name(remote.name.as_deref())?,
        is_administrator: remote.is_administrator,
        last_login_at: remote.last_login_at,
        last_activity_at: remote.last_activity_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::test_support::{context, StaticServer};
    use crate::SyncError;
    use core_library::db::{create_test_pool, insert_test_server};
    use core_library::models::ServerId;
    use core_library::repositories::SqliteUserRepository;

    fn user(id: &str, name: Option<&str>) -> RemoteUser {
        RemoteUser {
            id: id.to_string(),
            name: name.map(str::to_string),
            is_administrator: false,
            last_login_at: Some(1_699_000_000),
            last_activity_at: None,
        }
    }

    async fn setup() -> (UsersWorker, Arc<SqliteUserRepository>) {
        let pool = create_test_pool().await.unwrap();
        insert_test_server(&pool, "srv-1").await.unwrap();
        let repository = Arc::new(SqliteUserRepository::new(pool));
        (UsersWorker::new(repository.clone()), repository)
    }

    #[tokio::test]
    async fn test_sync_full_upserts_and_skips() {
        let (worker, repository) = setup().await;
        let api = Arc::new(StaticServer {
            users: vec![user("u1", Some("alice")), user("u2", None), user("u3", Some("bob"))],
            ..Default::default()
        });
        let ctx = context(api, "srv-1");

        let stats = worker.sync_full(&ctx).await.unwrap();
        assert_eq!(stats.fetched, 3);
        assert_eq!(stats.added, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(repository.count_by_server(&ServerId::from("srv-1")).await.unwrap(), 2);

        let again = worker.sync_full(&ctx).await.unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.unchanged, 2);
        assert_eq!(again.changed(), 0);
    }

    #[tokio::test]
    async fn test_sync_full_empty_listing_succeeds() {
        let (worker, _) = setup().await;
        let ctx = context(Arc::new(StaticServer::default()), "srv-1");

        let stats = worker.sync_full(&ctx).await.unwrap();
        assert_eq!(stats, DomainStats::default());
    }

    #[tokio::test]
    async fn test_sync_full_unauthorized() {
        let (worker, _) = setup().await;
        let api = Arc::new(StaticServer {
            fail_with_status: Some(401),
            ..Default::default()
        });
        let ctx = context(api, "srv-1");

        let result = worker.sync_full(&ctx).await;
        assert!(matches!(result, Err(SyncError::Unauthorized(_))));
    }
}

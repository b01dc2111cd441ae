use super::{page_reaches_before, required_name, SyncContext};
use crate::error::Result;
use crate::task::DomainStats;
use bridge_traits::media_server::{ListRequest, RemoteActivity, RemotePage, SortOrder};
use core_library::models::{ActivityRecord, ServerId};
use core_library::repositories::ActivityRepository;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Mirrors the activity log of a server
///
/// The log is served newest first in both modes. An entry without a date or a
/// name cannot be stored and is skipped.
pub struct ActivitiesWorker {
    repository: Arc<dyn ActivityRepository>,
}

impl ActivitiesWorker {
    pub fn new(repository: Arc<dyn ActivityRepository>) -> Self {
        Self { repository }
    }

    /// Newest activity date already mirrored for the server
    pub async fn local_cursor(&self, server_id: &ServerId) -> Result<Option<i64>> {
        Ok(self.repository.latest_date(server_id).await?)
    }

    #[instrument(skip(self, ctx), fields(server_id = %ctx.server_id, task_id = %ctx.task_id))]
    pub async fn sync_full(&self, ctx: &SyncContext) -> Result<DomainStats> {
        let stats = self.scan(ctx, None).await?;
        info!(
            fetched = stats.fetched,
            added = stats.added,
            updated = stats.updated,
            skipped = stats.skipped,
            "Activities synced"
        );
        Ok(stats)
    }

    #[instrument(skip(self, ctx), fields(server_id = %ctx.server_id, task_id = %ctx.task_id))]
    pub async fn sync_recent(&self, ctx: &SyncContext, since: i64) -> Result<DomainStats> {
        let stats = self.scan(ctx, Some(since)).await?;
        info!(
            since,
            fetched = stats.fetched,
            added = stats.added,
            skipped = stats.skipped,
            "Recent activities synced"
        );
        Ok(stats)
    }

    async fn scan(&self, ctx: &SyncContext, since: Option<i64>) -> Result<DomainStats> {
        let mut stats = DomainStats::default();
        let mut request = Some(ListRequest::first(ctx.page_size, SortOrder::Descending));

        while let Some(current) = request {
            let page = self.fetch(ctx, current).await?;
            request = page.next_request(&current);

            stats.fetched += page.returned();
            stats.skipped += page.malformed;

            for remote in &page.records {
                let Some(record) = to_record(remote) else {
                    warn!(external_id = %remote.id, "Skipping activity without a name or date");
                    stats.skip();
                    continue;
                };

                if since.is_some_and(|cursor| record.date < cursor) {
                    continue;
                }

                let outcome = self
                    .repository
                    .upsert(&ctx.server_id, &record, ctx.synced_at)
                    .await?;
                stats.record(outcome);
            }

            if let Some(cursor) = since {
                if page_reaches_before(page.records.iter().map(|a| a.date), cursor) {
                    debug!(start_index = current.start_index, "Reached activities older than cursor");
                    break;
                }
            }
        }

        Ok(stats)
    }

    async fn fetch(
        &self,
        ctx: &SyncContext,
        request: ListRequest,
    ) -> Result<RemotePage<RemoteActivity>> {
        ctx.retry
            .run("list_activities", || {
                ctx.api.list_activities(&ctx.connection, request)
            })
            .await
    }
}

fn to_record(remote: &RemoteActivity) -> Option<ActivityRecord> {
    if remote.id.trim().is_empty() {
        return None;
    }

    Some(ActivityRecord {
        external_id: remote.id.clone(),
        name: required_name(remote.name.as_deref())?,
        overview: remote.overview.clone(),
        activity_type: remote.activity_type.clone(),
        item_external_id: remote.item_id.clone(),
        user_external_id: remote.user_id.clone(),
        severity: remote.severity.clone(),
        date: remote.date?,
    })
}

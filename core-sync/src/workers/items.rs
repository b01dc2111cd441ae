use super::{page_reaches_before, required_name, SyncContext};
use crate::error::Result;
use crate::task::DomainStats;
use bridge_traits::media_server::{ListRequest, RemoteItem, RemotePage, SortOrder};
use core_library::models::{ItemRecord, ServerId};
use core_library::repositories::ItemRepository;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Mirrors the recursive item listing of a server
///
/// Full mode walks the listing oldest first. Recent mode walks it newest
/// first by `DateCreated` and stops at the first page that reaches items
/// created before the cursor. Items without a creation date cannot be placed
/// relative to the cursor: they are upserted in both modes and never stop a
/// recent scan.
pub struct ItemsWorker {
    repository: Arc<dyn ItemRepository>,
}

impl ItemsWorker {
    pub fn new(repository: Arc<dyn ItemRepository>) -> Self {
        Self { repository }
    }

    /// Whether no item of the server is mirrored yet
    pub async fn is_empty(&self, server_id: &ServerId) -> Result<bool> {
        Ok(self.repository.count_by_server(server_id).await? == 0)
    }

    #[instrument(skip(self, ctx), fields(server_id = %ctx.server_id, task_id = %ctx.task_id))]
    pub async fn sync_full(&self, ctx: &SyncContext) -> Result<DomainStats> {
        let mut stats = DomainStats::default();
        let mut request = Some(ListRequest::first(ctx.page_size, SortOrder::Ascending));

        while let Some(current) = request {
            let page = self.fetch(ctx, current).await?;
            request = page.next_request(&current);

            stats.fetched += page.returned();
            stats.skipped += page.malformed;
            for remote in &page.records {
                self.apply(ctx, remote, &mut stats).await?;
            }
        }

        info!(
            fetched = stats.fetched,
            added = stats.added,
            updated = stats.updated,
            skipped = stats.skipped,
            "Items synced"
        );
        Ok(stats)
    }

    #[instrument(skip(self, ctx), fields(server_id = %ctx.server_id, task_id = %ctx.task_id))]
    pub async fn sync_recent(&self, ctx: &SyncContext, since: i64) -> Result<DomainStats> {
        let mut stats = DomainStats::default();
        let mut request = Some(ListRequest::first(ctx.page_size, SortOrder::Descending));
        let mut ignored = 0u64;

        while let Some(current) = request {
            let page = self.fetch(ctx, current).await?;
            request = page.next_request(&current);

            stats.fetched += page.returned();
            stats.skipped += page.malformed;
            for remote in &page.records {
                match remote.date_created {
                    Some(created) if created < since => ignored += 1,
                    _ => self.apply(ctx, remote, &mut stats).await?,
                }
            }

            if page_reaches_before(page.records.iter().map(|i| i.date_created), since) {
                debug!(start_index = current.start_index, "Reached items older than cursor");
                break;
            }
        }

        info!(
            since,
            fetched = stats.fetched,
            added = stats.added,
            updated = stats.updated,
            skipped = stats.skipped,
            ignored,
            "Recent items synced"
        );
        Ok(stats)
    }

    async fn fetch(&self, ctx: &SyncContext, request: ListRequest) -> Result<RemotePage<RemoteItem>> {
        ctx.retry
            .run("list_items", || ctx.api.list_items(&ctx.connection, request))
            .await
    }

    async fn apply(&self, ctx: &SyncContext, remote: &RemoteItem, stats: &mut DomainStats) -> Result<()> {
        let Some(record) = to_record(remote) else {
            warn!(external_id = %remote.id, "Skipping item without a name");
            stats.skip();
            return Ok(());
        };

        let outcome = self
            .repository
            .upsert(&ctx.server_id, &record, ctx.synced_at)
            .await?;
        stats.record(outcome);
        Ok(())
    }
}

fn to_record(remote: &RemoteItem) -> Option<ItemRecord> {
    if remote.id.trim().is_empty() {
        return None;
    }

    Some(ItemRecord {
        external_id: remote.id.clone(),
        name: required_name(remote.name.as_deref())?,
        item_type: remote.item_type.clone(),
        parent_external_id: remote.parent_id.clone(),
        date_created: remote.date_created,
        run_time_ticks: remote.run_time_ticks,
        production_year: remote.production_year,
    })
}

use super::{required_name, SyncContext};
use crate::error::Result;
use crate::task::DomainStats;
use bridge_traits::media_server::{ListRequest, RemoteLibrary, SortOrder};
use core_library::models::LibraryRecord;
use core_library::repositories::LibraryRepository;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Mirrors the top-level library folders of a server
pub struct LibrariesWorker {
    repository: Arc<dyn LibraryRepository>,
}

impl LibrariesWorker {
    pub fn new(repository: Arc<dyn LibraryRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, ctx), fields(server_id = %ctx.server_id, task_id = %ctx.task_id))]
    pub async fn sync_full(&self, ctx: &SyncContext) -> Result<DomainStats> {
        let mut stats = DomainStats::default();
        let mut request = Some(ListRequest::first(ctx.page_size, SortOrder::Ascending));

        while let Some(current) = request {
            let page = ctx
                .retry
                .run("list_libraries", || {
                    ctx.api.list_libraries(&ctx.connection, current)
                })
                .await?;
            request = page.next_request(&current);

            stats.fetched += page.returned();
            stats.skipped += page.malformed;

            for remote in &page.records {
                let Some(record) = to_record(remote) else {
                    warn!(external_id = %remote.id, "Skipping library without a name");
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
            "Libraries synced"
        );
        Ok(stats)
    }
}

fn to_record(remote: &RemoteLibrary) -> Option<LibraryRecord> {
    if remote.id.trim().is_empty() {
        return None;
    }

    Some(LibraryRecord {
        external_id: remote.id.clone(),
        name: required_name(remote.name.as_deref())?,
        collection_type: remote.collection_type.clone(),
    })
}

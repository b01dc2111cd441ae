//! # Sync Orchestrator
//!
//! Composition root of the sync core: wires the ledger, the domain workers,
//! the job runner, the sequencer and the scheduler over one database pool and
//! one media server API.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{JobKind, SyncOrchestrator, SyncSettings};
//!
//! let orchestrator = SyncOrchestrator::new(
//!     pool,
//!     Arc::new(JellyfinConnector::new(http_client)),
//!     SyncSettings::from(&config),
//!     event_bus,
//!     Arc::new(SystemClock),
//! );
//! orchestrator.start().await?;
//!
//! orchestrator.submit(&server_id, JobKind::FullSync).await?;
//! orchestrator.wait_idle().await;
//! orchestrator.shutdown().await;
//! ```

use crate::error::Result;
use crate::jobs::{Job, JobExecutor, JobKind, JobRunner, RunnerSettings, Trigger, Workers};
use crate::ledger::{SqliteSyncTaskLedger, SyncTaskLedger};
use crate::scheduler::Scheduler;
use crate::sequencer::{Admission, Sequencer};
use crate::task::{SyncTask, SyncType};
use crate::workers::{ActivitiesWorker, ItemsWorker, LibrariesWorker, UsersWorker};
use bridge_traits::media_server::MediaServerApi;
use bridge_traits::time::Clock;
use core_library::models::ServerId;
use core_library::repositories::{
    ServerRepository, SqliteActivityRepository, SqliteItemRepository, SqliteLibraryRepository,
    SqliteServerRepository, SqliteUserRepository,
};
use core_runtime::config::{CoreConfig, RetrySettings, SchedulerSettings};
use core_runtime::events::{CoreEvent, EventBus, ServerEvent};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

const ALL_SYNC_TYPES: [SyncType; 7] = [
    SyncType::Users,
    SyncType::Libraries,
    SyncType::Items,
    SyncType::Activities,
    SyncType::Full,
    SyncType::RecentItems,
    SyncType::RecentActivities,
];

/// Settings of the sync core, usually taken from [`CoreConfig`]
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub scheduler: SchedulerSettings,
    pub retry: RetrySettings,
    pub page_size: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings::default(),
            retry: RetrySettings::default(),
            page_size: core_runtime::config::DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<&CoreConfig> for SyncSettings {
    fn from(config: &CoreConfig) -> Self {
        Self {
            scheduler: config.scheduler,
            retry: config.retry,
            page_size: config.page_size,
        }
    }
}

/// Sync state of one server, for status pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSyncStatus {
    pub server_id: ServerId,
    /// Open ledger task, whoever holds it
    pub running: Option<SyncTask>,
    pub queued: Vec<JobKind>,
    pub removing: bool,
    /// Most recent closed task, successful or not
    pub last_finished: Option<SyncTask>,
    pub last_success: Option<SyncTask>,
}

pub struct SyncOrchestrator {
    servers: Arc<dyn ServerRepository>,
    ledger: Arc<dyn SyncTaskLedger>,
    sequencer: Arc<Sequencer>,
    scheduler: Scheduler,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl SyncOrchestrator {
    pub fn new(
        pool: SqlitePool,
        api: Arc<dyn MediaServerApi>,
        settings: SyncSettings,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let servers: Arc<dyn ServerRepository> = Arc::new(SqliteServerRepository::new(pool.clone()));
        let ledger: Arc<dyn SyncTaskLedger> = Arc::new(
            SqliteSyncTaskLedger::new(pool.clone()).with_lease(settings.scheduler.task_lease),
        );

        let workers = Workers {
            users: UsersWorker::new(Arc::new(SqliteUserRepository::new(pool.clone()))),
            libraries: LibrariesWorker::new(Arc::new(SqliteLibraryRepository::new(pool.clone()))),
            items: ItemsWorker::new(Arc::new(SqliteItemRepository::new(pool.clone()))),
            activities: ActivitiesWorker::new(Arc::new(SqliteActivityRepository::new(pool))),
        };

        let runner = JobRunner::new(
            servers.clone(),
            ledger.clone(),
            api,
            workers,
            events.clone(),
            clock.clone(),
            RunnerSettings {
                retry: settings.retry.into(),
                page_size: settings.page_size,
                lease_renewal: (settings.scheduler.task_lease / 3).max(Duration::from_secs(1)),
            },
        );

        Self::with_executor(servers, ledger, Arc::new(runner), settings.scheduler, events, clock)
    }

    /// Assemble around a custom executor
    pub fn with_executor(
        servers: Arc<dyn ServerRepository>,
        ledger: Arc<dyn SyncTaskLedger>,
        executor: Arc<dyn JobExecutor>,
        scheduler_settings: SchedulerSettings,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sequencer = Arc::new(Sequencer::new(ledger.clone(), servers.clone(), clock.clone()));
        let scheduler = Scheduler::new(
            sequencer.clone(),
            executor,
            servers.clone(),
            events.clone(),
            scheduler_settings,
        );

        Self {
            servers,
            ledger,
            sequencer,
            scheduler,
            events,
            clock,
        }
    }

    /// Close ledger tasks whose lease expired, then start the periodic timers
    ///
    /// Tasks of running jobs keep their lease fresh, so calling this after
    /// jobs were admitted, or from a second process on the same database,
    /// leaves them open. Returns the number of recovered tasks.
    pub async fn start(&self) -> Result<u64> {
        let recovered = self.sequencer.reclaim_expired().await?;
        self.scheduler.start();
        Ok(recovered)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Manually trigger a job for a server
    #[instrument(skip(self), fields(server_id = %server_id, job = kind.as_str()))]
    pub async fn submit(&self, server_id: &ServerId, kind: JobKind) -> Result<Admission> {
        self.submit_job(Job::new(kind, server_id.clone(), Trigger::Manual))
            .await
    }

    pub async fn submit_job(&self, job: Job) -> Result<Admission> {
        self.scheduler.submit(job).await
    }

    /// Initial sync of a newly registered server
    pub async fn server_added(&self, server_id: &ServerId) -> Result<Admission> {
        self.submit_job(Job::new(JobKind::AddServer, server_id.clone(), Trigger::ServerAdded))
            .await
    }

    /// Full sync of every active server, each through its own lane
    #[instrument(skip(self))]
    pub async fn sync_everything(&self) -> Result<Vec<(ServerId, Admission)>> {
        let servers = self.servers.list_active().await?;
        info!(servers = servers.len(), "Submitting full sync for every server");

        let mut admissions = Vec::with_capacity(servers.len());
        for server in servers {
            let admission = self.submit(&server.id, JobKind::FullSync).await?;
            admissions.push((server.id, admission));
        }
        Ok(admissions)
    }

    /// Remove a server and everything mirrored from it
    ///
    /// Rejects new jobs for the server, drops its queued jobs, waits for the
    /// running one, then deletes the server row (mirrored rows cascade).
    /// Ledger tasks are kept.
    ///
    /// Returns `false` if the server was not registered.
    #[instrument(skip(self), fields(server_id = %server_id))]
    pub async fn remove_server(&self, server_id: &ServerId) -> Result<bool> {
        if !self
            .servers
            .mark_removing(server_id, self.clock.unix_timestamp())
            .await?
        {
            return Ok(false);
        }

        let dropped = self.sequencer.begin_removal(server_id).await;
        info!(dropped, "Server removal started");

        self.scheduler.wait_server_idle(server_id).await;
        let deleted = self.servers.delete(server_id).await?;
        self.sequencer.forget(server_id).await;

        if deleted {
            info!("Server removed");
            self.events
                .emit(CoreEvent::Server(ServerEvent::Removed {
                    server_id: server_id.to_string(),
                }))
                .ok();
        }
        Ok(deleted)
    }

    pub async fn server_status(&self, server_id: &ServerId) -> Result<ServerSyncStatus> {
        let lane = self.sequencer.lane_status(server_id).await;
        let running = self.ledger.find_open(server_id).await?;
        let last_finished = self
            .ledger
            .history(server_id, 2)
            .await?
            .into_iter()
            .find(|task| !task.is_open());
        let last_success = self.ledger.last_successful(server_id, &ALL_SYNC_TYPES).await?;

        Ok(ServerSyncStatus {
            server_id: server_id.clone(),
            running,
            queued: lane.queued,
            removing: lane.removing,
            last_finished,
            last_success,
        })
    }

    /// Ledger tasks of a server, most recent first
    pub async fn history(&self, server_id: &ServerId, limit: u32) -> Result<Vec<SyncTask>> {
        self.ledger.history(server_id, limit).await
    }

    pub async fn is_idle(&self) -> bool {
        self.scheduler.is_idle().await
    }

    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await
    }

    pub async fn wait_server_idle(&self, server_id: &ServerId) {
        self.scheduler.wait_server_idle(server_id).await
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await
    }
}

//! # Job Definitions
//!
//! A job is an in-memory request to run a fixed sequence of domain steps
//! against one server. It lives until its ledger task is closed.
//!
//! ## Compositions
//!
//! | Job kind               | Steps                                          | Ledger type         |
//! |------------------------|------------------------------------------------|---------------------|
//! | `add-server`           | libraries, users, full items, full activities  | `full`              |
//! | `full-sync`            | libraries, users, full items, full activities  | `full`              |
//! | `users-sync`           | users                                          | `users`             |
//! | `libraries-sync`       | libraries                                      | `libraries`         |
//! | `items-sync`           | full items                                     | `items`             |
//! | `activities-sync`      | full activities                                | `activities`        |
//! | `recent-items`         | incremental items                              | `recent-items`      |
//! | `recent-activities`    | incremental activities                         | `recent-activities` |
//!
//! Steps run in order. The first failing step ends the job: later steps are
//! skipped and rows written by earlier steps stay committed.

use crate::error::{Result, SyncError};
use crate::ledger::SyncTaskLedger;
use crate::result_logger::ResultLogger;
use crate::retry::RetryPolicy;
use crate::task::{DomainStats, SyncTask, SyncTaskStats, SyncType};
use crate::workers::{ActivitiesWorker, ItemsWorker, LibrariesWorker, SyncContext, UsersWorker};
use async_trait::async_trait;
use bridge_traits::media_server::MediaServerApi;
use bridge_traits::time::Clock;
use core_library::models::ServerId;
use core_library::repositories::ServerRepository;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ============================================================================
// Identifiers and Kinds
// ============================================================================

/// Identifier of an in-memory job request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    AddServer,
    FullSync,
    UsersSync,
    LibrariesSync,
    ItemsSync,
    ActivitiesSync,
    RecentItemsSync,
    RecentActivitiesSync,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::AddServer => "add-server",
            JobKind::FullSync => "full-sync",
            JobKind::UsersSync => "users-sync",
            JobKind::LibrariesSync => "libraries-sync",
            JobKind::ItemsSync => "items-sync",
            JobKind::ActivitiesSync => "activities-sync",
            JobKind::RecentItemsSync => "recent-items",
            JobKind::RecentActivitiesSync => "recent-activities",
        }
    }

    /// Type recorded on the ledger task
    pub fn sync_type(&self) -> SyncType {
        match self {
            JobKind::AddServer | JobKind::FullSync => SyncType::Full,
            JobKind::UsersSync => SyncType::Users,
            JobKind::LibrariesSync => SyncType::Libraries,
            JobKind::ItemsSync => SyncType::Items,
            JobKind::ActivitiesSync => SyncType::Activities,
            JobKind::RecentItemsSync => SyncType::RecentItems,
            JobKind::RecentActivitiesSync => SyncType::RecentActivities,
        }
    }

    pub fn steps(&self) -> &'static [Step] {
        match self {
            JobKind::AddServer | JobKind::FullSync => &[
                Step::Libraries,
                Step::Users,
                Step::Items,
                Step::Activities,
            ],
            JobKind::UsersSync => &[Step::Users],
            JobKind::LibrariesSync => &[Step::Libraries],
            JobKind::ItemsSync => &[Step::Items],
            JobKind::ActivitiesSync => &[Step::Activities],
            JobKind::RecentItemsSync => &[Step::RecentItems],
            JobKind::RecentActivitiesSync => &[Step::RecentActivities],
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add-server" => Ok(JobKind::AddServer),
            "full-sync" => Ok(JobKind::FullSync),
            "users-sync" => Ok(JobKind::UsersSync),
            "libraries-sync" => Ok(JobKind::LibrariesSync),
            "items-sync" => Ok(JobKind::ItemsSync),
            "activities-sync" => Ok(JobKind::ActivitiesSync),
            "recent-items" => Ok(JobKind::RecentItemsSync),
            "recent-activities" => Ok(JobKind::RecentActivitiesSync),
            _ => Err(SyncError::Internal(format!("Unknown job kind: {}", s))),
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One domain worker invocation inside a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Users,
    Libraries,
    Items,
    Activities,
    RecentItems,
    RecentActivities,
}

impl Step {
    /// Domain name used in events and logs
    pub fn domain(&self) -> &'static str {
        match self {
            Step::Users => "users",
            Step::Libraries => "libraries",
            Step::Items | Step::RecentItems => "items",
            Step::Activities | Step::RecentActivities => "activities",
        }
    }
}

/// What caused a job to be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    Manual,
    Periodic,
    ServerAdded,
    /// Resubmission after a transient failure
    Retry,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Periodic => "periodic",
            Trigger::ServerAdded => "server-added",
            Trigger::Retry => "retry",
        }
    }
}

// ============================================================================
// Job
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub server_id: ServerId,
    /// Explicit incremental cursor, overriding the derived one
    pub since: Option<i64>,
    pub trigger: Trigger,
    /// 0 for an original submission, n for the n-th resubmission
    pub attempt: u32,
}

impl Job {
    pub fn new(kind: JobKind, server_id: ServerId, trigger: Trigger) -> Self {
        Self {
            id: JobId::new(),
            kind,
            server_id,
            since: None,
            trigger,
            attempt: 0,
        }
    }

    pub fn with_since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    /// Fresh job repeating this one after a transient failure
    pub fn resubmission(&self) -> Self {
        Self {
            id: JobId::new(),
            kind: self.kind,
            server_id: self.server_id.clone(),
            since: self.since,
            trigger: Trigger::Retry,
            attempt: self.attempt + 1,
        }
    }
}

/// A job that holds its server's ledger slot
#[derive(Debug, Clone)]
pub struct AdmittedJob {
    pub job: Job,
    pub task: SyncTask,
}

/// Outcome of one job execution
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: Job,
    /// Closed ledger task
    pub task: SyncTask,
    /// Whether the failure, if any, was transient
    pub transient: bool,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.task.error_code.is_none()
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Runs admitted jobs to completion
///
/// An executor must always close the job's ledger task, whatever happens.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, admitted: AdmittedJob) -> JobReport;
}

/// Settings the runner applies to every job
#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    pub retry: RetryPolicy,
    pub page_size: u32,
    /// How often a running job renews its ledger task lease
    pub lease_renewal: Duration,
}

/// Default executor: resolves the connection, then runs the job's steps
pub struct JobRunner {
    servers: Arc<dyn ServerRepository>,
    ledger: Arc<dyn SyncTaskLedger>,
    api: Arc<dyn MediaServerApi>,
    users: UsersWorker,
    libraries: LibrariesWorker,
    items: ItemsWorker,
    activities: ActivitiesWorker,
    results: ResultLogger,
    events: EventBus,
    clock: Arc<dyn Clock>,
    settings: RunnerSettings,
}

/// Domain workers run by a [`JobRunner`]
pub struct Workers {
    pub users: UsersWorker,
    pub libraries: LibrariesWorker,
    pub items: ItemsWorker,
    pub activities: ActivitiesWorker,
}

impl JobRunner {
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        ledger: Arc<dyn SyncTaskLedger>,
        api: Arc<dyn MediaServerApi>,
        workers: Workers,
        events: EventBus,
        clock: Arc<dyn Clock>,
        settings: RunnerSettings,
    ) -> Self {
        let results = ResultLogger::new(ledger.clone(), events.clone(), clock.clone())
            .with_close_retry(settings.retry);
        Self {
            servers,
            ledger,
            api,
            users: workers.users,
            libraries: workers.libraries,
            items: workers.items,
            activities: workers.activities,
            results,
            events,
            clock,
            settings,
        }
    }

    async fn renew_lease(&self, task: &SyncTask) {
        match self.ledger.renew(&task.id, self.clock.unix_timestamp()).await {
            Ok(true) => debug!("Task lease renewed"),
            Ok(false) => warn!("Task closed elsewhere while the job is still running"),
            Err(e) => warn!(error = %e, "Failed to renew task lease"),
        }
    }

    async fn context(&self, admitted: &AdmittedJob) -> Result<SyncContext> {
        let server_id = &admitted.job.server_id;
        let server = self
            .servers
            .find_by_id(server_id)
            .await?
            .ok_or_else(|| SyncError::UnknownServer {
                server_id: server_id.to_string(),
            })?;

        Ok(SyncContext {
            server_id: server_id.clone(),
            connection: server.connection()?,
            task_id: admitted.task.id,
            api: self.api.clone(),
            retry: self.settings.retry,
            page_size: self.settings.page_size,
            synced_at: self.clock.unix_timestamp(),
        })
    }

    async fn run_steps(&self, admitted: &AdmittedJob, totals: &mut SyncTaskStats) -> Result<()> {
        let ctx = self.context(admitted).await?;

        for step in admitted.job.kind.steps() {
            let stats = self.run_step(*step, &admitted.job, &ctx).await?;
            totals.absorb(&stats);

            self.events
                .emit(CoreEvent::Sync(SyncEvent::StepCompleted {
                    task_id: ctx.task_id.to_string(),
                    server_id: ctx.server_id.to_string(),
                    step: step.domain().to_string(),
                    counts: SyncTaskStats::from(&stats).counts(),
                }))
                .ok();
        }

        Ok(())
    }

    async fn run_step(&self, step: Step, job: &Job, ctx: &SyncContext) -> Result<DomainStats> {
        debug!(step = step.domain(), job = job.kind.as_str(), "Running step");

        match step {
            Step::Users => self.users.sync_full(ctx).await,
            Step::Libraries => self.libraries.sync_full(ctx).await,
            Step::Items => self.items.sync_full(ctx).await,
            Step::Activities => self.activities.sync_full(ctx).await,
            Step::RecentItems => {
                // Ledger rows outlive a removed server, its items do not
                let since = match job.since {
                    Some(since) => Some(since),
                    None if self.items.is_empty(&ctx.server_id).await? => None,
                    None => self
                        .ledger
                        .last_successful(&ctx.server_id, &SyncType::ITEMS_CURSOR_SOURCES)
                        .await?
                        .map(|task| task.started_at),
                };
                match since {
                    Some(since) => self.items.sync_recent(ctx, since).await,
                    None => {
                        info!("No items cursor or no local items, running a full items sync");
                        self.items.sync_full(ctx).await
                    }
                }
            }
            Step::RecentActivities => {
                let since = match job.since {
                    Some(since) => Some(since),
                    None => self.activities.local_cursor(&ctx.server_id).await?,
                };
                match since {
                    Some(since) => self.activities.sync_recent(ctx, since).await,
                    None => {
                        info!("No local activity yet, running a full activities sync");
                        self.activities.sync_full(ctx).await
                    }
                }
            }
        }
    }
}

#[async_trait]
impl JobExecutor for JobRunner {
    #[instrument(
        skip(self, admitted),
        fields(
            job = admitted.job.kind.as_str(),
            server_id = %admitted.job.server_id,
            task_id = %admitted.task.id
        )
    )]
    async fn execute(&self, admitted: AdmittedJob) -> JobReport {
        let started = Instant::now();
        self.events
            .emit(CoreEvent::Sync(SyncEvent::Started {
                task_id: admitted.task.id.to_string(),
                server_id: admitted.job.server_id.to_string(),
                job: admitted.job.kind.as_str().to_string(),
                sync_type: admitted.task.sync_type.as_str().to_string(),
            }))
            .ok();

        let mut totals = SyncTaskStats::default();
        let outcome = {
            let steps = self.run_steps(&admitted, &mut totals);
            tokio::pin!(steps);

            let renewal = self.settings.lease_renewal;
            let mut heartbeat = interval_at(Instant::now() + renewal, renewal);
            heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    outcome = &mut steps => break outcome,
                    _ = heartbeat.tick() => self.renew_lease(&admitted.task).await,
                }
            }
        };

        let failure = outcome.err();
        let task = self
            .results
            .record(&admitted.job, &admitted.task, totals, failure.as_ref(), started.elapsed())
            .await;

        JobReport {
            transient: failure.as_ref().is_some_and(SyncError::is_transient),
            job: admitted.job,
            task,
        }
    }
}

//! # Scheduler
//!
//! Feeds jobs through the [`Sequencer`] and runs admitted ones on a bounded
//! worker pool.
//!
//! ## Overview
//!
//! - Every admitted job is spawned as a task that first waits for a pool
//!   permit. The semaphore is fair, so a saturated pool serves jobs in arrival
//!   order and nothing is ever dropped.
//! - When a job finishes, its lane is released and the next queued job of the
//!   same server is dispatched.
//! - Periodic timers submit recent-items and recent-activities jobs for every
//!   active server on the short interval, and a full sync on the long one.
//!   A periodic job is not submitted if an identical one is already pending.
//!   Each tick first reclaims ledger tasks whose lease expired, then re-polls
//!   queues whose head waits on a foreign ledger slot.
//! - Optionally, a job that failed with a transient error is resubmitted.
//!
//! ## Shutdown
//!
//! `shutdown()` stops the timers, rejects new submissions, drops queued jobs
//! and waits for every admitted job to close its ledger task.

use crate::error::Result;
use crate::jobs::{AdmittedJob, Job, JobExecutor, JobKind, JobReport, Trigger};
use crate::sequencer::{Admission, RejectReason, Sequencer, Submission};
use core_library::models::ServerId;
use core_library::repositories::ServerRepository;
use core_runtime::config::SchedulerSettings;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    sequencer: Arc<Sequencer>,
    executor: Arc<dyn JobExecutor>,
    servers: Arc<dyn ServerRepository>,
    events: EventBus,
    settings: SchedulerSettings,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    accepting: AtomicBool,
    timers_started: AtomicBool,
    /// Admitted jobs not yet released
    in_flight: AtomicUsize,
    idle: Notify,
}

impl Scheduler {
    pub fn new(
        sequencer: Arc<Sequencer>,
        executor: Arc<dyn JobExecutor>,
        servers: Arc<dyn ServerRepository>,
        events: EventBus,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                sequencer,
                executor,
                servers,
                events,
                permits: Arc::new(Semaphore::new(settings.worker_pool_size.max(1))),
                settings,
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                accepting: AtomicBool::new(true),
                timers_started: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Start the periodic timers, if enabled. Idempotent.
    ///
    /// The first tick of each timer fires one full interval after start.
    pub fn start(&self) {
        if !self.inner.settings.periodic_sync_enabled {
            info!("Periodic sync disabled");
            return;
        }
        if self.inner.timers_started.swap(true, Ordering::SeqCst) {
            return;
        }

        info!(
            recent_interval_secs = self.inner.settings.recent_sync_interval.as_secs(),
            full_interval_secs = self.inner.settings.full_sync_interval.as_secs(),
            "Starting periodic sync timers"
        );

        self.spawn_timer(
            self.inner.settings.recent_sync_interval,
            &[JobKind::RecentItemsSync, JobKind::RecentActivitiesSync],
        );
        self.spawn_timer(self.inner.settings.full_sync_interval, &[JobKind::FullSync]);
    }

    fn spawn_timer(&self, period: Duration, kinds: &'static [JobKind]) {
        let inner = self.inner.clone();
        self.inner.tracker.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = inner.cancel.cancelled() => break,
                    _ = ticker.tick() => SchedulerInner::on_tick(&inner, kinds).await,
                }
            }
            debug!(?kinds, "Periodic timer stopped");
        });
    }

    /// Submit a job
    ///
    /// # Errors
    ///
    /// Returns an error if the registry or the ledger cannot be read.
    pub async fn submit(&self, job: Job) -> Result<Admission> {
        SchedulerInner::submit(&self.inner, job).await
    }

    /// Submit unless a job of the same kind is already pending for the server
    pub async fn submit_if_absent(&self, job: Job) -> Result<Option<Admission>> {
        if self.inner.sequencer.has_pending(&job.server_id, job.kind).await {
            return Ok(None);
        }
        self.submit(job).await.map(Some)
    }

    pub async fn is_idle(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) == 0 && self.inner.sequencer.is_idle().await
    }

    /// Resolve once no job is running or queued
    ///
    /// A queue waiting on a ledger slot held by another process only drains
    /// on a timer tick, so this can wait up to one short interval for it.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle().await {
                return;
            }
            notified.await;
        }
    }

    /// Resolve once the server has no running or queued job
    pub async fn wait_server_idle(&self, server_id: &ServerId) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inner.sequencer.is_server_idle(server_id).await {
                return;
            }
            notified.await;
        }
    }

    /// Stop timers and admissions, then wait for admitted jobs
    pub async fn shutdown(&self) {
        if !self.inner.accepting.swap(false, Ordering::SeqCst) {
            self.inner.tracker.wait().await;
            return;
        }

        info!("Scheduler shutting down");
        self.inner.cancel.cancel();
        let dropped = self.inner.sequencer.clear_queues().await;
        if dropped > 0 {
            info!(dropped, "Dropped queued jobs");
        }

        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.idle.notify_waiters();
        info!("Scheduler stopped");
    }
}

impl SchedulerInner {
    async fn submit(inner: &Arc<Self>, job: Job) -> Result<Admission> {
        let server_id = job.server_id.to_string();
        let kind = job.kind;

        if !inner.accepting.load(Ordering::SeqCst) {
            inner.emit_rejected(&server_id, kind, RejectReason::ShuttingDown);
            return Ok(Admission::Rejected {
                reason: RejectReason::ShuttingDown,
            });
        }

        let submission = inner.sequencer.submit(job).await?;
        let admission = submission.admission();

        match submission {
            Submission::Admitted(admitted) => Self::dispatch(inner, admitted),
            Submission::Queued { job, position } => {
                inner
                    .events
                    .emit(CoreEvent::Sync(SyncEvent::Queued {
                        server_id,
                        job: kind.as_str().to_string(),
                        trigger: job.trigger.as_str().to_string(),
                        position,
                    }))
                    .ok();
            }
            Submission::Rejected { reason, .. } => {
                warn!(server_id = %server_id, job = kind.as_str(), reason = reason.as_str(), "Job rejected");
                inner.emit_rejected(&server_id, kind, reason);
            }
        }

        Ok(admission)
    }

    fn emit_rejected(&self, server_id: &str, kind: JobKind, reason: RejectReason) {
        self.events
            .emit(CoreEvent::Sync(SyncEvent::Rejected {
                server_id: server_id.to_string(),
                job: kind.as_str().to_string(),
                reason: reason.as_str().to_string(),
            }))
            .ok();
    }

    fn dispatch(inner: &Arc<Self>, admitted: AdmittedJob) {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let this = inner.clone();

        inner.tracker.spawn(async move {
            let report = {
                // Never closed: admitted jobs always run
                let _permit = this.permits.clone().acquire_owned().await.ok();
                this.executor.execute(admitted).await
            };
            Self::on_finished(&this, report).await;
        });
    }

    async fn on_finished(inner: &Arc<Self>, report: JobReport) {
        let server_id = report.job.server_id.clone();

        match inner.sequencer.release(&server_id, report.job.id).await {
            Ok(Some(next)) => Self::dispatch(inner, next),
            Ok(None) => {}
            Err(e) => {
                error!(server_id = %server_id, error = %e, "Failed to admit next queued job");
            }
        }

        if report.transient && report.job.attempt < inner.settings.job_resubmit_limit {
            let retry = report.job.resubmission();
            info!(
                server_id = %server_id,
                job = retry.kind.as_str(),
                attempt = retry.attempt,
                "Resubmitting job after transient failure"
            );
            if let Err(e) = Self::submit(inner, retry).await {
                error!(server_id = %server_id, error = %e, "Failed to resubmit job");
            }
        }

        inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        inner.idle.notify_waiters();
    }

    async fn on_tick(inner: &Arc<Self>, kinds: &[JobKind]) {
        if !inner.accepting.load(Ordering::SeqCst) {
            return;
        }

        match inner.sequencer.reclaim_expired().await {
            Ok(0) => {}
            Ok(reclaimed) => info!(reclaimed, "Reclaimed expired ledger slots"),
            Err(e) => error!(error = %e, "Failed to reclaim expired ledger slots"),
        }

        for admitted in inner.sequencer.poll_all().await {
            Self::dispatch(inner, admitted);
        }

        let servers = match inner.servers.list_active().await {
            Ok(servers) => servers,
            Err(e) => {
                error!(error = %e, "Failed to list servers for periodic sync");
                return;
            }
        };

        for server in servers {
            for kind in kinds {
                if inner.sequencer.has_pending(&server.id, *kind).await {
                    debug!(server_id = %server.id, job = kind.as_str(), "Periodic job already pending");
                    continue;
                }
                let job = Job::new(*kind, server.id.clone(), Trigger::Periodic);
                if let Err(e) = Self::submit(inner, job).await {
                    error!(server_id = %server.id, error = %e, "Failed to submit periodic job");
                }
            }
        }
    }
}

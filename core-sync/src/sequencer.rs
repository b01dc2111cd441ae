//! # Per-Server Sequencer
//!
//! Enforces at most one active job per server and FIFO order for the rest.
//!
//! ## Overview
//!
//! Each server has a lane: the active job (if any) and a queue of waiting
//! jobs. Admission claims the server's ledger slot with
//! [`SyncTaskLedger::try_begin`], so the mutual exclusion holds even when the
//! slot is held by a task this process does not know about (another process,
//! or a task left open by a crash). Such a job stays at the head of its queue
//! and is re-polled by [`Sequencer::poll_all`].
//!
//! ```text
//! submit ──> unknown / removing server ──────────────> Rejected
//!        ──> lane busy or queue non-empty ───────────> Queued (FIFO)
//!        ──> ledger slot claimed ────────────────────> Accepted
//!        ──> ledger slot held elsewhere ─────────────> Queued (head)
//! ```

use crate::error::Result;
use crate::jobs::{AdmittedJob, Job, JobId, JobKind};
use crate::ledger::SyncTaskLedger;
use crate::task::SyncTaskId;
use bridge_traits::time::Clock;
use core_library::models::ServerId;
use core_library::repositories::ServerRepository;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Why a submission was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    UnknownServer,
    ServerRemoving,
    ShuttingDown,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::UnknownServer => "unknown-server",
            RejectReason::ServerRemoving => "server-removing",
            RejectReason::ShuttingDown => "shutting-down",
        }
    }
}

/// Result of a submission as seen by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Running now; its ledger task is open
    Accepted { job_id: JobId, task_id: SyncTaskId },
    /// Waiting behind `position` jobs
    Queued { job_id: JobId, position: usize },
    Rejected { reason: RejectReason },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted { .. })
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Admission::Queued { .. })
    }
}

/// Internal outcome of [`Sequencer::submit`]
#[derive(Debug)]
pub enum Submission {
    Admitted(AdmittedJob),
    Queued { job: Job, position: usize },
    Rejected { job: Job, reason: RejectReason },
}

impl Submission {
    pub fn admission(&self) -> Admission {
        match self {
            Submission::Admitted(admitted) => Admission::Accepted {
                job_id: admitted.job.id,
                task_id: admitted.task.id,
            },
            Submission::Queued { job, position } => Admission::Queued {
                job_id: job.id,
                position: *position,
            },
            Submission::Rejected { reason, .. } => Admission::Rejected { reason: *reason },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveJob {
    job_id: JobId,
    kind: JobKind,
    task_id: SyncTaskId,
}

#[derive(Debug, Default)]
struct ServerLane {
    active: Option<ActiveJob>,
    queue: VecDeque<Job>,
    removing: bool,
}

impl ServerLane {
    fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }
}

/// Snapshot of one server's lane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneStatus {
    pub running: Option<(JobKind, SyncTaskId)>,
    pub queued: Vec<JobKind>,
    pub removing: bool,
}

pub struct Sequencer {
    lanes: Mutex<HashMap<ServerId, ServerLane>>,
    ledger: Arc<dyn SyncTaskLedger>,
    servers: Arc<dyn ServerRepository>,
    clock: Arc<dyn Clock>,
}

impl Sequencer {
    pub fn new(
        ledger: Arc<dyn SyncTaskLedger>,
        servers: Arc<dyn ServerRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            lanes: Mutex::new(HashMap::new()),
            ledger,
            servers,
            clock,
        }
    }

    /// Admit, queue or reject a job
    ///
    /// # Errors
    ///
    /// Returns an error only if the registry or the ledger cannot be read.
    pub async fn submit(&self, job: Job) -> Result<Submission> {
        let mut lanes = self.lanes.lock().await;

        if lanes.get(&job.server_id).is_some_and(|lane| lane.removing) {
            return Ok(Submission::Rejected {
                job,
                reason: RejectReason::ServerRemoving,
            });
        }

        match self.servers.find_by_id(&job.server_id).await? {
            None => {
                return Ok(Submission::Rejected {
                    job,
                    reason: RejectReason::UnknownServer,
                })
            }
            Some(server) if server.removing => {
                lanes.entry(job.server_id.clone()).or_default().removing = true;
                return Ok(Submission::Rejected {
                    job,
                    reason: RejectReason::ServerRemoving,
                });
            }
            Some(_) => {}
        }

        let lane = lanes.entry(job.server_id.clone()).or_default();
        if !lane.is_idle() {
            let position = lane.queue.len() + usize::from(lane.active.is_some());
            debug!(server_id = %job.server_id, job = job.kind.as_str(), position, "Job queued behind lane");
            lane.queue.push_back(job.clone());
            return Ok(Submission::Queued { job, position });
        }

        let started_at = self.clock.unix_timestamp();
        match self
            .ledger
            .try_begin(&job.server_id, job.kind.sync_type(), started_at)
            .await?
        {
            Some(task) => {
                lane.active = Some(ActiveJob {
                    job_id: job.id,
                    kind: job.kind,
                    task_id: task.id,
                });
                Ok(Submission::Admitted(AdmittedJob { job, task }))
            }
            None => {
                info!(server_id = %job.server_id, job = job.kind.as_str(), "Ledger slot held elsewhere, job queued");
                lane.queue.push_back(job.clone());
                Ok(Submission::Queued { job, position: 1 })
            }
        }
    }

    /// Clear the active job of a server and admit the next queued one
    ///
    /// Must be called after the finished job's ledger task is closed.
    pub async fn release(&self, server_id: &ServerId, job_id: JobId) -> Result<Option<AdmittedJob>> {
        let mut lanes = self.lanes.lock().await;
        let Some(lane) = lanes.get_mut(server_id) else {
            return Ok(None);
        };

        if lane.active.is_some_and(|active| active.job_id == job_id) {
            lane.active = None;
        } else {
            warn!(server_id = %server_id, job_id = %job_id, "Released job was not active");
        }

        let next = self.admit_head(server_id, lane).await?;
        if lane.is_idle() && !lane.removing {
            lanes.remove(server_id);
        }
        Ok(next)
    }

    /// Close ledger tasks whose lease lapsed, freeing their servers' slots
    ///
    /// Returns the number of closed tasks.
    pub async fn reclaim_expired(&self) -> Result<u64> {
        self.ledger
            .recover_abandoned(self.clock.unix_timestamp())
            .await
    }

    /// Retry admission for every lane whose head is waiting on the ledger
    pub async fn poll_all(&self) -> Vec<AdmittedJob> {
        let mut lanes = self.lanes.lock().await;
        let mut admitted = Vec::new();

        for (server_id, lane) in lanes.iter_mut() {
            match self.admit_head(server_id, lane).await {
                Ok(Some(job)) => admitted.push(job),
                Ok(None) => {}
                Err(e) => warn!(server_id = %server_id, error = %e, "Failed to poll queued job"),
            }
        }

        admitted
    }

    async fn admit_head(&self, server_id: &ServerId, lane: &mut ServerLane) -> Result<Option<AdmittedJob>> {
        if lane.active.is_some() || lane.removing {
            return Ok(None);
        }
        let Some(head) = lane.queue.front() else {
            return Ok(None);
        };

        let started_at = self.clock.unix_timestamp();
        let Some(task) = self
            .ledger
            .try_begin(server_id, head.kind.sync_type(), started_at)
            .await?
        else {
            return Ok(None);
        };

        let Some(job) = lane.queue.pop_front() else {
            return Ok(None);
        };
        lane.active = Some(ActiveJob {
            job_id: job.id,
            kind: job.kind,
            task_id: task.id,
        });
        debug!(server_id = %server_id, job = job.kind.as_str(), "Queued job admitted");
        Ok(Some(AdmittedJob { job, task }))
    }

    /// Reject further submissions for a server and drop its queued jobs
    ///
    /// Returns the number of dropped jobs. The active job, if any, runs on.
    pub async fn begin_removal(&self, server_id: &ServerId) -> usize {
        let mut lanes = self.lanes.lock().await;
        let lane = lanes.entry(server_id.clone()).or_default();
        lane.removing = true;
        let dropped = lane.queue.len();
        lane.queue.clear();
        dropped
    }

    /// Forget a removed server
    pub async fn forget(&self, server_id: &ServerId) {
        self.lanes.lock().await.remove(server_id);
    }

    /// Drop every queued job; active jobs are unaffected
    pub async fn clear_queues(&self) -> usize {
        let mut lanes = self.lanes.lock().await;
        lanes
            .values_mut()
            .map(|lane| {
                let dropped = lane.queue.len();
                lane.queue.clear();
                dropped
            })
            .sum()
    }

    /// Whether a job of `kind` is running or waiting for the server
    pub async fn has_pending(&self, server_id: &ServerId, kind: JobKind) -> bool {
        let lanes = self.lanes.lock().await;
        lanes.get(server_id).is_some_and(|lane| {
            lane.active.is_some_and(|active| active.kind == kind)
                || lane.queue.iter().any(|job| job.kind == kind)
        })
    }

    pub async fn is_idle(&self) -> bool {
        self.lanes.lock().await.values().all(ServerLane::is_idle)
    }

    pub async fn is_server_idle(&self, server_id: &ServerId) -> bool {
        self.lanes
            .lock()
            .await
            .get(server_id)
            .map_or(true, ServerLane::is_idle)
    }

    pub async fn lane_status(&self, server_id: &ServerId) -> LaneStatus {
        let lanes = self.lanes.lock().await;
        match lanes.get(server_id) {
            Some(lane) => LaneStatus {
                running: lane.active.map(|active| (active.kind, active.task_id)),
                queued: lane.queue.iter().map(|job| job.kind).collect(),
                removing: lane.removing,
            },
            None => LaneStatus::default(),
        }
    }
}

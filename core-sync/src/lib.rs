//! # Sync Orchestration Module
//!
//! Keeps a local mirror of one or more media servers up to date.
//!
//! ## Overview
//!
//! This module manages the lifecycle of sync jobs, including:
//! - Admitting at most one running job per server through the task ledger
//! - Paging through users, libraries, items and activities of each server
//! - Incremental runs driven by a cursor derived from earlier tasks
//! - Retrying transient external failures with exponential backoff
//! - Periodic scheduling and server removal
//!
//! ## Components
//!
//! - **Task Ledger** (`ledger`): Persistent record of every sync run, and the per-server slot
//! - **Domain Workers** (`workers`): Fetch, map and upsert one domain
//! - **Jobs** (`jobs`): Job kinds, their steps and the runner that executes them
//! - **Sequencer** (`sequencer`): Per-server FIFO lanes in front of the ledger
//! - **Scheduler** (`scheduler`): Bounded worker pool and periodic timers
//! - **Result Logger** (`result_logger`): Closes tasks, logs and publishes outcomes
//! - **Orchestrator** (`orchestrator`): Wires everything over one pool and one API

pub mod error;
pub mod jobs;
pub mod ledger;
pub mod orchestrator;
pub mod result_logger;
pub mod retry;
pub mod scheduler;
pub mod sequencer;
pub mod task;
pub mod workers;

pub use error::{ErrorCode, Result, SyncError};
pub use jobs::{
    AdmittedJob, Job, JobExecutor, JobId, JobKind, JobReport, JobRunner, RunnerSettings, Step,
    Trigger, Workers,
};
pub use ledger::{SqliteSyncTaskLedger, SyncTaskLedger};
pub use orchestrator::{ServerSyncStatus, SyncOrchestrator, SyncSettings};
pub use result_logger::ResultLogger;
pub use retry::RetryPolicy;
pub use scheduler::Scheduler;
pub use sequencer::{Admission, LaneStatus, RejectReason, Sequencer};
pub use task::{DomainStats, SyncTask, SyncTaskId, SyncTaskStats, SyncType, TaskCompletion};
pub use workers::{ActivitiesWorker, ItemsWorker, LibrariesWorker, SyncContext, UsersWorker};

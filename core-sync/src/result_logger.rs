//! Records the outcome of every job execution
//!
//! Closes the job's ledger task, writes one summary log line and publishes
//! the matching `Completed` or `Failed` event. A close that fails on the
//! database is retried with the runner's backoff; if it never lands, the
//! task's lease runs out and the scheduler reclaims the slot on a later tick.

use crate::error::{Result, SyncError};
use crate::jobs::Job;
use crate::ledger::SyncTaskLedger;
use crate::retry::RetryPolicy;
use crate::task::{SyncTask, SyncTaskStats, TaskCompletion};
use bridge_traits::time::Clock;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct ResultLogger {
    ledger: Arc<dyn SyncTaskLedger>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    close_retry: RetryPolicy,
}

impl ResultLogger {
    pub fn new(ledger: Arc<dyn SyncTaskLedger>, events: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            events,
            clock,
            close_retry: RetryPolicy::no_retry(),
        }
    }

    /// Backoff for closing a task when the database write fails
    pub fn with_close_retry(mut self, policy: RetryPolicy) -> Self {
        self.close_retry = policy;
        self
    }

    /// Close `task` with the job's outcome and return the stored record
    ///
    /// If the close never lands, the failure is logged and the in-memory
    /// closed task is returned.
    pub async fn record(
        &self,
        job: &Job,
        task: &SyncTask,
        stats: SyncTaskStats,
        failure: Option<&SyncError>,
        elapsed: Duration,
    ) -> SyncTask {
        let completed_at = self.clock.unix_timestamp().max(task.started_at);
        let completion = match failure {
            Some(e) => TaskCompletion::failure(completed_at, e, stats),
            None => TaskCompletion::success(completed_at, stats),
        };

        let closed = match self.close(task, &completion).await {
            Ok(closed) => closed,
            Err(e) => {
                error!(task_id = %task.id, server_id = %task.server_id, error = %e, "Failed to close sync task");
                let mut closed = task.clone();
                closed.completed_at = Some(completion.completed_at);
                closed.stats = stats;
                if let Some((code, message)) = &completion.error {
                    closed.error_code = Some(*code);
                    closed.error_message = Some(message.clone());
                }
                closed
            }
        };

        let duration_ms = elapsed.as_millis() as u64;
        match failure {
            None => {
                info!(
                    job = job.kind.as_str(),
                    server_id = %job.server_id,
                    task_id = %task.id,
                    trigger = job.trigger.as_str(),
                    duration_ms,
                    added = stats.added,
                    updated = stats.updated,
                    unchanged = stats.unchanged,
                    skipped = stats.skipped,
                    outcome = "success",
                    "Sync job finished"
                );
                self.events
                    .emit(CoreEvent::Sync(SyncEvent::Completed {
                        task_id: task.id.to_string(),
                        server_id: job.server_id.to_string(),
                        job: job.kind.as_str().to_string(),
                        counts: stats.counts(),
                        duration_ms,
                    }))
                    .ok();
            }
            Some(e) => {
                let code = e.code();
                if e.is_transient() {
                    warn!(
                        job = job.kind.as_str(),
                        server_id = %job.server_id,
                        task_id = %task.id,
                        trigger = job.trigger.as_str(),
                        duration_ms,
                        error_code = code.as_str(),
                        error = %e,
                        outcome = "failed",
                        "Sync job finished"
                    );
                } else {
                    error!(
                        job = job.kind.as_str(),
                        server_id = %job.server_id,
                        task_id = %task.id,
                        trigger = job.trigger.as_str(),
                        duration_ms,
                        error_code = code.as_str(),
                        error = %e,
                        outcome = "failed",
                        "Sync job finished"
                    );
                }
                self.events
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        task_id: task.id.to_string(),
                        server_id: job.server_id.to_string(),
                        job: job.kind.as_str().to_string(),
                        error_code: code.as_str().to_string(),
                        message: e.to_string(),
                        recoverable: e.is_transient(),
                    }))
                    .ok();
            }
        }

        closed
    }

    async fn close(&self, task: &SyncTask, completion: &TaskCompletion) -> Result<SyncTask> {
        let attempts = self.close_retry.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.ledger.finish(&task.id, completion).await {
                Err(SyncError::Database(message)) if attempt < attempts => {
                    let delay = self.close_retry.delay_after(attempt);
                    warn!(
                        task_id = %task.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Failed to close sync task, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::jobs::{JobKind, Trigger};
    use crate::ledger::SqliteSyncTaskLedger;
    use bridge_traits::time::FixedClock;
    use core_library::db::{create_test_pool, insert_test_server};
    use core_library::models::ServerId;
    use crate::task::{SyncTaskId, SyncType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Ledger whose first `failures` closes fail on the database
    struct FlakyLedger {
        inner: SqliteSyncTaskLedger,
        failures: AtomicU32,
    }

    #[async_trait]
    impl SyncTaskLedger for FlakyLedger {
        async fn try_begin(
            &self,
            server_id: &ServerId,
            sync_type: SyncType,
            started_at: i64,
        ) -> Result<Option<SyncTask>> {
            self.inner.try_begin(server_id, sync_type, started_at).await
        }

        async fn finish(&self, task_id: &SyncTaskId, completion: &TaskCompletion) -> Result<SyncTask> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(SyncError::Database("database is locked".to_string()));
            }
            self.inner.finish(task_id, completion).await
        }

        async fn renew(&self, task_id: &SyncTaskId, now: i64) -> Result<bool> {
            self.inner.renew(task_id, now).await
        }

        async fn find_by_id(&self, task_id: &SyncTaskId) -> Result<Option<SyncTask>> {
            self.inner.find_by_id(task_id).await
        }

        async fn find_open(&self, server_id: &ServerId) -> Result<Option<SyncTask>> {
            self.inner.find_open(server_id).await
        }

        async fn last_successful(
            &self,
            server_id: &ServerId,
            sync_types: &[SyncType],
        ) -> Result<Option<SyncTask>> {
            self.inner.last_successful(server_id, sync_types).await
        }

        async fn history(&self, server_id: &ServerId, limit: u32) -> Result<Vec<SyncTask>> {
            self.inner.history(server_id, limit).await
        }

        async fn recover_abandoned(&self, now: i64) -> Result<u64> {
            self.inner.recover_abandoned(now).await
        }
    }

    async fn flaky_setup(failures: u32, policy: RetryPolicy) -> (ResultLogger, Arc<FlakyLedger>) {
        let pool = create_test_pool().await.unwrap();
        insert_test_server(&pool, "srv-1").await.unwrap();
        let ledger = Arc::new(FlakyLedger {
            inner: SqliteSyncTaskLedger::new(pool),
            failures: AtomicU32::new(failures),
        });
        let logger = ResultLogger::new(
            ledger.clone(),
            EventBus::new(16),
            Arc::new(FixedClock::at(1_700_000_010)),
        )
        .with_close_retry(policy);
        (logger, ledger)
    }

    fn quick_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(10),
            factor: 2,
            max_delay: Duration::from_millis(50),
        }
    }

    async fn setup() -> (ResultLogger, Arc<SqliteSyncTaskLedger>, EventBus) {
        let pool = create_test_pool().await.unwrap();
        insert_test_server(&pool, "srv-1").await.unwrap();
        let ledger = Arc::new(SqliteSyncTaskLedger::new(pool));
        let events = EventBus::new(16);
        let clock = Arc::new(FixedClock::at(1_700_000_045));
        let logger = ResultLogger::new(ledger.clone(), events.clone(), clock);
        (logger, ledger, events)
    }

    #[tokio::test]
    async fn test_records_success() {
        let (logger, ledger, events) = setup().await;
        let mut rx = events.subscribe();
        let job = Job::new(JobKind::UsersSync, ServerId::from("srv-1"), Trigger::Manual);
        let task = ledger
            .try_begin(&job.server_id, job.kind.sync_type(), 1_700_000_000)
            .await
            .unwrap()
            .unwrap();

        let stats = SyncTaskStats {
            added: 3,
            ..Default::default()
        };
        let closed = logger
            .record(&job, &task, stats, None, Duration::from_millis(40))
            .await;

        assert!(closed.is_success());
        assert_eq!(closed.stats.added, 3);
        assert_eq!(closed.duration_secs(), Some(45));
        match rx.recv().await.unwrap() {
            CoreEvent::Sync(SyncEvent::Completed { duration_ms, counts, .. }) => {
                assert_eq!(duration_ms, 40);
                assert_eq!(counts.added, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_records_failure() {
        let (logger, ledger, events) = setup().await;
        let mut rx = events.subscribe();
        let job = Job::new(JobKind::FullSync, ServerId::from("srv-1"), Trigger::Periodic);
        let task = ledger
            .try_begin(&job.server_id, job.kind.sync_type(), 1_700_000_000)
            .await
            .unwrap()
            .unwrap();

        let error = SyncError::Transient {
            message: "HTTP 503".to_string(),
            attempts: 4,
        };
        let closed = logger
            .record(&job, &task, SyncTaskStats::default(), Some(&error), Duration::ZERO)
            .await;

        assert_eq!(closed.error_code, Some(ErrorCode::Transient));
        let stored = ledger.find_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.error_code, Some(ErrorCode::Transient));
        assert!(stored.error_message.unwrap().contains("503"));

        match rx.recv().await.unwrap() {
            CoreEvent::Sync(SyncEvent::Failed { error_code, recoverable, .. }) => {
                assert_eq!(error_code, "transient");
                assert!(recoverable);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_is_retried_after_database_error() {
        let (logger, ledger) = flaky_setup(1, quick_retry(2)).await;
        let job = Job::new(JobKind::ItemsSync, ServerId::from("srv-1"), Trigger::Manual);
        let task = ledger
            .try_begin(&job.server_id, job.kind.sync_type(), 1_700_000_000)
            .await
            .unwrap()
            .unwrap();

        let closed = logger
            .record(&job, &task, SyncTaskStats::default(), None, Duration::ZERO)
            .await;

        assert!(closed.is_success());
        let stored = ledger.find_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.completed_at, Some(1_700_000_010));
        assert!(ledger.find_open(&job.server_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_gives_up_after_retries() {
        let (logger, ledger) = flaky_setup(5, quick_retry(1)).await;
        let job = Job::new(JobKind::UsersSync, ServerId::from("srv-1"), Trigger::Manual);
        let task = ledger
            .try_begin(&job.server_id, job.kind.sync_type(), 1_700_000_000)
            .await
            .unwrap()
            .unwrap();

        logger
            .record(&job, &task, SyncTaskStats::default(), None, Duration::ZERO)
            .await;

        // Two attempts made; the row stays open until its lease runs out
        assert_eq!(ledger.failures.load(Ordering::SeqCst), 3);
        assert!(ledger.find_open(&job.server_id).await.unwrap().is_some());
        assert_eq!(ledger.recover_abandoned(1_700_000_121).await.unwrap(), 1);
        assert!(ledger.find_open(&job.server_id).await.unwrap().is_none());
    }
}

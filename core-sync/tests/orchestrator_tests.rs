//! Integration tests for the sync orchestrator
//!
//! These tests drive the full stack (scheduler, sequencer, runner, workers,
//! ledger and repositories) against an in-memory database and a fake media
//! server:
//! - One open task per server under concurrent submissions
//! - Idempotent full syncs
//! - Incremental item sync picking up exactly the new item
//! - Partial failures keeping earlier steps
//! - Independent servers
//! - Retry bound and backoff gaps
//! - Server removal and startup recovery
//! - Recovery leaving tasks of live runners alone

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media_server::{
    ListRequest, MediaServerApi, RemoteActivity, RemoteItem, RemoteLibrary, RemotePage,
    RemoteUser, ServerConnection, SortOrder,
};
use bridge_traits::time::{Clock, SystemClock};
use core_library::db::{create_test_pool, insert_test_server};
use core_library::models::ServerId;
use core_library::repositories::{
    ActivityRepository, ItemRepository, SqliteActivityRepository, SqliteItemRepository,
};
use core_runtime::config::{RetrySettings, SchedulerSettings};
use core_runtime::events::EventBus;
use core_sync::{
    Admission, ErrorCode, JobKind, RejectReason, SqliteSyncTaskLedger, SyncOrchestrator,
    SyncSettings, SyncTaskLedger, SyncType,
};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Fake Media Server
// ============================================================================

const OLD_ITEM_EPOCH: i64 = 1_600_000_000;

#[derive(Default)]
struct FakeState {
    items: Vec<RemoteItem>,
    activities: Vec<RemoteActivity>,
    /// Endpoint name to HTTP status returned on every call
    failures: HashMap<&'static str, u16>,
    /// Server id whose every call fails with the given status
    failing_server: Option<(String, u16)>,
    /// Server id whose every call takes this long
    slow_server: Option<(String, Duration)>,
    calls: Vec<(&'static str, String, Instant)>,
}

/// Media server shared by every registered server id
///
/// Listings are identical for every server; failures can be targeted per
/// endpoint or per server.
struct FakeMediaServer {
    state: Mutex<FakeState>,
    latency: Duration,
}

impl FakeMediaServer {
    fn new(item_count: usize) -> Self {
        let items = (0..item_count)
            .map(|i| item(&format!("item-{:03}", i), Some(OLD_ITEM_EPOCH + i as i64)))
            .collect();
        let activities = (0..5)
            .rev()
            .map(|i| activity(&format!("act-{}", i), OLD_ITEM_EPOCH + i * 60))
            .collect();

        Self {
            state: Mutex::new(FakeState {
                items,
                activities,
                ..Default::default()
            }),
            latency: Duration::ZERO,
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn fail_endpoint(&self, endpoint: &'static str, status: u16) {
        self.state.lock().unwrap().failures.insert(endpoint, status);
    }

    fn fail_server(&self, server_id: &str, status: u16) {
        self.state.lock().unwrap().failing_server = Some((server_id.to_string(), status));
    }

    fn slow_down_server(&self, server_id: &str, latency: Duration) {
        self.state.lock().unwrap().slow_server = Some((server_id.to_string(), latency));
    }

    fn push_item(&self, remote: RemoteItem) {
        self.state.lock().unwrap().items.push(remote);
    }

    fn calls(&self, endpoint: &str) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(e, _, _)| *e == endpoint)
            .map(|(_, _, at)| *at)
            .collect()
    }

    async fn call(&self, endpoint: &'static str, connection: &ServerConnection) -> BridgeResult<()> {
        let latency = match &self.state.lock().unwrap().slow_server {
            Some((id, latency)) if *id == connection.server_id => *latency,
            _ => self.latency,
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push((endpoint, connection.server_id.clone(), Instant::now()));

        let status = match &state.failing_server {
            Some((id, status)) if *id == connection.server_id => Some(*status),
            _ => state.failures.get(endpoint).copied(),
        };
        match status {
            Some(status) => Err(BridgeError::Http {
                status,
                message: format!("{} failed", endpoint),
            }),
            None => Ok(()),
        }
    }
}

fn page_of<T: Clone>(all: &[T], request: ListRequest) -> RemotePage<T> {
    let start = (request.start_index as usize).min(all.len());
    let end = (start + request.limit as usize).min(all.len());
    RemotePage {
        records: all[start..end].to_vec(),
        malformed: 0,
        total: Some(all.len() as u64),
    }
}

#[async_trait]
impl MediaServerApi for FakeMediaServer {
    async fn list_users(
        &self,
        connection: &ServerConnection,
        _request: ListRequest,
    ) -> BridgeResult<RemotePage<RemoteUser>> {
        self.call("users", connection).await?;
        Ok(RemotePage::complete(
            ["alice", "bob", "carol"]
                .iter()
                .map(|name| RemoteUser {
                    id: format!("user-{}", name),
                    name: Some(name.to_string()),
                    is_administrator: *name == "alice",
                    last_login_at: None,
                    last_activity_at: None,
                })
                .collect(),
        ))
    }

    async fn list_libraries(
        &self,
        connection: &ServerConnection,
        _request: ListRequest,
    ) -> BridgeResult<RemotePage<RemoteLibrary>> {
        self.call("libraries", connection).await?;
        Ok(RemotePage::complete(vec![
            RemoteLibrary {
                id: "lib-movies".to_string(),
                name: Some("Movies".to_string()),
                collection_type: Some("movies".to_string()),
            },
            RemoteLibrary {
                id: "lib-shows".to_string(),
                name: Some("Shows".to_string()),
                collection_type: Some("tvshows".to_string()),
            },
        ]))
    }

    async fn list_items(
        &self,
        connection: &ServerConnection,
        request: ListRequest,
    ) -> BridgeResult<RemotePage<RemoteItem>> {
        self.call("items", connection).await?;
        let mut items = self.state.lock().unwrap().items.clone();
        items.sort_by_key(|i| i.date_created);
        if request.order == SortOrder::Descending {
            items.reverse();
        }
        Ok(page_of(&items, request))
    }

    async fn list_activities(
        &self,
        connection: &ServerConnection,
        request: ListRequest,
    ) -> BridgeResult<RemotePage<RemoteActivity>> {
        self.call("activities", connection).await?;
        let activities = self.state.lock().unwrap().activities.clone();
        Ok(page_of(&activities, request))
    }
}

fn item(id: &str, date_created: Option<i64>) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: Some(format!("Item {}", id)),
        item_type: Some("Movie".to_string()),
        parent_id: Some("lib-movies".to_string()),
        date_created,
        run_time_ticks: Some(72_000_000_000),
        production_year: Some(2020),
    }
}

fn activity(id: &str, date: i64) -> RemoteActivity {
    RemoteActivity {
        id: id.to_string(),
        name: Some(format!("alice is playing {}", id)),
        overview: None,
        activity_type: Some("VideoPlayback".to_string()),
        item_id: None,
        user_id: Some("user-alice".to_string()),
        severity: Some("Information".to_string()),
        date: Some(date),
    }
}

// ============================================================================
// Setup
// ============================================================================

struct Harness {
    orchestrator: SyncOrchestrator,
    api: Arc<FakeMediaServer>,
    pool: SqlitePool,
}

fn settings(max_retries: u32) -> SyncSettings {
    SyncSettings {
        scheduler: SchedulerSettings {
            periodic_sync_enabled: false,
            ..Default::default()
        },
        retry: RetrySettings {
            max_retries,
            base_delay: Duration::from_millis(50),
            factor: 2,
            max_delay: Duration::from_secs(1),
        },
        page_size: 100,
    }
}

async fn harness(api: FakeMediaServer, settings: SyncSettings, servers: &[&str]) -> Harness {
    let pool = create_test_pool().await.unwrap();
    for server in servers {
        insert_test_server(&pool, server).await.unwrap();
    }

    let api = Arc::new(api);
    let orchestrator = SyncOrchestrator::new(
        pool.clone(),
        api.clone(),
        settings,
        EventBus::new(256),
        Arc::new(SystemClock),
    );
    orchestrator.start().await.unwrap();

    Harness {
        orchestrator,
        api,
        pool,
    }
}

async fn run(harness: &Harness, server: &str, kind: JobKind) {
    let admission = harness
        .orchestrator
        .submit(&ServerId::from(server), kind)
        .await
        .unwrap();
    assert!(admission.is_accepted(), "unexpected admission {:?}", admission);
    harness.orchestrator.wait_idle().await;
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_submissions_hold_one_open_task() {
    let harness = harness(
        FakeMediaServer::new(10).with_latency(Duration::from_millis(100)),
        settings(0),
        &["srv-1"],
    )
    .await;
    let server = ServerId::from("srv-1");

    let admissions = futures::future::join_all(
        (0..5).map(|_| harness.orchestrator.submit(&server, JobKind::UsersSync)),
    )
    .await;
    let admissions: Vec<Admission> = admissions.into_iter().map(|a| a.unwrap()).collect();

    assert_eq!(admissions.iter().filter(|a| a.is_accepted()).count(), 1);
    assert_eq!(admissions.iter().filter(|a| a.is_queued()).count(), 4);

    let ledger = SqliteSyncTaskLedger::new(harness.pool.clone());
    assert!(ledger.find_open(&server).await.unwrap().is_some());

    harness.orchestrator.wait_idle().await;

    let mut history = harness.orchestrator.history(&server, 10).await.unwrap();
    assert_eq!(history.len(), 5);
    assert!(history.iter().all(|task| task.is_success()));

    // Runs never overlap
    history.sort_by_key(|task| (task.started_at, task.completed_at));
    for pair in history.windows(2) {
        assert!(pair[1].started_at >= pair[0].completed_at.unwrap());
    }
    assert!(ledger.find_open(&server).await.unwrap().is_none());
}

#[tokio::test]
async fn test_full_sync_is_idempotent() {
    let harness = harness(FakeMediaServer::new(150), settings(0), &["srv-1"]).await;
    let server = ServerId::from("srv-1");

    run(&harness, "srv-1", JobKind::FullSync).await;
    run(&harness, "srv-1", JobKind::FullSync).await;

    let history = harness.orchestrator.history(&server, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    let (second, first) = (&history[0], &history[1]);

    // 2 libraries, 3 users, 150 items, 5 activities
    assert_eq!(first.sync_type, SyncType::Full);
    assert_eq!(first.stats.added, 160);
    assert_eq!(second.stats.added, 0);
    assert_eq!(second.stats.updated, 0);
    assert_eq!(second.stats.unchanged, 160);

    let items = SqliteItemRepository::new(harness.pool.clone());
    assert_eq!(items.count_by_server(&server).await.unwrap(), 150);
}

#[tokio::test]
async fn test_full_items_sync_pages_through_listing() {
    let harness = harness(FakeMediaServer::new(150), settings(0), &["srv-1"]).await;

    run(&harness, "srv-1", JobKind::ItemsSync).await;

    assert_eq!(harness.api.calls("items").len(), 2);
    let items = SqliteItemRepository::new(harness.pool.clone());
    assert_eq!(items.count_by_server(&ServerId::from("srv-1")).await.unwrap(), 150);
}

#[tokio::test]
async fn test_recent_items_picks_up_only_new_item() {
    let harness = harness(FakeMediaServer::new(150), settings(0), &["srv-1"]).await;
    let server = ServerId::from("srv-1");

    run(&harness, "srv-1", JobKind::FullSync).await;
    let full_requests = harness.api.calls("items").len();

    let created = SystemClock.unix_timestamp() + 3600;
    harness.api.push_item(item("item-new", Some(created)));
    run(&harness, "srv-1", JobKind::RecentItemsSync).await;

    let latest = &harness.orchestrator.history(&server, 1).await.unwrap()[0];
    assert_eq!(latest.sync_type, SyncType::RecentItems);
    assert!(latest.is_success());
    assert_eq!(latest.stats.added, 1);
    assert_eq!(latest.stats.updated, 0);

    // The first newest-first page already reaches the cursor
    assert_eq!(harness.api.calls("items").len(), full_requests + 1);

    let items = SqliteItemRepository::new(harness.pool.clone());
    assert_eq!(items.count_by_server(&server).await.unwrap(), 151);
    assert!(items
        .find_by_external_id(&server, "item-new")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_recent_items_without_cursor_runs_full() {
    let harness = harness(FakeMediaServer::new(120), settings(0), &["srv-1"]).await;

    run(&harness, "srv-1", JobKind::RecentItemsSync).await;

    let items = SqliteItemRepository::new(harness.pool.clone());
    assert_eq!(items.count_by_server(&ServerId::from("srv-1")).await.unwrap(), 120);
}

#[tokio::test]
async fn test_failed_step_keeps_earlier_steps() {
    let api = FakeMediaServer::new(150);
    api.fail_endpoint("activities", 500);
    let harness = harness(api, settings(0), &["srv-1"]).await;
    let server = ServerId::from("srv-1");

    run(&harness, "srv-1", JobKind::FullSync).await;

    let task = &harness.orchestrator.history(&server, 1).await.unwrap()[0];
    assert_eq!(task.error_code, Some(ErrorCode::Transient));
    assert!(task.error_message.as_deref().unwrap().contains("500"));
    assert_eq!(task.stats.added, 155);

    let items = SqliteItemRepository::new(harness.pool.clone());
    assert_eq!(items.count_by_server(&server).await.unwrap(), 150);
    let activities = SqliteActivityRepository::new(harness.pool.clone());
    assert_eq!(activities.count_by_server(&server).await.unwrap(), 0);
}

#[tokio::test]
async fn test_servers_sync_independently() {
    let api = FakeMediaServer::new(20).with_latency(Duration::from_millis(10));
    api.fail_server("srv-bad", 401);
    let harness = harness(api, settings(2), &["srv-good", "srv-bad"]).await;

    let good = ServerId::from("srv-good");
    let bad = ServerId::from("srv-bad");
    let first = harness.orchestrator.submit(&good, JobKind::FullSync).await.unwrap();
    let second = harness.orchestrator.submit(&bad, JobKind::FullSync).await.unwrap();
    assert!(first.is_accepted());
    assert!(second.is_accepted());
    harness.orchestrator.wait_idle().await;

    let good_task = &harness.orchestrator.history(&good, 1).await.unwrap()[0];
    assert!(good_task.is_success());

    let bad_task = &harness.orchestrator.history(&bad, 1).await.unwrap()[0];
    assert_eq!(bad_task.error_code, Some(ErrorCode::Unauthorized));

    let items = SqliteItemRepository::new(harness.pool.clone());
    assert_eq!(items.count_by_server(&good).await.unwrap(), 20);
    assert_eq!(items.count_by_server(&bad).await.unwrap(), 0);
}

#[tokio::test]
async fn test_short_job_overtakes_long_job_on_other_server() {
    let api = FakeMediaServer::new(10);
    api.slow_down_server("srv-slow", Duration::from_millis(150));
    let harness = harness(api, settings(0), &["srv-slow", "srv-fast"]).await;

    let slow = ServerId::from("srv-slow");
    let fast = ServerId::from("srv-fast");
    harness.orchestrator.submit(&slow, JobKind::FullSync).await.unwrap();
    harness.orchestrator.submit(&fast, JobKind::UsersSync).await.unwrap();

    harness.orchestrator.wait_server_idle(&fast).await;
    let ledger = SqliteSyncTaskLedger::new(harness.pool.clone());
    assert!(ledger.find_open(&slow).await.unwrap().is_some());
    assert!(harness.orchestrator.history(&fast, 1).await.unwrap()[0].is_success());

    harness.orchestrator.wait_idle().await;
    assert!(ledger.find_open(&slow).await.unwrap().is_none());
}

#[tokio::test]
async fn test_transient_failure_retried_with_backoff() {
    let api = FakeMediaServer::new(0);
    api.fail_endpoint("users", 503);
    let harness = harness(api, settings(2), &["srv-1"]).await;

    run(&harness, "srv-1", JobKind::UsersSync).await;

    // Wall clock: the in-memory pool cannot run under paused time. Exact
    // offsets are asserted in the retry module's unit tests.
    let calls = harness.api.calls("users");
    assert_eq!(calls.len(), 3);
    assert!(calls[1] - calls[0] >= Duration::from_millis(50));
    assert!(calls[2] - calls[1] >= Duration::from_millis(100));

    let task = &harness
        .orchestrator
        .history(&ServerId::from("srv-1"), 1)
        .await
        .unwrap()[0];
    assert_eq!(task.error_code, Some(ErrorCode::Transient));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let api = FakeMediaServer::new(0);
    api.fail_endpoint("libraries", 401);
    let harness = harness(api, settings(3), &["srv-1"]).await;

    run(&harness, "srv-1", JobKind::LibrariesSync).await;

    assert_eq!(harness.api.calls("libraries").len(), 1);
}

#[tokio::test]
async fn test_remove_server_deletes_mirror_and_keeps_history() {
    let harness = harness(FakeMediaServer::new(30), settings(0), &["srv-1"]).await;
    let server = ServerId::from("srv-1");

    run(&harness, "srv-1", JobKind::FullSync).await;
    assert!(harness.orchestrator.remove_server(&server).await.unwrap());

    let items = SqliteItemRepository::new(harness.pool.clone());
    assert_eq!(items.count_by_server(&server).await.unwrap(), 0);
    assert_eq!(harness.orchestrator.history(&server, 10).await.unwrap().len(), 1);

    let admission = harness
        .orchestrator
        .submit(&server, JobKind::FullSync)
        .await
        .unwrap();
    assert_eq!(
        admission,
        Admission::Rejected {
            reason: RejectReason::UnknownServer
        }
    );
    assert!(!harness.orchestrator.remove_server(&server).await.unwrap());
}

#[tokio::test]
async fn test_remove_server_waits_for_running_job() {
    let harness = harness(
        FakeMediaServer::new(10).with_latency(Duration::from_millis(50)),
        settings(0),
        &["srv-1"],
    )
    .await;
    let server = ServerId::from("srv-1");

    harness
        .orchestrator
        .submit(&server, JobKind::FullSync)
        .await
        .unwrap();
    let queued = harness
        .orchestrator
        .submit(&server, JobKind::ItemsSync)
        .await
        .unwrap();
    assert!(queued.is_queued());

    assert!(harness.orchestrator.remove_server(&server).await.unwrap());

    // The running job was closed, the queued one never started
    let history = harness.orchestrator.history(&server, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].is_open());
    assert_eq!(history[0].sync_type, SyncType::Full);
}

#[tokio::test]
async fn test_startup_closes_abandoned_tasks() {
    let pool = create_test_pool().await.unwrap();
    insert_test_server(&pool, "srv-1").await.unwrap();
    let server = ServerId::from("srv-1");

    let ledger = SqliteSyncTaskLedger::new(pool.clone());
    let abandoned = ledger
        .try_begin(&server, SyncType::Full, 1_700_000_000)
        .await
        .unwrap()
        .unwrap();

    let orchestrator = SyncOrchestrator::new(
        pool,
        Arc::new(FakeMediaServer::new(5)),
        settings(0),
        EventBus::new(16),
        Arc::new(SystemClock),
    );
    assert_eq!(orchestrator.start().await.unwrap(), 1);

    let recovered = ledger.find_by_id(&abandoned.id).await.unwrap().unwrap();
    assert_eq!(recovered.error_code, Some(ErrorCode::Interrupted));

    // The slot is free again
    let admission = orchestrator.submit(&server, JobKind::UsersSync).await.unwrap();
    assert!(admission.is_accepted());
    orchestrator.wait_idle().await;
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_server_status_reports_last_runs() {
    let harness = harness(FakeMediaServer::new(5), settings(0), &["srv-1"]).await;
    let server = ServerId::from("srv-1");

    run(&harness, "srv-1", JobKind::UsersSync).await;

    let status = harness.orchestrator.server_status(&server).await.unwrap();
    assert!(status.running.is_none());
    assert!(status.queued.is_empty());
    assert!(!status.removing);
    assert_eq!(
        status.last_success.map(|task| task.sync_type),
        Some(SyncType::Users)
    );
    assert!(status.last_finished.is_some());
}

#[tokio::test]
async fn test_sync_everything_covers_every_server() {
    let harness = harness(FakeMediaServer::new(5), settings(0), &["srv-1", "srv-2"]).await;

    let admissions = harness.orchestrator.sync_everything().await.unwrap();
    assert_eq!(admissions.len(), 2);
    assert!(admissions.iter().all(|(_, admission)| admission.is_accepted()));
    harness.orchestrator.wait_idle().await;

    let activities = SqliteActivityRepository::new(harness.pool.clone());
    for server in ["srv-1", "srv-2"] {
        assert_eq!(
            activities.count_by_server(&ServerId::from(server)).await.unwrap(),
            5
        );
    }
}

#[tokio::test]
async fn test_start_after_admission_keeps_running_task() {
    let pool = create_test_pool().await.unwrap();
    insert_test_server(&pool, "srv-1").await.unwrap();
    let server = ServerId::from("srv-1");

    let orchestrator = SyncOrchestrator::new(
        pool.clone(),
        Arc::new(FakeMediaServer::new(10).with_latency(Duration::from_millis(50))),
        settings(0),
        EventBus::new(64),
        Arc::new(SystemClock),
    );

    let admission = orchestrator.submit(&server, JobKind::FullSync).await.unwrap();
    assert!(admission.is_accepted());
    assert_eq!(orchestrator.start().await.unwrap(), 0);

    let ledger = SqliteSyncTaskLedger::new(pool);
    assert!(ledger.find_open(&server).await.unwrap().is_some());

    orchestrator.wait_idle().await;
    let history = orchestrator.history(&server, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_success());
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_second_instance_leaves_running_task_open() {
    let pool = create_test_pool().await.unwrap();
    insert_test_server(&pool, "srv-1").await.unwrap();
    let server = ServerId::from("srv-1");
    let api = Arc::new(FakeMediaServer::new(10).with_latency(Duration::from_millis(50)));

    let first = SyncOrchestrator::new(
        pool.clone(),
        api.clone(),
        settings(0),
        EventBus::new(64),
        Arc::new(SystemClock),
    );
    first.start().await.unwrap();
    assert!(first.submit(&server, JobKind::FullSync).await.unwrap().is_accepted());

    let second = SyncOrchestrator::new(pool, api, settings(0), EventBus::new(64), Arc::new(SystemClock));
    assert_eq!(second.start().await.unwrap(), 0);

    // The slot is still held by the first instance
    let admission = second.submit(&server, JobKind::UsersSync).await.unwrap();
    assert!(admission.is_queued(), "unexpected admission {:?}", admission);

    first.wait_idle().await;
    let history = first.history(&server, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sync_type, SyncType::Full);
    assert!(history[0].is_success());

    second.shutdown().await;
    first.shutdown().await;
}

#[tokio::test]
async fn test_recent_items_after_readding_server_runs_full() {
    let harness = harness(FakeMediaServer::new(30), settings(0), &["srv-1"]).await;
    let server = ServerId::from("srv-1");

    run(&harness, "srv-1", JobKind::ItemsSync).await;
    assert!(harness.orchestrator.remove_server(&server).await.unwrap());

    // Same id registered again; the old ledger rows are still there
    insert_test_server(&harness.pool, "srv-1").await.unwrap();
    run(&harness, "srv-1", JobKind::RecentItemsSync).await;

    let items = SqliteItemRepository::new(harness.pool.clone());
    assert_eq!(items.count_by_server(&server).await.unwrap(), 30);
    let latest = &harness.orchestrator.history(&server, 1).await.unwrap()[0];
    assert_eq!(latest.sync_type, SyncType::RecentItems);
    assert_eq!(latest.stats.added, 30);
}

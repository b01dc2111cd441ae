//! Core service façade and bootstrap helpers.
//!
//! This crate wires the configured HTTP transport, the Jellyfin provider and
//! the SQLite store into the sync orchestrator, and exposes the operations a
//! host (admin UI, CLI, HTTP API) calls: server registration, manual sync
//! triggers, status and history.
//!
//! Logging is initialized by the host through
//! [`core_runtime::logging::init_logging`] before bootstrapping.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::{MirrorService, ServerRegistration};
//!
//! let config = CoreConfig::builder().database_path("mirror.db").build()?;
//! let service = MirrorService::bootstrap(config).await?;
//! service.start().await?;
//!
//! let (server, _) = service
//!     .add_server(ServerRegistration::new("Living room", "api-key")
//!         .internal_url("http://192.168.1.20:8096"))
//!     .await?;
//! service.run_full_sync(&server.id).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::models::{Server, ServerId};
pub use core_sync::{Admission, JobKind, RejectReason, ServerSyncStatus, SyncTask, SyncType};

use bridge_traits::media_server::MediaServerApi;
use bridge_traits::time::{Clock, SystemClock};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{ServerRepository, SqliteServerRepository};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, ServerEvent};
use core_sync::{SyncOrchestrator, SyncSettings};
use provider_jellyfin::JellyfinConnector;
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Connection details of a server to register or update
#[derive(Clone)]
pub struct ServerRegistration {
    /// Caller-chosen id; generated when absent
    pub id: Option<String>,
    pub name: String,
    pub internal_url: Option<String>,
    pub external_url: Option<String>,
    pub api_key: String,
}

impl ServerRegistration {
    pub fn new(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            internal_url: None,
            external_url: None,
            api_key: api_key.into(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn internal_url(mut self, url: impl Into<String>) -> Self {
        self.internal_url = Some(url.into());
        self
    }

    pub fn external_url(mut self, url: impl Into<String>) -> Self {
        self.external_url = Some(url.into());
        self
    }

    fn into_server(self, now: i64) -> Server {
        let server = Server::new(
            self.name,
            self.internal_url,
            self.external_url,
            self.api_key,
            now,
        );
        match self.id {
            Some(id) => server.with_id(id),
            None => server,
        }
    }
}

impl fmt::Debug for ServerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRegistration")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("internal_url", &self.internal_url)
            .field("external_url", &self.external_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct MirrorService {
    servers: Arc<dyn ServerRepository>,
    orchestrator: Arc<SyncOrchestrator>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl MirrorService {
    /// Open the database and assemble the service from `config`
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        let pool = create_pool(DatabaseConfig::new(config.database_path.clone()))
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        let api = JellyfinConnector::new(config.http_client.clone())
            .with_request_timeout(config.request_timeout);

        Ok(Self::with_parts(
            pool,
            Arc::new(api),
            SyncSettings::from(&config),
            EventBus::new(config.event_buffer_size),
            Arc::new(SystemClock),
        ))
    }

    /// Assemble the service from explicit parts
    pub fn with_parts(
        pool: SqlitePool,
        api: Arc<dyn MediaServerApi>,
        settings: SyncSettings,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let servers: Arc<dyn ServerRepository> = Arc::new(SqliteServerRepository::new(pool.clone()));
        let orchestrator = SyncOrchestrator::new(pool, api, settings, events.clone(), clock.clone());

        Self {
            servers,
            orchestrator: Arc::new(orchestrator),
            events,
            clock,
        }
    }

    /// Recover abandoned tasks and start the periodic timers
    pub async fn start(&self) -> Result<()> {
        let recovered = self.orchestrator.start().await?;
        info!(recovered, "Mirror service started");
        Ok(())
    }

    /// Stop accepting jobs, drop queued ones and wait for running ones
    pub async fn shutdown(&self) {
        self.orchestrator.shutdown().await;
        info!("Mirror service stopped");
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Servers
    // ========================================================================

    /// Register a server and queue its initial full sync
    #[instrument(skip(self, registration), fields(name = %registration.name))]
    pub async fn add_server(&self, registration: ServerRegistration) -> Result<(Server, Admission)> {
        let server = registration.into_server(self.clock.unix_timestamp());
        server.validate()?;
        self.servers.insert(&server).await?;

        info!(server_id = %server.id, "Server registered");
        self.events
            .emit(CoreEvent::Server(ServerEvent::Added {
                server_id: server.id.to_string(),
                name: server.name.clone(),
            }))
            .ok();

        let admission = self.orchestrator.server_added(&server.id).await?;
        Ok((server, admission))
    }

    /// Replace name, URLs and credential of a server; sync history is kept
    #[instrument(skip(self, registration), fields(server_id = %server_id))]
    pub async fn update_server_connection(
        &self,
        server_id: &ServerId,
        registration: ServerRegistration,
    ) -> Result<Server> {
        let existing = self.require_server(server_id).await?;
        if existing.removing {
            return Err(CoreError::InvalidRequest(format!(
                "Server {} is being removed",
                server_id
            )));
        }

        let mut server = registration
            .id(server_id.as_str())
            .into_server(self.clock.unix_timestamp());
        server.created_at = existing.created_at;
        server.validate()?;
        self.servers.update_connection(&server).await?;

        info!("Server connection updated");
        self.events
            .emit(CoreEvent::Server(ServerEvent::Updated {
                server_id: server_id.to_string(),
            }))
            .ok();
        Ok(server)
    }

    /// Remove a server and its mirrored data once its running job finishes
    pub async fn remove_server(&self, server_id: &ServerId) -> Result<bool> {
        Ok(self.orchestrator.remove_server(server_id).await?)
    }

    pub async fn list_servers(&self) -> Result<Vec<Server>> {
        Ok(self.servers.list().await?)
    }

    pub async fn get_server(&self, server_id: &ServerId) -> Result<Option<Server>> {
        Ok(self.servers.find_by_id(server_id).await?)
    }

    // ========================================================================
    // Sync triggers
    // ========================================================================

    pub async fn run_full_sync(&self, server_id: &ServerId) -> Result<Admission> {
        Ok(self.orchestrator.submit(server_id, JobKind::FullSync).await?)
    }

    /// Queue a full sync for every server not being removed
    pub async fn run_sync_everything(&self) -> Result<Vec<(ServerId, Admission)>> {
        Ok(self.orchestrator.sync_everything().await?)
    }

    /// Run a single-domain job (users, libraries, items, activities or a
    /// recent-only variant)
    pub async fn run_domain_sync(&self, server_id: &ServerId, kind: JobKind) -> Result<Admission> {
        if kind.steps().len() != 1 {
            return Err(CoreError::InvalidRequest(format!(
                "{} is not a single-domain job",
                kind
            )));
        }
        Ok(self.orchestrator.submit(server_id, kind).await?)
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub async fn server_status(&self, server_id: &ServerId) -> Result<ServerSyncStatus> {
        self.require_server(server_id).await?;
        Ok(self.orchestrator.server_status(server_id).await?)
    }

    /// Sync tasks of a server, most recent first
    pub async fn history(&self, server_id: &ServerId, limit: u32) -> Result<Vec<SyncTask>> {
        Ok(self.orchestrator.history(server_id, limit).await?)
    }

    /// Wait until no job is running or queued
    pub async fn wait_idle(&self) {
        self.orchestrator.wait_idle().await
    }

    async fn require_server(&self, server_id: &ServerId) -> Result<Server> {
        self.servers
            .find_by_id(server_id)
            .await?
            .ok_or_else(|| CoreError::ServerNotFound(server_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::media_server::{
        ListRequest, RemoteActivity, RemoteItem, RemoteLibrary, RemotePage, RemoteUser,
        ServerConnection,
    };
    use core_library::db::create_test_pool;
    use core_runtime::config::SchedulerSettings;

    struct EmptyServer;

    #[async_trait]
    impl MediaServerApi for EmptyServer {
        async fn list_users(
            &self,
            _connection: &ServerConnection,
            _request: ListRequest,
        ) -> BridgeResult<RemotePage<RemoteUser>> {
            Ok(RemotePage::complete(vec![RemoteUser {
                id: "user-1".to_string(),
                name: Some("alice".to_string()),
                is_administrator: true,
                last_login_at: None,
                last_activity_at: None,
            }]))
        }

        async fn list_libraries(
            &self,
            _connection: &ServerConnection,
            _request: ListRequest,
        ) -> BridgeResult<RemotePage<RemoteLibrary>> {
            Ok(RemotePage::complete(Vec::new()))
        }

        async fn list_items(
            &self,
            _connection: &ServerConnection,
            _request: ListRequest,
        ) -> BridgeResult<RemotePage<RemoteItem>> {
            Ok(RemotePage::complete(Vec::new()))
        }

        async fn list_activities(
            &self,
            _connection: &ServerConnection,
            _request: ListRequest,
        ) -> BridgeResult<RemotePage<RemoteActivity>> {
            Ok(RemotePage::complete(Vec::new()))
        }
    }

    async fn service() -> MirrorService {
        let pool = create_test_pool().await.unwrap();
        let settings = SyncSettings {
            scheduler: SchedulerSettings {
                periodic_sync_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let service = MirrorService::with_parts(
            pool,
            Arc::new(EmptyServer),
            settings,
            EventBus::new(64),
            Arc::new(SystemClock),
        );
        service.start().await.unwrap();
        service
    }

    fn registration() -> ServerRegistration {
        ServerRegistration::new("Living room", "secret-key")
            .id("srv-1")
            .internal_url("http://192.168.1.20:8096/")
    }

    #[tokio::test]
    async fn test_add_server_runs_initial_sync() {
        let service = service().await;
        let mut events = service.events().subscribe();

        let (server, admission) = service.add_server(registration()).await.unwrap();
        assert_eq!(server.id.as_str(), "srv-1");
        assert!(admission.is_accepted());

        match events.recv().await.unwrap() {
            CoreEvent::Server(ServerEvent::Added { server_id, name }) => {
                assert_eq!(server_id, "srv-1");
                assert_eq!(name, "Living room");
            }
            other => panic!("unexpected event {:?}", other),
        }

        service.wait_idle().await;
        let history = service.history(&server.id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sync_type, SyncType::Full);
        assert_eq!(history[0].stats.added, 1);
    }

    #[tokio::test]
    async fn test_add_server_requires_url() {
        let service = service().await;

        let result = service
            .add_server(ServerRegistration::new("No url", "secret-key"))
            .await;
        assert!(matches!(result, Err(CoreError::Library(_))));
        assert!(service.list_servers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_connection_keeps_history() {
        let service = service().await;
        let (server, _) = service.add_server(registration()).await.unwrap();
        service.wait_idle().await;

        let updated = service
            .update_server_connection(
                &server.id,
                ServerRegistration::new("Den", "rotated-key").external_url("https://media.example.org"),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Den");
        assert_eq!(updated.base_url(), Some("https://media.example.org"));
        assert_eq!(updated.created_at, server.created_at);

        let stored = service.get_server(&server.id).await.unwrap().unwrap();
        assert_eq!(stored.api_key, "rotated-key");
        assert_eq!(service.history(&server.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_server() {
        let service = service().await;

        let result = service
            .update_server_connection(&ServerId::from("missing"), registration())
            .await;
        assert!(matches!(result, Err(CoreError::ServerNotFound(_))));
    }

    #[tokio::test]
    async fn test_domain_sync_rejects_composite_jobs() {
        let service = service().await;
        let (server, _) = service.add_server(registration()).await.unwrap();
        service.wait_idle().await;

        let result = service.run_domain_sync(&server.id, JobKind::FullSync).await;
        assert!(matches!(result, Err(CoreError::InvalidRequest(_))));

        let admission = service
            .run_domain_sync(&server.id, JobKind::UsersSync)
            .await
            .unwrap();
        assert!(admission.is_accepted());
        service.wait_idle().await;

        let status = service.server_status(&server.id).await.unwrap();
        assert_eq!(
            status.last_success.map(|task| task.sync_type),
            Some(SyncType::Users)
        );
    }

    #[tokio::test]
    async fn test_remove_server() {
        let service = service().await;
        let (server, _) = service.add_server(registration()).await.unwrap();

        assert!(service.remove_server(&server.id).await.unwrap());
        assert!(service.get_server(&server.id).await.unwrap().is_none());
        assert!(matches!(
            service.server_status(&server.id).await,
            Err(CoreError::ServerNotFound(_))
        ));

        service.shutdown().await;
    }
}

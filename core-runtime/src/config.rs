//! # Core Configuration Module
//!
//! Provides configuration management for the sync orchestrator.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding every dependency and tunable the orchestrator needs. Validation is
//! fail-fast: `build()` rejects inconsistent settings before any database or
//! network resource is touched.
//!
//! ## Required Settings
//!
//! - `database_path` - Location of the local mirror database
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `HttpClient` - HTTP transport (default: reqwest client from
//!   `bridge-native` when the `native-http` feature is enabled)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/mirror/mirror.db")
//!     .worker_pool_size(8)
//!     .recent_sync_interval(Duration::from_secs(120))
//!     .max_retries(5)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::http::HttpClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default number of concurrently running jobs
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;
/// Default interval between recent-items/recent-activities runs
pub const DEFAULT_RECENT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default interval between periodic full syncs
pub const DEFAULT_FULL_SYNC_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Default per-request timeout against external servers
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default listing page size
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Default lease of an open sync task; a running job renews it well before expiry
pub const DEFAULT_TASK_LEASE: Duration = Duration::from_secs(120);

const MAX_WORKER_POOL_SIZE: usize = 64;
const MAX_PAGE_SIZE: u32 = 1000;
const MAX_RETRIES_LIMIT: u32 = 10;
const MIN_TASK_LEASE: Duration = Duration::from_secs(3);

/// Core configuration for the sync orchestrator.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// HTTP transport used by the media server provider
    pub http_client: Arc<dyn HttpClient>,

    /// Worker pool and periodic trigger settings
    pub scheduler: SchedulerSettings,

    /// Backoff for transient failures of external calls
    pub retry: RetrySettings,

    /// Timeout applied to every external request
    pub request_timeout: Duration,

    /// Records requested per listing page
    pub page_size: u32,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Subscriber settings, applied by the host through `init_logging`
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("http_client", &"HttpClient { ... }")
            .field("scheduler", &self.scheduler)
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Worker pool and periodic trigger settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Maximum jobs executing at once, across all servers
    pub worker_pool_size: usize,

    /// Interval of recent-items and recent-activities jobs per server
    pub recent_sync_interval: Duration,

    /// Interval of full sync jobs per server
    pub full_sync_interval: Duration,

    /// Whether periodic timers run at all
    pub periodic_sync_enabled: bool,

    /// How many times a job that failed transiently is resubmitted as a new job
    pub job_resubmit_limit: u32,

    /// How long an open ledger task stays claimed without a renewal.
    /// Tasks past their lease are closed as interrupted.
    pub task_lease: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            recent_sync_interval: DEFAULT_RECENT_SYNC_INTERVAL,
            full_sync_interval: DEFAULT_FULL_SYNC_INTERVAL,
            periodic_sync_enabled: true,
            job_resubmit_limit: 0,
            task_lease: DEFAULT_TASK_LEASE,
        }
    }
}

impl SchedulerSettings {
    /// Validates pool size and intervals.
    pub fn validate(&self) -> Result<()> {
        if self.worker_pool_size == 0 || self.worker_pool_size > MAX_WORKER_POOL_SIZE {
            return Err(Error::Config(format!(
                "Worker pool size must be between 1 and {}",
                MAX_WORKER_POOL_SIZE
            )));
        }

        if self.recent_sync_interval.is_zero() || self.full_sync_interval.is_zero() {
            return Err(Error::Config(
                "Periodic sync intervals must be greater than zero".to_string(),
            ));
        }

        if self.recent_sync_interval > self.full_sync_interval {
            return Err(Error::Config(
                "Recent sync interval cannot exceed the full sync interval".to_string(),
            ));
        }

        if self.task_lease < MIN_TASK_LEASE {
            return Err(Error::Config(format!(
                "Task lease must be at least {}s",
                MIN_TASK_LEASE.as_secs()
            )));
        }

        Ok(())
    }
}

/// Exponential backoff settings.
///
/// Attempt `n` (1-based) that fails transiently is followed by a wait of
/// `base_delay * factor^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Retries after the first attempt; total attempts is `max_retries + 1`
    pub max_retries: u32,
    pub base_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetrySettings {
    /// Validates backoff parameters.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::Config(format!(
                "max_retries cannot exceed {}",
                MAX_RETRIES_LIMIT
            )));
        }

        if self.factor == 0 {
            return Err(Error::Config("Backoff factor must be at least 1".to_string()));
        }

        if self.base_delay > self.max_delay {
            return Err(Error::Config(
                "Base retry delay cannot exceed the maximum delay".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Scheduler and retry settings are consistent
    /// - Request timeout and page size are in range
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        self.scheduler.validate()?;
        self.retry.validate()?;

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "native-http")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_native::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout).map_err(|e| Error::HttpClientUnavailable(e.to_string()))?;

    Ok(Arc::new(client))
}

#[cfg(not(feature = "native-http"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::HttpClientUnavailable(
        "enable the 'native-http' feature or inject one with .http_client()".to_string(),
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    scheduler: SchedulerSettings,
    retry: RetrySettings,
    request_timeout: Option<Duration>,
    page_size: Option<u32>,
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the database file path (required).
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Injects an HTTP client instead of the default reqwest client.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Replaces all scheduler settings at once.
    pub fn scheduler(mut self, settings: SchedulerSettings) -> Self {
        self.scheduler = settings;
        self
    }

    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.scheduler.worker_pool_size = size;
        self
    }

    pub fn recent_sync_interval(mut self, interval: Duration) -> Self {
        self.scheduler.recent_sync_interval = interval;
        self
    }

    pub fn full_sync_interval(mut self, interval: Duration) -> Self {
        self.scheduler.full_sync_interval = interval;
        self
    }

    /// Enables or disables periodic timers (manual triggers always work).
    pub fn periodic_sync(mut self, enabled: bool) -> Self {
        self.scheduler.periodic_sync_enabled = enabled;
        self
    }

    pub fn job_resubmit_limit(mut self, limit: u32) -> Self {
        self.scheduler.job_resubmit_limit = limit;
        self
    }

    pub fn task_lease(mut self, lease: Duration) -> Self {
        self.scheduler.task_lease = lease;
        self
    }

    /// Replaces all retry settings at once.
    pub fn retry(mut self, settings: RetrySettings) -> Self {
        self.retry = settings;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.retry.max_retries = retries;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if:
    /// - The database path is missing
    /// - No HttpClient was injected and no default is available
    /// - Any setting fails validation
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let config = CoreConfig {
            database_path,
            http_client,
            scheduler: self.scheduler,
            retry: self.retry,
            request_timeout,
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

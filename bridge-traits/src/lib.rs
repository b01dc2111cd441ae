//! # Host Bridge Traits
//!
//! Abstractions the sync orchestrator depends on but does not implement itself.
//!
//! ## Overview
//!
//! This crate defines the contract between the orchestrator and the outside
//! world. Each trait represents a capability that is provided by a concrete
//! adapter crate (`bridge-native` for HTTP, `provider-jellyfin` for the media
//! server API) or by a test double.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP with timeouts
//! - [`MediaServerApi`](media_server::MediaServerApi) - Paginated read-only listings
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to a host pipeline
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! must classify transport failures precisely, because the orchestrator uses
//! [`BridgeError::is_transient`] to decide between retrying and failing a job.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across the
//! scheduler's worker tasks.

pub mod error;
pub mod http;
pub mod media_server;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use media_server::{
    ListRequest, MediaServerApi, RemoteActivity, RemoteItem, RemoteLibrary, RemotePage,
    RemoteUser, ServerConnection, SortOrder,
};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};

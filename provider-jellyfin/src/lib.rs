//! # Jellyfin Provider
//!
//! Implements the `MediaServerApi` trait for Jellyfin servers.
//!
//! ## Overview
//!
//! This module provides:
//! - API-key authentication through the `X-Emby-Token` header
//! - Paginated listings of users, library folders, items and activity entries
//! - Per-record decoding so one malformed entry never fails a page
//! - HTTP status classification for the orchestrator's retry policy

pub mod connector;
pub mod error;
pub mod types;

pub use connector::JellyfinConnector;
pub use error::{JellyfinError, Result};

//! # Local Mirror Store
//!
//! Owns the local authoritative database that external media servers are
//! mirrored into, and provides repository patterns for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pooling, schema and migrations
//! - The server registry
//! - Idempotent upserts for users, libraries, items and activity entries,
//!   keyed by (server id, external id)
//! - Paginated read queries for reporting

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};

//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates. Host applications can depend on `mirror-workspace` and
//! enable `native-http` to get the reqwest-backed service without wiring each
//! crate individually.

#[cfg(feature = "native-http")]
pub use core_service::*;

//! # Native Bridge Implementations
//!
//! Concrete adapters for the traits in `bridge-traits` on server and desktop
//! targets.
//!
//! ## Available Adapters
//!
//! - [`ReqwestHttpClient`] - `HttpClient` backed by `reqwest` with rustls

pub mod http;

pub use http::ReqwestHttpClient;

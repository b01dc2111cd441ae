//! Error types for the Jellyfin provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Jellyfin provider errors
#[derive(Error, Debug)]
pub enum JellyfinError {
    /// API key rejected (401/403)
    #[error("Authentication failed (status {status_code}): {message}")]
    AuthenticationFailed { status_code: u16, message: String },

    /// Endpoint or server not found (404)
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    /// Any other non-success status
    #[error("Jellyfin API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Response envelope could not be parsed
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Transport failure from the HTTP bridge
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Jellyfin operations
pub type Result<T> = std::result::Result<T, JellyfinError>;

impl From<JellyfinError> for BridgeError {
    fn from(error: JellyfinError) -> Self {
        match error {
            JellyfinError::AuthenticationFailed {
                status_code,
                message,
            } => BridgeError::Unauthorized(format!("status {}: {}", status_code, message)),
            JellyfinError::NotFound { path } => BridgeError::NotFound(path),
            JellyfinError::ApiError {
                status_code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message,
            },
            JellyfinError::ParseError(msg) => BridgeError::Decode(msg),
            JellyfinError::BridgeError(e) => e,
        }
    }
}

use thiserror::Error;

/// Failures surfaced by bridge implementations.
///
/// Transport-level variants carry enough shape for callers to decide whether
/// an operation is worth retrying; see [`BridgeError::is_transient`].
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure may succeed if the same call is repeated later.
    ///
    /// Timeouts, connection failures, rate limiting and 5xx responses are
    /// transient. Credential and not-found failures never are.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::Timeout(_) | BridgeError::Connection(_) => true,
            BridgeError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            BridgeError::Io(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

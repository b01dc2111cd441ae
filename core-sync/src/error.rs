use bridge_traits::BridgeError;
use core_library::LibraryError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Transient failure after {attempts} attempt(s): {message}")]
    Transient { message: String, attempts: u32 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Server {server_id} is not registered")]
    UnknownServer { server_id: String },

    #[error("Sync task {task_id} not found")]
    TaskNotFound { task_id: String },

    #[error("Sync task {task_id} is already finished")]
    TaskAlreadyFinished { task_id: String },

    #[error("Invalid task ID: {0}")]
    InvalidTaskId(String),

    #[error("Invalid sync type: {0}")]
    InvalidSyncType(String),

    #[error("Invalid error code: {0}")]
    InvalidErrorCode(String),

    #[error("Scheduler is shutting down")]
    ShuttingDown,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Classify an external call failure that will not be retried further
    pub fn from_bridge(error: BridgeError, attempts: u32) -> Self {
        if error.is_transient() {
            return SyncError::Transient {
                message: error.to_string(),
                attempts,
            };
        }

        match error {
            BridgeError::Unauthorized(msg) => SyncError::Unauthorized(msg),
            BridgeError::Http { status, message } if status == 401 || status == 403 => {
                SyncError::Unauthorized(format!("HTTP {}: {}", status, message))
            }
            BridgeError::NotFound(msg) => SyncError::NotFound(msg),
            BridgeError::Http { status: 404, message } => SyncError::NotFound(message),
            BridgeError::Http { status, message } => {
                SyncError::Rejected(format!("HTTP {}: {}", status, message))
            }
            BridgeError::Decode(msg) => SyncError::Rejected(format!("Unreadable response: {}", msg)),
            other => SyncError::Internal(other.to_string()),
        }
    }

    /// Code persisted on the sync task when this error ends a job
    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::Transient { .. } => ErrorCode::Transient,
            SyncError::Unauthorized(_) => ErrorCode::Unauthorized,
            SyncError::NotFound(_) | SyncError::UnknownServer { .. } => ErrorCode::NotFound,
            SyncError::Rejected(_) => ErrorCode::Rejected,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether a later attempt of the same job could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Failure category stored on a closed sync task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Retries exhausted on timeouts, connection failures, 5xx or 429
    Transient,
    /// 401/403 from the external server
    Unauthorized,
    /// 404 from the external server, or the server record disappeared
    NotFound,
    /// Other 4xx or an unreadable response
    Rejected,
    /// Local failure (database, invariant)
    Internal,
    /// Left open by a process that stopped; closed at startup
    Interrupted,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Transient => "transient",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Rejected => "rejected",
            ErrorCode::Internal => "internal",
            ErrorCode::Interrupted => "interrupted",
        }
    }
}

impl FromStr for ErrorCode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transient" => Ok(ErrorCode::Transient),
            "unauthorized" => Ok(ErrorCode::Unauthorized),
            "not_found" => Ok(ErrorCode::NotFound),
            "rejected" => Ok(ErrorCode::Rejected),
            "internal" => Ok(ErrorCode::Internal),
            "interrupted" => Ok(ErrorCode::Interrupted),
            _ => Err(SyncError::InvalidErrorCode(s.to_string())),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_classification() {
        let cases = [
            (BridgeError::Timeout("slow".into()), ErrorCode::Transient),
            (BridgeError::Connection("refused".into()), ErrorCode::Transient),
            (
                BridgeError::Http { status: 503, message: "busy".into() },
                ErrorCode::Transient,
            ),
            (
                BridgeError::Http { status: 429, message: "slow down".into() },
                ErrorCode::Transient,
            ),
            (BridgeError::Unauthorized("bad key".into()), ErrorCode::Unauthorized),
            (
                BridgeError::Http { status: 403, message: "forbidden".into() },
                ErrorCode::Unauthorized,
            ),
            (BridgeError::NotFound("/Items".into()), ErrorCode::NotFound),
            (
                BridgeError::Http { status: 400, message: "bad request".into() },
                ErrorCode::Rejected,
            ),
            (BridgeError::Decode("not json".into()), ErrorCode::Rejected),
            (BridgeError::OperationFailed("boom".into()), ErrorCode::Internal),
        ];

        for (bridge, expected) in cases {
            let description = bridge.to_string();
            let error = SyncError::from_bridge(bridge, 1);
            assert_eq!(error.code(), expected, "{}", description);
            assert_eq!(error.is_transient(), expected == ErrorCode::Transient);
        }
    }

    #[test]
    fn test_error_code_round_trip_strings() {
        for code in [
            ErrorCode::Transient,
            ErrorCode::Unauthorized,
            ErrorCode::NotFound,
            ErrorCode::Rejected,
            ErrorCode::Internal,
            ErrorCode::Interrupted,
        ] {
            assert_eq!(code.as_str().parse::<ErrorCode>().unwrap(), code);
        }
        assert!("bogus".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn test_library_errors_are_internal() {
        let error = SyncError::from(LibraryError::Migration("boom".into()));
        assert_eq!(error.code(), ErrorCode::Internal);
        assert!(!error.is_transient());
    }
}

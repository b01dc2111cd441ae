//! HTTP transport seam
//!
//! The mirror only reads from media servers, so the seam carries GET
//! requests. An implementation performs one attempt per call and returns
//! every received response, whatever its status; retrying is decided by the
//! sync orchestrator, which knows which failures are transient.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// A GET request with its headers and an optional per-request timeout
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::Decode(format!("JSON deserialization failed: {}", e)))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Leading part of the body for error messages, lossily decoded
    pub fn body_snippet(&self, max_chars: usize) -> String {
        String::from_utf8_lossy(&self.body)
            .chars()
            .take(max_chars)
            .collect()
    }
}

/// Transport for media server calls
///
/// Transport failures map to [`BridgeError::Timeout`] and
/// [`BridgeError::Connection`]; any received response is `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body),
        }
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::get("https://media.example.com/Users")
            .header("X-Emby-Token", "secret")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://media.example.com/Users");
        assert_eq!(request.headers.get("X-Emby-Token"), Some(&"secret".to_string()));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_success_range() {
        assert!(response(204, "").is_success());
        assert!(!response(301, "").is_success());
        assert!(!response(503, "").is_success());
    }

    #[test]
    fn test_json_decode_error() {
        let result: Result<serde_json::Value> = response(200, "<html>maintenance</html>").json();
        assert!(matches!(result, Err(BridgeError::Decode(_))));
    }

    #[test]
    fn test_body_snippet() {
        assert_eq!(response(500, "Internal error occurred").body_snippet(8), "Internal");
    }
}

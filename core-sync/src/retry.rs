//! Bounded retry with exponential backoff for external calls
//!
//! Only failures classified transient by [`BridgeError::is_transient`] are
//! retried. Anything else ends the call on the first attempt.

use crate::error::{Result, SyncError};
use bridge_traits::BridgeError;
use core_runtime::config::RetrySettings;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            factor: 1,
            max_delay: Duration::ZERO,
        }
    }

    /// Total number of attempts, including the first
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before attempt `attempt + 1`, given that `attempt` (1-based) failed
    ///
    /// `base_delay * factor^(attempt-1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = self.factor.max(1).checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// # Errors
    ///
    /// The last failure, classified with [`SyncError::from_bridge`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bridge_traits::error::Result<T>>,
    {
        let attempts = self.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(operation, attempt, max_attempts = attempts, "Calling external server");

            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= attempts {
                return Err(self.give_up(operation, error, attempt));
            }

            let delay = self.delay_after(attempt);
            warn!(
                operation,
                attempt,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn give_up(&self, operation: &str, error: BridgeError, attempt: u32) -> SyncError {
        if error.is_transient() {
            warn!(operation, attempts = attempt, error = %error, "Retries exhausted");
        }
        SyncError::from_bridge(error, attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySettings::default().into()
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: settings.base_delay,
            factor: settings.factor,
            max_delay: settings.max_delay,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        (*settings).into()
    }
}

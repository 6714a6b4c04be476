//! Retry and Backoff
//!
//! Wraps individual outbound calls (one provider request, one spreadsheet
//! request) with bounded exponential backoff. Never wraps a whole tool-call
//! loop, so an applied side effect is never replayed.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::AgentError;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (default 2).
    pub max_retries: u32,
    /// Base delay in milliseconds (default 2000).
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (default 10000).
    pub max_delay_ms: u64,
    /// Backoff multiplier (default 2.0).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 2000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that performs exactly one attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate the delay for a given retry (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let clamped = delay_ms.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(clamped)
    }
}

/// Errors that know whether a retry could help.
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

impl Retryable for AgentError {
    fn is_retryable(&self) -> bool {
        AgentError::is_retryable(self)
    }
}

/// Execute an async operation, retrying transient failures.
///
/// Non-retryable errors are returned immediately.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                if attempt >= policy.max_retries {
                    warn!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        err = %err,
                        "max retries exceeded"
                    );
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    err = %err,
                    "retrying after error"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

//! Retry logic.
//!
//! # Responsibilities
//! - Classify failures as transient or fatal
//! - Execute an operation up to `max_attempts` times with exponential backoff + jitter
//! - Return the error from the last attempt, never an earlier one
//!
//! # Design Decisions
//! - Only 429 and 5xx are transient; a failure without a status is always fatal
//! - Attempts are strictly sequential; the backoff is an async sleep
//! - No delay before the first attempt or after the last one

use std::fmt::Display;
use std::future::Future;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Failures that may carry an HTTP-like status code.
pub trait Retryable {
    /// Status code attached to the failure, if any.
    fn status(&self) -> Option<u16>;

    /// Whether another attempt may succeed.
    fn is_retryable(&self) -> bool {
        self.status().is_some_and(is_retryable_status)
    }
}

/// 429 or any 5xx.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Retry parameters for one class of calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,
    /// Exclusive upper bound of the random jitter in milliseconds.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            jitter_ms: 1000,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            jitter_ms: config.jitter_ms,
        }
    }
}

/// Runs fallible async operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails fatally, or attempts run out.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !error.is_retryable() {
                        tracing::debug!(attempt, status = ?error.status(), error = %error, "Fatal failure, not retrying");
                        return Err(error);
                    }
                    if attempt >= max_attempts {
                        tracing::warn!(attempts = attempt, status = ?error.status(), error = %error, "Retry attempts exhausted");
                        return Err(error);
                    }

                    let delay = calculate_backoff(attempt - 1, self.policy.base_delay_ms, self.policy.jitter_ms);
                    tracing::info!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        status = ?error.status(),
                        error = %error,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

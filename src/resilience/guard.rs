//! Breaker-gated, retried execution of a single logical call.
//!
//! ```text
//! execute(category, op)
//!     → registry.breaker(category).guard(..)   gate checked once
//!         → RetryExecutor::run(op)             attempts + backoff
//!     → one success or one failure recorded on the breaker
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::CritterConfig;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{BreakerPolicy, CircuitBreaker, GuardError};
use crate::resilience::registry::{BreakerRegistry, DEFAULT_CATEGORY};
use crate::resilience::retries::{RetryExecutor, RetryPolicy, Retryable};

/// Wraps outbound calls with retry and a per-category circuit breaker.
#[derive(Debug, Clone, Default)]
pub struct ResilientExecutor {
    registry: BreakerRegistry,
    retry: RetryExecutor,
}

impl ResilientExecutor {
    pub fn new(registry: BreakerRegistry, policy: RetryPolicy) -> Self {
        Self {
            registry,
            retry: RetryExecutor::new(policy),
        }
    }

    pub fn from_config(config: &CritterConfig) -> Self {
        Self::new(
            BreakerRegistry::new(BreakerPolicy::from(&config.breaker)),
            RetryPolicy::from(&config.retry),
        )
    }

    pub fn registry(&self) -> &BreakerRegistry {
        &self.registry
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Run `operation` through the breaker for `category`.
    pub async fn execute<F, Fut, T, E>(&self, category: &str, operation: F) -> Result<T, GuardError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let breaker = self.registry.breaker(category);
        self.execute_with(&breaker, operation).await
    }

    /// Run `operation` under the shared [`DEFAULT_CATEGORY`] breaker.
    pub async fn execute_default<F, Fut, T, E>(&self, operation: F) -> Result<T, GuardError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.execute(DEFAULT_CATEGORY, operation).await
    }

    /// Same as [`execute`](Self::execute) against an explicit breaker.
    pub async fn execute_with<F, Fut, T, E>(&self, breaker: &CircuitBreaker, mut operation: F) -> Result<T, GuardError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let category = breaker.category();
        let call_id = Uuid::new_v4();
        let span = tracing::info_span!("resilient_call", %call_id, category);

        async {
            let start = Instant::now();
            let mut attempts: u32 = 0;

            let counted = || {
                attempts += 1;
                metrics::record_attempt(category);
                if attempts > 1 {
                    metrics::record_retry(category);
                }
                operation()
            };

            let result = breaker.guard(|| self.retry.run(counted)).await;

            let outcome = match &result {
                Ok(_) => {
                    tracing::debug!(attempts, "Call succeeded");
                    "success"
                }
                Err(GuardError::CircuitOpen { .. }) => {
                    tracing::debug!("Call rejected, circuit open");
                    "rejected"
                }
                Err(GuardError::Operation(e)) => {
                    tracing::warn!(attempts, status = ?e.status(), error = %e, "Call failed");
                    "failure"
                }
            };
            metrics::record_call(category, outcome, start);

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn executor() -> ResilientExecutor {
        ResilientExecutor::new(BreakerRegistry::default(), RetryPolicy::default())
    }

    fn status(code: u16) -> AiError {
        AiError::Status { status: code, body: String::new() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_then_success() {
        let exec = executor();
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = exec
            .execute("gemini", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if n < 3 { Err(status(503)) } else { Ok("ok") } }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(3000));

        let snap = exec.registry().snapshot("gemini");
        assert!(!snap.is_open);
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_fails_once_and_counts_once() {
        let exec = executor();
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = exec
            .execute("gemini", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(status(404)) }
            })
            .await;

        let err = result.unwrap_err().into_operation().unwrap();
        assert_eq!(err.status(), Some(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(exec.registry().snapshot("gemini").consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_request_increments_failures_by_one() {
        let exec = executor();
        exec.registry().record_failure("openai");

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = exec
            .execute("openai", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(status(400)) }
            })
            .await;

        assert!(!result.unwrap_err().is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(exec.registry().snapshot("openai").consecutive_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_calls_open_breaker() {
        let exec = executor();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let result: Result<(), _> = exec
                .execute("gemini", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(status(500)) }
                })
                .await;
            assert!(!result.unwrap_err().is_circuit_open());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 9);
        assert_eq!(exec.registry().snapshot("gemini").consecutive_failures, 3);

        tokio::time::advance(Duration::from_millis(10)).await;

        let result: Result<(), _> = exec
            .execute("gemini", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), AiError>(()) }
            })
            .await;
        assert!(result.unwrap_err().is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_allowed_after_cooldown() {
        let exec = executor();
        for _ in 0..3 {
            exec.registry().record_failure("anthropic");
        }
        assert!(exec.registry().is_open("anthropic"));

        tokio::time::advance(Duration::from_millis(60_001)).await;

        let result = exec.execute("anthropic", || async { Ok::<_, AiError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
        let snap = exec.registry().snapshot("anthropic");
        assert!(!snap.is_open);
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_intermediate_failures_never_reach_breaker() {
        let exec = executor();
        exec.registry().record_failure("gemini");
        exec.registry().record_failure("gemini");

        // One more counted failure would open the circuit.
        let calls = AtomicU32::new(0);
        let result = exec
            .execute("gemini", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if n < 3 { Err(status(502)) } else { Ok(n) } }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        let snap = exec.registry().snapshot("gemini");
        assert!(!snap.is_open);
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_categories_do_not_share_failures() {
        let exec = executor();
        for _ in 0..3 {
            let _: Result<(), _> = exec.execute("gemini", || async { Err(status(400)) }).await;
        }
        assert!(exec.registry().is_open("gemini"));

        let result = exec.execute("openai", || async { Ok::<_, AiError>("fine") }).await;
        assert_eq!(result.unwrap(), "fine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_category_is_shared() {
        let exec = ResilientExecutor::new(
            BreakerRegistry::new(BreakerPolicy { failure_threshold: 2, cooldown: Duration::from_secs(60) }),
            RetryPolicy { max_attempts: 1, base_delay_ms: 10, jitter_ms: 0 },
        );

        for _ in 0..2 {
            let result: Result<(), _> = exec.execute_default(|| async { Err(status(503)) }).await;
            assert!(!result.unwrap_err().is_circuit_open());
        }

        assert!(exec.registry().is_open(DEFAULT_CATEGORY));
        let result = exec.execute_default(|| async { Ok::<_, AiError>(1) }).await;
        assert!(result.unwrap_err().is_circuit_open());
        assert!(!exec.registry().is_open("gemini"));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_not_logged_above_debug() {
        let exec = executor();
        for _ in 0..3 {
            exec.registry().record_failure("gemini");
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let result = exec.execute("gemini", || async { Ok::<_, AiError>(()) }).await;
        assert!(result.unwrap_err().is_circuit_open());

        let logs = String::from_utf8_lossy(&captured.0.lock()).to_string();
        assert!(!logs.contains("rejected"), "unexpected log output: {}", logs);
        assert!(!logs.contains("WARN"), "unexpected log output: {}", logs);
    }
}

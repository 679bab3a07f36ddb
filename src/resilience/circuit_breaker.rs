//! Circuit breaker for AI provider protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: provider assumed down, calls fail fast
//! - Half-Open: cooldown elapsed, next call is let through as a probe
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Closed: checked lazily on the next call once now - last_failure > cooldown
//! Any → Closed: a call through the breaker succeeds
//! ```
//!
//! # Design Decisions
//! - One breaker per category (provider), held in `BreakerRegistry`
//! - The half-open transition happens inside `is_open()`; there is no timer task
//! - State is a single mutex-guarded unit so concurrent callers never interleave
//!   a read-modify-write

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Error returned by a guarded call.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// The breaker rejected the call; the operation never ran.
    #[error("service '{category}' is currently unavailable, please try again later")]
    CircuitOpen { category: String },

    /// The operation itself failed (after any retries).
    #[error(transparent)]
    Operation(E),
}

impl<E> GuardError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GuardError::CircuitOpen { .. })
    }

    /// The operation's error, if the call got past the breaker.
    pub fn into_operation(self) -> Option<E> {
        match self {
            GuardError::Operation(e) => Some(e),
            GuardError::CircuitOpen { .. } => None,
        }
    }
}

/// Thresholds for one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerPolicy {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time after the last failure before a probe is allowed.
    pub cooldown: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_millis(60_000),
        }
    }
}

impl From<&BreakerConfig> for BreakerPolicy {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            cooldown: Duration::from_millis(config.cooldown_ms),
        }
    }
}

/// Logical state as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    /// Open, but the cooldown has elapsed; the next call will probe.
    HalfOpen,
}

/// Raw breaker counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakerState {
    pub consecutive_failures: u32,
    pub last_failure: Option<Instant>,
    pub is_open: bool,
}

/// Serializable view of a breaker for status output.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub category: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub is_open: bool,
}

/// Circuit breaker tracking one category of calls.
#[derive(Debug)]
pub struct CircuitBreaker {
    category: String,
    policy: BreakerPolicy,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(category: impl Into<String>, policy: BreakerPolicy) -> Self {
        Self {
            category: category.into(),
            policy,
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn policy(&self) -> &BreakerPolicy {
        &self.policy
    }

    /// Whether calls are currently rejected.
    ///
    /// If the circuit is open and the cooldown has strictly elapsed since the
    /// last failure, the breaker is reset to closed as part of this check.
    pub fn is_open(&self) -> bool {
        let mut st = self.state.lock();
        if !st.is_open {
            return false;
        }

        match st.last_failure {
            Some(last) if last.elapsed() > self.policy.cooldown => {
                st.is_open = false;
                st.consecutive_failures = 0;
                tracing::info!(category = %self.category, "Circuit breaker cooldown elapsed, allowing probe");
                metrics::set_breaker_open(&self.category, false);
                false
            }
            _ => true,
        }
    }

    /// Record a failed logical call.
    pub fn record_failure(&self) {
        let mut st = self.state.lock();
        st.consecutive_failures = st.consecutive_failures.saturating_add(1);
        st.last_failure = Some(Instant::now());

        if st.consecutive_failures >= self.policy.failure_threshold {
            if !st.is_open {
                tracing::warn!(
                    category = %self.category,
                    failures = st.consecutive_failures,
                    cooldown_ms = self.policy.cooldown.as_millis() as u64,
                    "Circuit breaker opened"
                );
                metrics::record_breaker_opened(&self.category);
                metrics::set_breaker_open(&self.category, true);
            }
            st.is_open = true;
        } else {
            tracing::debug!(category = %self.category, failures = st.consecutive_failures, "Circuit breaker recorded failure");
        }
    }

    /// Record a successful logical call.
    pub fn record_success(&self) {
        let mut st = self.state.lock();
        if st.is_open {
            tracing::info!(category = %self.category, "Circuit breaker closed");
            metrics::set_breaker_open(&self.category, false);
        }
        st.consecutive_failures = 0;
        st.is_open = false;
    }

    /// Return to the initial closed state, forgetting the last failure.
    pub fn reset(&self) {
        let mut st = self.state.lock();
        *st = BreakerState::default();
        metrics::set_breaker_open(&self.category, false);
    }

    /// Copy of the raw counters.
    pub fn state(&self) -> BreakerState {
        *self.state.lock()
    }

    /// Current logical state without triggering the half-open reset.
    pub fn circuit_state(&self) -> CircuitState {
        self.logical_state(&self.state.lock())
    }

    /// Counters and logical state read under one lock.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let st = self.state.lock();
        BreakerSnapshot {
            category: self.category.clone(),
            state: self.logical_state(&st),
            consecutive_failures: st.consecutive_failures,
            is_open: st.is_open,
        }
    }

    fn logical_state(&self, st: &BreakerState) -> CircuitState {
        if !st.is_open {
            return CircuitState::Closed;
        }
        match st.last_failure {
            Some(last) if last.elapsed() > self.policy.cooldown => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }

    /// Gate `call` on this breaker and record its outcome.
    ///
    /// The gate is checked once; the outcome counts as exactly one success or
    /// one failure, whatever `call` does internally.
    pub async fn guard<F, Fut, T, E>(&self, call: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.is_open() {
            tracing::debug!(category = %self.category, "Circuit breaker open, rejecting call");
            return Err(GuardError::CircuitOpen {
                category: self.category.clone(),
            });
        }

        match call().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(GuardError::Operation(e))
            }
        }
    }
}

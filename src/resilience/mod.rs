//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound AI call:
//!     → guard.rs (one logical call, span + metrics)
//!     → circuit_breaker.rs (gate checked once; reject if open)
//!     → retries.rs (attempt, classify, back off via backoff.rs)
//!     → circuit_breaker.rs (one success or one failure recorded)
//! ```
//!
//! # Design Decisions
//! - Only 429 and 5xx are retried; everything else fails on the first attempt
//! - Retries are invisible to the breaker: a logical call is one event
//! - Breakers are per category (provider) and owned by a registry value,
//!   not a process-wide static
//! - Open → closed is evaluated lazily on the next call, never by a timer

pub mod backoff;
pub mod circuit_breaker;
pub mod guard;
pub mod registry;
pub mod retries;

pub use circuit_breaker::{BreakerPolicy, BreakerSnapshot, BreakerState, CircuitBreaker, CircuitState, GuardError};
pub use guard::ResilientExecutor;
pub use registry::{BreakerRegistry, DEFAULT_CATEGORY};
pub use retries::{is_retryable_status, RetryExecutor, RetryPolicy, Retryable};

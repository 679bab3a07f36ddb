//! CodeCritter: resilient AI completion calls for code review tooling.
//!
//! Every outbound completion runs through a per-provider circuit breaker and
//! a retry loop with exponential backoff and jitter. Providers are tried in
//! configured order until one answers.

pub mod ai;
pub mod config;
pub mod error;
pub mod observability;
pub mod resilience;

pub use ai::{AiService, Generated, Provider};
pub use config::CritterConfig;
pub use error::{AiError, AiResult};
pub use resilience::{BreakerRegistry, CircuitBreaker, GuardError, ResilientExecutor, RetryPolicy};

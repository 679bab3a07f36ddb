//! AI completion subsystem.
//!
//! # Data Flow
//! ```text
//! prompt
//!     → service.rs (provider fallback)
//!     → resilience::ResilientExecutor (breaker gate + retries)
//!     → client.rs (one HTTP request per attempt)
//!     → response.rs (JSON extraction + shape validation)
//!     → Generated { value, provider }
//! ```

pub mod client;
pub mod provider;
pub mod response;
pub mod service;

pub use client::{backends_from_config, CompletionBackend, HttpBackend};
pub use provider::Provider;
pub use response::{AiResponse, CleanCheck, CommitSuggestion, ReviewData, Severity};
pub use service::{AiService, Generated};

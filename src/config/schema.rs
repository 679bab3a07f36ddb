//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for CodeCritter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CritterConfig {
    /// Retry configuration.
    pub retry: RetryConfig,

    /// Circuit breaker configuration (applied to every provider).
    pub breaker: BreakerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// AI providers in fallback order.
    pub providers: Vec<ProviderConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Review filtering.
    pub review: ReviewConfig,
}

impl Default for CritterConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
            timeouts: TimeoutConfig::default(),
            providers: vec![
                ProviderConfig::new("gemini", "gemini-2.5-flash", "GEMINI_API_KEY"),
                ProviderConfig::new("openai", "gpt-4o-mini", "OPENAI_API_KEY"),
                ProviderConfig::new("anthropic", "claude-3-5-haiku-latest", "ANTHROPIC_API_KEY"),
            ],
            observability: ObservabilityConfig::default(),
            review: ReviewConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound (exclusive) of the random jitter in milliseconds.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            jitter_ms: 1000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failed calls before the circuit opens.
    pub failure_threshold: u32,

    /// Cooldown after the last failure before a probe is allowed, in milliseconds.
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 60_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-attempt request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// One AI provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Provider name: "gemini", "openai" or "anthropic".
    pub name: String,

    /// Disabled providers are skipped during fallback.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Model identifier sent to the provider.
    pub model: String,

    /// Override for the API base URL.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl ProviderConfig {
    pub fn new(name: &str, model: &str, api_key_env: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            model: model.to_string(),
            endpoint: None,
            api_key_env: api_key_env.to_string(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Review filtering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Minimum severity shown: "low", "medium" or "high".
    pub threshold: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            threshold: "medium".to_string(),
        }
    }
}

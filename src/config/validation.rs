//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, cooldown > 0)
//! - Check providers are known, unique and have usable endpoints
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CritterConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use crate::ai::provider::Provider;
use crate::ai::response::Severity;
use crate::config::schema::CritterConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("breaker.failure_threshold must be at least 1")]
    ZeroThreshold,

    #[error("breaker.cooldown_ms must be greater than 0")]
    ZeroCooldown,

    #[error("timeouts.request_secs must be greater than 0")]
    ZeroTimeout,

    #[error("at least one provider must be configured")]
    NoProviders,

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("provider '{0}' is configured more than once")]
    DuplicateProvider(String),

    #[error("provider '{0}' has an empty model")]
    EmptyModel(String),

    #[error("provider '{name}' has an invalid endpoint '{endpoint}'")]
    InvalidEndpoint { name: String, endpoint: String },

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("invalid review threshold '{0}' (expected low, medium or high)")]
    InvalidThreshold(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &CritterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }
    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold);
    }
    if config.breaker.cooldown_ms == 0 {
        errors.push(ValidationError::ZeroCooldown);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.providers.is_empty() {
        errors.push(ValidationError::NoProviders);
    }
    let mut seen = HashSet::new();
    for provider in &config.providers {
        if Provider::from_str(&provider.name).is_err() {
            errors.push(ValidationError::UnknownProvider(provider.name.clone()));
        }
        if !seen.insert(provider.name.as_str()) {
            errors.push(ValidationError::DuplicateProvider(provider.name.clone()));
        }
        if provider.model.trim().is_empty() {
            errors.push(ValidationError::EmptyModel(provider.name.clone()));
        }
        if let Some(endpoint) = &provider.endpoint {
            if url::Url::parse(endpoint).is_err() {
                errors.push(ValidationError::InvalidEndpoint {
                    name: provider.name.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if Severity::from_str(&config.review.threshold).is_err() {
        errors.push(ValidationError::InvalidThreshold(config.review.threshold.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

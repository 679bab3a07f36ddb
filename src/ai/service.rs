//! AI request service: every completion goes through the resilient executor.
//!
//! # Responsibilities
//! - Call one provider with retry + circuit breaker
//! - Fall back across providers in configured order
//! - Run response parsing inside the retried operation, so a parse failure
//!   is one fatal attempt rather than a silent success
//!
//! # Design Decisions
//! - Category = provider name; providers never share breaker state
//! - Fallback skips disabled providers and providers whose circuit is open
//! - The error from the last provider tried is returned, not the first

use std::sync::Arc;

use crate::ai::client::{backends_from_config, CompletionBackend};
use crate::ai::provider::Provider;
use crate::ai::response::{self, AiResponse, CommitSuggestion, ReviewData};
use crate::config::CritterConfig;
use crate::error::{AiError, AiResult};
use crate::resilience::{GuardError, ResilientExecutor};

/// A parsed completion and the provider that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub value: T,
    pub provider: Provider,
}

/// Issues AI requests through retry and per-provider circuit breakers.
#[derive(Clone)]
pub struct AiService {
    executor: ResilientExecutor,
    backends: Vec<Arc<dyn CompletionBackend>>,
}

impl AiService {
    pub fn new(executor: ResilientExecutor, backends: Vec<Arc<dyn CompletionBackend>>) -> Self {
        Self { executor, backends }
    }

    pub fn from_config(config: &CritterConfig) -> AiResult<Self> {
        let backends = backends_from_config(&config.providers, &config.timeouts)?;
        Ok(Self::new(ResilientExecutor::from_config(config), backends))
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    pub fn backends(&self) -> &[Arc<dyn CompletionBackend>] {
        &self.backends
    }

    pub fn backend(&self, provider: Provider) -> Option<&Arc<dyn CompletionBackend>> {
        self.backends.iter().find(|b| b.provider() == provider)
    }

    /// Call a single provider. An open circuit surfaces as `GuardError::CircuitOpen`.
    pub async fn generate<T, P>(&self, provider: Provider, prompt: &str, parse: P) -> Result<T, GuardError<AiError>>
    where
        P: Fn(String) -> AiResult<T>,
    {
        let backend = self
            .backend(provider)
            .ok_or_else(|| GuardError::Operation(AiError::UnknownProvider(provider.name().to_string())))?;
        if !backend.is_enabled() {
            return Err(GuardError::Operation(AiError::ProviderDisabled(provider.name().to_string())));
        }
        self.call(backend, prompt, &parse).await
    }

    /// Try each enabled provider in order until one succeeds.
    pub async fn generate_with_fallback<T, P>(&self, prompt: &str, parse: P) -> AiResult<Generated<T>>
    where
        P: Fn(String) -> AiResult<T>,
    {
        let mut last_error = None;

        for backend in &self.backends {
            let provider = backend.provider();
            if !backend.is_enabled() {
                tracing::debug!(provider = %provider, "Provider disabled, skipping");
                continue;
            }

            tracing::info!(provider = %provider, "Trying provider");
            match self.call(backend, prompt, &parse).await {
                Ok(value) => {
                    tracing::info!(provider = %provider, "Generated response");
                    return Ok(Generated { value, provider });
                }
                Err(GuardError::CircuitOpen { .. }) => {
                    tracing::info!(provider = %provider, "Circuit open, skipping provider");
                }
                Err(GuardError::Operation(e)) => {
                    tracing::warn!(provider = %provider, error = %e, "Provider failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(AiError::AllProvidersUnavailable))
    }

    /// Plain-text completion (docstrings, explanations, generated tests).
    pub async fn complete_text(&self, prompt: &str) -> AiResult<Generated<String>> {
        self.generate_with_fallback(prompt, response::parse_plain).await
    }

    /// Structured code review.
    pub async fn review(&self, prompt: &str) -> AiResult<Generated<ReviewData>> {
        self.generate_with_fallback(prompt, response::parse_review).await
    }

    /// Commit message suggestion for a diff.
    pub async fn suggest_commit(&self, prompt: &str) -> AiResult<Generated<CommitSuggestion>> {
        self.generate_with_fallback(prompt, response::parse_commit).await
    }

    /// Any accepted structured response.
    pub async fn structured(&self, prompt: &str) -> AiResult<Generated<AiResponse>> {
        self.generate_with_fallback(prompt, |text| response::parse_and_validate(&text)).await
    }

    async fn call<T, P>(&self, backend: &Arc<dyn CompletionBackend>, prompt: &str, parse: &P) -> Result<T, GuardError<AiError>>
    where
        P: Fn(String) -> AiResult<T>,
    {
        self.executor
            .execute(backend.provider().name(), || {
                let backend = Arc::clone(backend);
                async move { backend.complete(prompt).await.and_then(parse) }
            })
            .await
    }
}

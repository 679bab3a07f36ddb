//! Completion backends.
//!
//! # Responsibilities
//! - Send one prompt to one provider and return the completion text
//! - Map every failure onto `AiError`, keeping the HTTP status when there is one
//!
//! # Design Decisions
//! - One attempt per `complete` call; retries belong to the resilience layer
//! - A provider without an API key is constructed disabled, not rejected
//! - Response bodies are decoded as `serde_json::Value` to tolerate extra fields

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::ai::provider::Provider;
use crate::config::{ProviderConfig, TimeoutConfig};
use crate::error::{AiError, AiResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;
const MAX_ERROR_BODY: usize = 512;

/// Something that turns a prompt into completion text with a single request.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn provider(&self) -> Provider;

    /// Disabled backends are skipped by provider fallback.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str) -> AiResult<String>;
}

/// HTTP backend speaking the provider's public REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    provider: Provider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
    enabled: bool,
    timeout_secs: u64,
    client: Client,
}

impl HttpBackend {
    /// Create a backend. Disabled when `api_key` is `None`.
    pub fn new(
        provider: Provider,
        model: impl Into<String>,
        endpoint: Option<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> AiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AiError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = endpoint
            .unwrap_or_else(|| provider.default_endpoint().to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            provider,
            model: model.into(),
            endpoint,
            enabled: api_key.is_some(),
            api_key,
            api_key_env: format!("{}_API_KEY", provider.name().to_uppercase()),
            timeout_secs,
            client,
        })
    }

    /// Build from config, reading the API key from the configured environment variable.
    pub fn from_config(config: &ProviderConfig, timeouts: &TimeoutConfig) -> AiResult<Self> {
        let provider: Provider = config.name.parse()?;
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.trim().is_empty());

        if config.enabled && api_key.is_none() {
            tracing::info!(provider = %provider, env_var = %config.api_key_env, "No API key found, provider disabled");
        }

        let mut backend = Self::new(
            provider,
            config.model.clone(),
            config.endpoint.clone(),
            api_key,
            timeouts.request_secs,
        )?;
        backend.enabled = backend.enabled && config.enabled;
        backend.api_key_env = config.api_key_env.clone();
        Ok(backend)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn api_key(&self) -> AiResult<&str> {
        self.api_key.as_deref().ok_or_else(|| AiError::MissingApiKey {
            provider: self.provider.name().to_string(),
            env_var: self.api_key_env.clone(),
        })
    }

    fn build_request(&self, prompt: &str) -> AiResult<reqwest::RequestBuilder> {
        let api_key = self.api_key()?;

        let request = match self.provider {
            Provider::Gemini => self
                .client
                .post(format!("{}/models/{}:generateContent", self.endpoint, self.model))
                .header("x-goog-api-key", api_key)
                .json(&json!({
                    "contents": [{ "parts": [{ "text": prompt }] }]
                })),
            Provider::OpenAi => self
                .client
                .post(format!("{}/chat/completions", self.endpoint))
                .bearer_auth(api_key)
                .json(&json!({
                    "model": self.model,
                    "messages": [{ "role": "user", "content": prompt }]
                })),
            Provider::Anthropic => self
                .client
                .post(format!("{}/messages", self.endpoint))
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": ANTHROPIC_MAX_TOKENS,
                    "messages": [{ "role": "user", "content": prompt }]
                })),
        };
        Ok(request)
    }

    fn map_send_error(&self, e: reqwest::Error) -> AiError {
        if e.is_timeout() {
            AiError::Timeout(self.timeout_secs)
        } else {
            AiError::from(e)
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn complete(&self, prompt: &str) -> AiResult<String> {
        let request = self.build_request(prompt)?;

        tracing::debug!(provider = %self.provider, model = %self.model, "Sending completion request");
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            tracing::debug!(provider = %self.provider, status = status.as_u16(), "Provider returned error status");
            return Err(AiError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let value: Value = serde_json::from_str(&body)?;
        extract_text(self.provider, &value)
    }
}

/// Pull the completion text out of a provider's JSON response.
pub fn extract_text(provider: Provider, value: &Value) -> AiResult<String> {
    let text = match provider {
        Provider::Gemini => value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| join_text(parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)))),
        Provider::OpenAi => value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string),
        Provider::Anthropic => value.get("content").and_then(Value::as_array).map(|blocks| {
            join_text(
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(Value::as_str)),
            )
        }),
    };

    match text {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(AiError::InvalidResponse(format!("{} response contained no text", provider.display_name()))),
    }
}

fn join_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join("")
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Build backends for every configured provider, in config order.
pub fn backends_from_config(
    providers: &[ProviderConfig],
    timeouts: &TimeoutConfig,
) -> AiResult<Vec<Arc<dyn CompletionBackend>>> {
    providers
        .iter()
        .map(|p| HttpBackend::from_config(p, timeouts).map(|b| Arc::new(b) as Arc<dyn CompletionBackend>))
        .collect()
}

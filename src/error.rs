//! Errors produced by AI completion calls.

use thiserror::Error;

use crate::resilience::retries::Retryable;

/// Errors that can occur while requesting or decoding a completion.
#[derive(Debug, Error)]
pub enum AiError {
    /// The provider answered with a non-success HTTP status.
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured deadline.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// The response text was not valid JSON.
    #[error("failed to parse AI response as JSON: {0}")]
    Parse(String),

    /// The response was well-formed but not in an accepted shape.
    #[error("invalid AI response: {0}")]
    InvalidResponse(String),

    /// No API key is available for the provider.
    #[error("missing API key for {provider} (set {env_var})")]
    MissingApiKey { provider: String, env_var: String },

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("provider '{0}' is disabled")]
    ProviderDisabled(String),

    /// Every provider was disabled or had an open circuit.
    #[error("all AI services are currently unavailable, please try again later")]
    AllProvidersUnavailable,
}

impl Retryable for AiError {
    fn status(&self) -> Option<u16> {
        match self {
            AiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => AiError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            },
            None => AiError::Transport(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Parse(e.to_string())
    }
}

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

//! Decoding and validation of AI completions.
//!
//! Models wrap JSON in prose or markdown fences, so structured responses are
//! located by taking the span from the first `{` to the last `}` before
//! parsing. Every failure here is fatal to the retry layer: it carries no
//! status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AiError, AiResult};

const REQUIRED_REVIEW_KEYS: [&str; 3] = ["summary", "critique", "suggestions"];

/// Review severity, ordered low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse, falling back to `Medium` for unknown values.
    pub fn parse_lenient(s: &str) -> Severity {
        s.parse().unwrap_or(Severity::Medium)
    }
}

impl FromStr for Severity {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(AiError::InvalidResponse(format!("unknown severity '{}'", other))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewBody {
    pub summary: String,
    pub critique: String,
    pub suggestions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRisk {
    pub risk: String,
    #[serde(rename = "isSafe")]
    pub is_safe: bool,
}

/// A code review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewData {
    pub review: ReviewBody,
    #[serde(rename = "productionRisk")]
    pub production_risk: Vec<ProductionRisk>,
    /// Raw severity as returned by the model; see [`ReviewData::severity`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

impl ReviewData {
    /// Severity if the model supplied one; unknown values read as medium.
    pub fn severity(&self) -> Option<Severity> {
        self.severity.as_deref().map(Severity::parse_lenient)
    }
}

/// A quick "is this code clean" check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanCheck {
    pub issues: Vec<Value>,
    #[serde(rename = "isClean")]
    pub is_clean: bool,
}

/// Commit message suggestion for a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommitSuggestion {
    Ready {
        #[serde(rename = "commitMessage")]
        commit_message: String,
    },
    NotReady { reason: String },
}

/// Any of the accepted structured response shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum AiResponse {
    CleanCheck(CleanCheck),
    Review(ReviewData),
    Commit(CommitSuggestion),
}

/// Slice from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> AiResult<&str> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(AiError::InvalidResponse(
            "AI response did not contain a valid JSON object".to_string(),
        )),
    }
}

/// Parse `text` and accept it only if it matches a known response shape.
pub fn parse_and_validate(text: &str) -> AiResult<AiResponse> {
    let json = extract_json_object(text)?;
    let value: Value = serde_json::from_str(json)?;

    if value.get("issues").is_some_and(Value::is_array) && value.get("isClean").is_some() {
        return decode(value).map(AiResponse::CleanCheck);
    }

    let missing_review_keys: Option<Vec<&'static str>> = match (value.get("review"), value.get("productionRisk")) {
        (Some(review), Some(Value::Array(_))) => Some(
            REQUIRED_REVIEW_KEYS
                .iter()
                .copied()
                .filter(|key| review.get(*key).is_none())
                .collect(),
        ),
        _ => None,
    };
    if let Some(missing) = missing_review_keys {
        if !missing.is_empty() {
            return Err(AiError::InvalidResponse(format!(
                "review object is missing keys: {}",
                missing.join(", ")
            )));
        }
        return decode(value).map(AiResponse::Review);
    }

    if let Some(ready) = value.get("ready") {
        let non_empty = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        match ready.as_bool() {
            Some(true) => {
                if let Some(commit_message) = non_empty("commitMessage") {
                    return Ok(AiResponse::Commit(CommitSuggestion::Ready { commit_message }));
                }
            }
            Some(false) => {
                if let Some(reason) = non_empty("reason") {
                    return Ok(AiResponse::Commit(CommitSuggestion::NotReady { reason }));
                }
            }
            None => {}
        }
    }

    Err(AiError::InvalidResponse("invalid or incomplete AI response format".to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> AiResult<T> {
    serde_json::from_value(value).map_err(|e| AiError::InvalidResponse(e.to_string()))
}

/// Parse a response that must be a review.
pub fn parse_review(text: String) -> AiResult<ReviewData> {
    match parse_and_validate(&text)? {
        AiResponse::Review(review) => Ok(review),
        _ => Err(AiError::InvalidResponse("expected a review response".to_string())),
    }
}

/// Parse a response that must be a commit suggestion.
pub fn parse_commit(text: String) -> AiResult<CommitSuggestion> {
    match parse_and_validate(&text)? {
        AiResponse::Commit(commit) => Ok(commit),
        _ => Err(AiError::InvalidResponse("expected a commit suggestion".to_string())),
    }
}

/// Plain-text completion with any surrounding markdown fence removed.
pub fn parse_plain(text: String) -> AiResult<String> {
    Ok(strip_code_fences(&text))
}

/// Remove a leading "```lang" line and a trailing "```".
pub fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();
    if body.starts_with("```") {
        body = match body.find('\n') {
            Some(newline) => &body[newline + 1..],
            None => body.trim_start_matches('`'),
        };
    }
    if let Some(stripped) = body.trim_end().strip_suffix("```") {
        body = stripped;
    }
    body.trim().to_string()
}

/// Whether a review is worth showing at `threshold`.
///
/// Reviews without a severity always surface.
pub fn should_surface(review: &ReviewData, threshold: Severity) -> bool {
    match review.severity() {
        Some(severity) => severity >= threshold,
        None => true,
    }
}

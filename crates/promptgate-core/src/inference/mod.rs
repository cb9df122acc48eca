//! Inference seam.
//!
//! The pipeline treats the language model as a black box behind
//! [`InferenceClient`]. Every call goes through [`invoke_with_timeout`] so it
//! carries an explicit deadline, and every failure is an [`InferenceError`]
//! the caller can recover from.

pub mod fakes;
pub mod fallback;
pub mod ollama;

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use fallback::FallbackClient;
pub use ollama::{OllamaClient, OllamaConfig};

/// Requested reply shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    Freeform,
    Structured,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub model: String,
    pub prompt: String,
    pub shape: OutputShape,
    /// Deadline for a single attempt.
    pub timeout: Duration,
}

impl InferenceRequest {
    pub fn structured(
        model: impl Into<String>,
        prompt: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            shape: OutputShape::Structured,
            timeout,
        }
    }

    pub fn freeform(
        model: impl Into<String>,
        prompt: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            shape: OutputShape::Freeform,
            timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutput {
    Text(String),
    Structured(Value),
}

impl InferenceOutput {
    /// The reply as a JSON object, pulling one out of free text if needed.
    pub fn into_structured(self) -> Result<Value, InferenceError> {
        match self {
            InferenceOutput::Structured(value) => Ok(value),
            InferenceOutput::Text(text) => extract_json_object(&text),
        }
    }
}

/// Recoverable inference failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

/// A language-inference backend.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceOutput, InferenceError>;

    /// How many sequential attempts one `infer` call may make. The overall
    /// deadline applied by [`invoke_with_timeout`] scales with it.
    fn max_attempts(&self) -> u32 {
        1
    }
}

/// Call `client` with the request's deadline (times the client's attempt
/// count). An elapsed deadline becomes [`InferenceError::Timeout`].
pub async fn invoke_with_timeout(
    client: &dyn InferenceClient,
    request: InferenceRequest,
) -> Result<InferenceOutput, InferenceError> {
    let deadline = request
        .timeout
        .checked_mul(client.max_attempts().max(1))
        .unwrap_or(Duration::MAX);
    match tokio::time::timeout(deadline, client.infer(request)).await {
        Ok(result) => result,
        Err(_) => Err(InferenceError::Timeout(deadline)),
    }
}

/// Structured call: deadline applied, reply coerced to a JSON object.
pub async fn infer_structured(
    client: &dyn InferenceClient,
    model: &str,
    prompt: String,
    timeout: Duration,
) -> Result<Value, InferenceError> {
    invoke_with_timeout(client, InferenceRequest::structured(model, prompt, timeout))
        .await?
        .into_structured()
}

fn greedy_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("object pattern is valid"))
}

/// First balanced `{...}` starting at the first `{`, respecting strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Pull a JSON object out of model text.
///
/// Tries the whole text, then the span from the first `{` to the last `}`,
/// then the first balanced object.
pub fn extract_json_object(text: &str) -> Result<Value, InferenceError> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let candidates = greedy_object_pattern()
        .find(trimmed)
        .map(|m| m.as_str())
        .into_iter()
        .chain(first_balanced_object(trimmed));

    for candidate in candidates {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
    }

    Err(InferenceError::MalformedOutput(
        "no JSON object found in model output".to_string(),
    ))
}

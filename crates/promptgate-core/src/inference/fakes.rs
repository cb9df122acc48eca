//! Scripted inference backend for tests and dry runs.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{InferenceClient, InferenceError, InferenceOutput, InferenceRequest};

/// Canned reply for a scripted call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Json(Value),
    Text(String),
    Fail(InferenceError),
    /// Never answers within any realistic deadline.
    Hang,
}

/// Replies selected by prompt substring (first match wins), with an optional
/// default and per-model failures. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedInference {
    rules: Vec<(String, ScriptedReply)>,
    default: Option<ScriptedReply>,
    failing_models: Vec<(String, InferenceError)>,
    calls: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` when the prompt contains `needle`.
    pub fn on(mut self, needle: impl Into<String>, reply: ScriptedReply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    /// Reply used when no rule matches.
    pub fn with_default(mut self, reply: ScriptedReply) -> Self {
        self.default = Some(reply);
        self
    }

    /// Every request for `model` fails with `error`.
    pub fn fail_model(mut self, model: impl Into<String>, error: InferenceError) -> Self {
        self.failing_models.push((model.into(), error));
        self
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<InferenceRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn reply_for(&self, request: &InferenceRequest) -> ScriptedReply {
        if let Some((_, err)) = self.failing_models.iter().find(|(m, _)| *m == request.model) {
            return ScriptedReply::Fail(err.clone());
        }
        self.rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.default.clone())
            .unwrap_or_else(|| {
                ScriptedReply::Fail(InferenceError::ModelUnavailable(format!(
                    "no scripted reply for model {}",
                    request.model
                )))
            })
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceOutput, InferenceError> {
        let reply = self.reply_for(&request);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }

        match reply {
            ScriptedReply::Json(value) => Ok(InferenceOutput::Structured(value)),
            ScriptedReply::Text(text) => Ok(InferenceOutput::Text(text)),
            ScriptedReply::Fail(err) => Err(err),
            ScriptedReply::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(InferenceError::ModelUnavailable("hung call resumed".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::invoke_with_timeout;
    use serde_json::json;

    #[tokio::test]
    async fn first_matching_rule_wins() {
        let fake = ScriptedInference::new()
            .on("Rust", ScriptedReply::Json(json!({"n": 1})))
            .on("Rust developer", ScriptedReply::Json(json!({"n": 2})));
        let out = fake
            .infer(InferenceRequest::structured(
                "m",
                "Senior Rust developer",
                Duration::from_secs(1),
            ))
            .await
            .unwrap();
        assert_eq!(out, InferenceOutput::Structured(json!({"n": 1})));
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn unscripted_prompt_fails() {
        let fake = ScriptedInference::new();
        let err = fake
            .infer(InferenceRequest::freeform("m", "hello", Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_call_hits_the_deadline() {
        let fake = ScriptedInference::new().with_default(ScriptedReply::Hang);
        let err = invoke_with_timeout(
            &fake,
            InferenceRequest::structured("m", "p", Duration::from_secs(30)),
        )
        .await
        .unwrap_err();
        assert_eq!(err, InferenceError::Timeout(Duration::from_secs(30)));
    }
}

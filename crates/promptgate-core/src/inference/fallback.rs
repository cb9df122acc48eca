//! Ordered model fallback.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{
    invoke_with_timeout, InferenceClient, InferenceError, InferenceOutput, InferenceRequest,
};

/// Tries the requested model, then each fallback model in order, and returns
/// the first success. Every attempt carries the request's own deadline.
pub struct FallbackClient {
    inner: Arc<dyn InferenceClient>,
    fallback_models: Vec<String>,
}

impl FallbackClient {
    pub fn new(inner: Arc<dyn InferenceClient>, fallback_models: Vec<String>) -> Self {
        Self {
            inner,
            fallback_models,
        }
    }

    /// Models tried for a request, requested model first, without duplicates.
    pub fn candidates(&self, requested: &str) -> Vec<String> {
        let mut models = vec![requested.to_string()];
        for model in &self.fallback_models {
            if !models.contains(model) {
                models.push(model.clone());
            }
        }
        models
    }
}

#[async_trait]
impl InferenceClient for FallbackClient {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceOutput, InferenceError> {
        let mut last_error = InferenceError::ModelUnavailable("no models configured".to_string());

        for model in self.candidates(&request.model) {
            info!(model = %model, "trying model");
            let attempt = InferenceRequest {
                model: model.clone(),
                ..request.clone()
            };
            match invoke_with_timeout(self.inner.as_ref(), attempt).await {
                Ok(output) => return Ok(output),
                Err(err) => {
                    warn!(model = %model, error = %err, "model attempt failed");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }

    fn max_attempts(&self) -> u32 {
        let attempts = 1 + self.fallback_models.len();
        u32::try_from(attempts).unwrap_or(u32::MAX)
    }
}

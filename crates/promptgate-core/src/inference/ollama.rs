//! Ollama HTTP backend (`POST /api/generate`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    extract_json_object, InferenceClient, InferenceError, InferenceOutput, InferenceRequest,
    OutputShape,
};

/// Connection settings for an Ollama server.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Server root, e.g. `http://localhost:11434`
    pub base_url: String,
    /// Sampling temperature sent with every request
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// [`InferenceClient`] backed by an Ollama server.
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("promptgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                InferenceError::ModelUnavailable(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }
}

fn map_send_error(err: reqwest::Error, request: &InferenceRequest) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout(request.timeout)
    } else {
        InferenceError::ModelUnavailable(format!("{}: {}", request.model, err))
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceOutput, InferenceError> {
        let body = GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            format: match request.shape {
                OutputShape::Structured => Some("json"),
                OutputShape::Freeform => None,
            },
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };

        debug!(model = %request.model, url = %self.generate_url(), "sending generate request");
        let response = self
            .http_client
            .post(self.generate_url())
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, &request))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(model = %request.model, status = %status, "generate request rejected");
            return Err(InferenceError::ModelUnavailable(format!(
                "{} returned {}: {}",
                request.model,
                status,
                detail.trim()
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            InferenceError::MalformedOutput(format!("unexpected response body: {e}"))
        })?;

        match request.shape {
            OutputShape::Freeform => Ok(InferenceOutput::Text(parsed.response)),
            OutputShape::Structured => {
                extract_json_object(&parsed.response).map(InferenceOutput::Structured)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn structured_request_asks_for_json_format() {
        let body = GenerateRequest {
            model: "qwen2.5-coder:7b",
            prompt: "rate",
            stream: false,
            format: Some("json"),
            options: GenerateOptions { temperature: 0.3 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert!(json["options"]["temperature"].is_number());
    }

    #[test]
    fn freeform_request_omits_format() {
        let body = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: None,
            options: GenerateOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("format").is_none());
    }

    #[test]
    fn generate_url_trims_trailing_slash() {
        let client = OllamaClient::new(OllamaConfig {
            base_url: "http://localhost:11434/".to_string(),
            temperature: 0.3,
        })
        .unwrap();
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");
    }

    #[tokio::test]
    async fn unreachable_server_is_model_unavailable() {
        let client = OllamaClient::new(OllamaConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            temperature: 0.3,
        })
        .unwrap();
        let err = client
            .infer(InferenceRequest::structured(
                "qwen2.5-coder:7b",
                "rate",
                Duration::from_secs(5),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable(_)));
    }
}

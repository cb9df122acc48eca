//! Pipeline configuration from `PROMPTGATE_*` environment variables.
//!
//! Reads:
//! - PROMPTGATE_INFERENCE_URL (default: "http://localhost:11434")
//! - PROMPTGATE_MODEL (default: "qwen2.5-coder:7b")
//! - PROMPTGATE_FALLBACK_MODELS (comma separated, default: none)
//! - PROMPTGATE_INFERENCE_TIMEOUT_SECS (default: 30)
//! - PROMPTGATE_TEMPERATURE (default: 0.3)
//! - PROMPTGATE_DATASET_SIZE (default: 50)
//! - PROMPTGATE_SCHEDULE_SECS (default: 604800, weekly)
//! - PROMPTGATE_RUN_ON_START (default: false)

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::inference::{FallbackClient, InferenceClient, InferenceError, OllamaClient, OllamaConfig};

pub const DEFAULT_INFERENCE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5-coder:7b";
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_DATASET_SIZE: usize = 50;
pub const DEFAULT_SCHEDULE_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Runtime settings shared by the CLI and the daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub inference_url: String,
    pub model: String,
    pub fallback_models: Vec<String>,
    pub inference_timeout: Duration,
    pub temperature: f32,
    pub dataset_size: usize,
    pub schedule: Duration,
    pub run_on_start: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            fallback_models: Vec::new(),
            inference_timeout: Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS),
            temperature: DEFAULT_TEMPERATURE,
            dataset_size: DEFAULT_DATASET_SIZE,
            schedule: Duration::from_secs(DEFAULT_SCHEDULE_SECS),
            run_on_start: false,
        }
    }
}

fn parsed<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|e| ConfigError {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn flag<F>(lookup: &F, var: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(ConfigError {
                var,
                value: v,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |var: &str, default: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let fallback_models = lookup("PROMPTGATE_FALLBACK_MODELS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let timeout_secs: u64 = parsed(
            &lookup,
            "PROMPTGATE_INFERENCE_TIMEOUT_SECS",
            DEFAULT_INFERENCE_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError {
                var: "PROMPTGATE_INFERENCE_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "every inference call needs a positive deadline".to_string(),
            });
        }
        let schedule_secs: u64 =
            parsed(&lookup, "PROMPTGATE_SCHEDULE_SECS", DEFAULT_SCHEDULE_SECS)?;

        Ok(Self {
            inference_url: text("PROMPTGATE_INFERENCE_URL", DEFAULT_INFERENCE_URL),
            model: text("PROMPTGATE_MODEL", DEFAULT_MODEL),
            fallback_models,
            inference_timeout: Duration::from_secs(timeout_secs),
            temperature: parsed(&lookup, "PROMPTGATE_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            dataset_size: parsed(&lookup, "PROMPTGATE_DATASET_SIZE", DEFAULT_DATASET_SIZE)?,
            schedule: Duration::from_secs(schedule_secs),
            run_on_start: flag(&lookup, "PROMPTGATE_RUN_ON_START")?,
        })
    }

    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.inference_url.clone(),
            temperature: self.temperature,
        }
    }

    /// Ollama client, wrapped in a [`FallbackClient`] when fallback models
    /// are configured.
    pub fn inference_client(&self) -> Result<Arc<dyn InferenceClient>, InferenceError> {
        let ollama: Arc<dyn InferenceClient> = Arc::new(OllamaClient::new(self.ollama())?);
        if self.fallback_models.is_empty() {
            return Ok(ollama);
        }
        Ok(Arc::new(FallbackClient::new(
            ollama,
            self.fallback_models.clone(),
        )))
    }

    /// Scheduled runs are disabled when the interval is zero.
    pub fn schedule_interval(&self) -> Option<Duration> {
        (!self.schedule.is_zero()).then_some(self.schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.schedule_interval(), Some(Duration::from_secs(604_800)));
    }

    #[test]
    fn reads_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("PROMPTGATE_MODEL", "llama3"),
            ("PROMPTGATE_FALLBACK_MODELS", "deepseek-r1:latest, mistral ,"),
            ("PROMPTGATE_INFERENCE_TIMEOUT_SECS", "5"),
            ("PROMPTGATE_DATASET_SIZE", "10"),
            ("PROMPTGATE_SCHEDULE_SECS", "0"),
            ("PROMPTGATE_RUN_ON_START", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.model, "llama3");
        assert_eq!(config.fallback_models, vec!["deepseek-r1:latest", "mistral"]);
        assert_eq!(config.inference_timeout, Duration::from_secs(5));
        assert_eq!(config.dataset_size, 10);
        assert!(config.run_on_start);
        assert_eq!(config.schedule_interval(), None);
    }

    #[test]
    fn rejects_garbage_numbers() {
        let err = PipelineConfig::from_lookup(lookup(&[("PROMPTGATE_DATASET_SIZE", "lots")]))
            .unwrap_err();
        assert_eq!(err.var, "PROMPTGATE_DATASET_SIZE");
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = PipelineConfig::from_lookup(lookup(&[(
            "PROMPTGATE_INFERENCE_TIMEOUT_SECS",
            "0",
        )]))
        .unwrap_err();
        assert_eq!(err.var, "PROMPTGATE_INFERENCE_TIMEOUT_SECS");
    }

    #[test]
    fn rejects_unknown_flag_value() {
        assert!(
            PipelineConfig::from_lookup(lookup(&[("PROMPTGATE_RUN_ON_START", "maybe")])).is_err()
        );
    }

    #[test]
    fn fallback_models_widen_the_inference_deadline() {
        let plain = PipelineConfig::default().inference_client().unwrap();
        assert_eq!(plain.max_attempts(), 1);

        let config = PipelineConfig {
            fallback_models: vec!["mistral".to_string(), "llama3".to_string()],
            ..PipelineConfig::default()
        };
        assert_eq!(config.inference_client().unwrap().max_attempts(), 3);
    }
}

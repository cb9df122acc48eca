//! Playback Evaluator.
//!
//! Replays one template over the golden dataset, one inference call at a
//! time, and scores every sample. Failed samples are recorded and excluded
//! from the means; the run only fails when no sample could be scored.

use std::sync::Arc;
use std::time::Duration;

use promptgate_state::{GoldenDataset, GoldenSample, TemplateRecord, TemplateRef};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::domain::scoring::{
    accuracy, consistency, parse_score_triple, summarize, EvaluationResult, SampleError,
    ScoreSummary,
};
use crate::domain::template::Params;
use crate::domain::{PipelineError, Result};
use crate::inference::{infer_structured, InferenceClient, InferenceError};
use crate::metrics::METRICS;
use crate::obs::emit_sample_error;
use crate::template_store::TemplateVersionStore;

/// Everything one template's playback produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackOutcome {
    pub template: TemplateRef,
    pub results: Vec<EvaluationResult>,
    pub errors: Vec<SampleError>,
    pub summary: ScoreSummary,
}

/// Template parameters for a golden sample.
pub fn sample_params(sample: &GoldenSample) -> Params {
    let mut params = Params::new();
    params.insert("title".to_string(), json!(sample.input.title));
    params.insert("description".to_string(), json!(sample.input.description));
    params.insert("skills".to_string(), json!(sample.input.skills));
    params
}

pub struct PlaybackEvaluator {
    templates: Arc<TemplateVersionStore>,
    inference: Arc<dyn InferenceClient>,
    model: String,
    timeout: Duration,
}

impl PlaybackEvaluator {
    pub fn new(
        templates: Arc<TemplateVersionStore>,
        inference: Arc<dyn InferenceClient>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            templates,
            inference,
            model: model.into(),
            timeout,
        }
    }

    async fn score_sample(
        &self,
        template: &TemplateRecord,
        sample: &GoldenSample,
    ) -> std::result::Result<EvaluationResult, InferenceError> {
        let prompt = self.templates.render(template, &sample_params(sample));
        let output =
            infer_structured(self.inference.as_ref(), &self.model, prompt, self.timeout).await?;
        let actual = parse_score_triple(&output)?;

        Ok(EvaluationResult {
            sample_id: sample.sample_id.clone(),
            actual,
            expected: sample.expected,
            accuracy: accuracy(&actual, &sample.expected),
            consistency: consistency(&actual),
        })
    }

    /// Score `template` against every sample of `dataset`.
    pub async fn evaluate(
        &self,
        template: &TemplateRecord,
        dataset: &GoldenDataset,
    ) -> Result<PlaybackOutcome> {
        let template_ref = template.template_ref();
        let mut results = Vec::with_capacity(dataset.len());
        let mut errors = Vec::new();

        for sample in &dataset.samples {
            match self.score_sample(template, sample).await {
                Ok(result) => {
                    debug!(
                        sample_id = %result.sample_id,
                        accuracy = result.accuracy,
                        consistency = result.consistency,
                        "sample scored"
                    );
                    METRICS.inc_samples_scored();
                    results.push(result);
                }
                Err(err) => {
                    emit_sample_error(&template_ref.name, &sample.sample_id, &err);
                    METRICS.inc_sample_errors();
                    errors.push(SampleError {
                        sample_id: sample.sample_id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if results.is_empty() {
            return Err(PipelineError::NoValidSamples {
                template: template_ref.to_string(),
            });
        }

        let summary = summarize(&results, errors.len());
        Ok(PlaybackOutcome {
            template: template_ref,
            results,
            errors,
            summary,
        })
    }
}

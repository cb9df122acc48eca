//! Per-sample scoring for playback evaluation.
//!
//! Accuracy compares the model's score triple with the reference triple.
//! Consistency looks only at the model's own triple and buckets it into
//! one of three fixed values; the quality gate thresholds are calibrated
//! against exactly these buckets.

use promptgate_state::ScoreTriple;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inference::InferenceError;

/// Upper bound of every score dimension.
pub const SCORE_SCALE: f64 = 10.0;

/// Consistency for a hard job that is also rated very fun (implausible).
pub const CONSISTENCY_UNUSUAL: f64 = 0.5;
/// Consistency for an easy job that is also rated dull (mild mismatch).
pub const CONSISTENCY_MILD: f64 = 0.7;
/// Consistency for every other combination.
pub const CONSISTENCY_NORMAL: f64 = 0.9;

/// Outcome of scoring one golden sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub sample_id: String,
    pub actual: ScoreTriple,
    pub expected: ScoreTriple,
    pub accuracy: f64,
    pub consistency: f64,
}

/// A sample excluded from aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleError {
    pub sample_id: String,
    pub reason: String,
}

/// Means over the non-errored samples of one template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub sample_count: usize,
    pub error_count: usize,
    pub mean_accuracy: f64,
    pub mean_consistency: f64,
}

/// `1 - mean(|actual_i - expected_i| / 10)` over the three dimensions,
/// clamped to `[0, 1]`.
pub fn accuracy(actual: &ScoreTriple, expected: &ScoreTriple) -> f64 {
    let distance = (actual.difficulty - expected.difficulty).abs()
        + (actual.prospects - expected.prospects).abs()
        + (actual.fun - expected.fun).abs();
    (1.0 - distance / (3.0 * SCORE_SCALE)).clamp(0.0, 1.0)
}

/// Bucketed plausibility of a triple, independent of the reference.
pub fn consistency(actual: &ScoreTriple) -> f64 {
    let difficulty = actual.difficulty / SCORE_SCALE;
    let fun = actual.fun / SCORE_SCALE;

    if difficulty > 0.7 && fun > 0.8 {
        CONSISTENCY_UNUSUAL
    } else if difficulty < 0.3 && fun < 0.5 {
        CONSISTENCY_MILD
    } else {
        CONSISTENCY_NORMAL
    }
}

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Summarize scored samples. Errored samples only contribute to `error_count`.
pub fn summarize(results: &[EvaluationResult], error_count: usize) -> ScoreSummary {
    let accuracies: Vec<f64> = results.iter().map(|r| r.accuracy).collect();
    let consistencies: Vec<f64> = results.iter().map(|r| r.consistency).collect();
    ScoreSummary {
        sample_count: results.len(),
        error_count,
        mean_accuracy: mean(&accuracies),
        mean_consistency: mean(&consistencies),
    }
}

fn dimension(output: &Value, key: &str) -> Result<f64, InferenceError> {
    let raw = output
        .get(key)
        .ok_or_else(|| InferenceError::MalformedOutput(format!("missing field `{key}`")))?;

    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| InferenceError::MalformedOutput(format!("field `{key}` is not numeric")))?;

    Ok(value.clamp(0.0, SCORE_SCALE))
}

/// Read a [`ScoreTriple`] out of a structured model reply.
///
/// Numeric strings are accepted; values outside `[0, 10]` are clamped.
pub fn parse_score_triple(output: &Value) -> Result<ScoreTriple, InferenceError> {
    if !output.is_object() {
        return Err(InferenceError::MalformedOutput(
            "expected a JSON object".to_string(),
        ));
    }
    Ok(ScoreTriple::new(
        dimension(output, "difficulty")?,
        dimension(output, "prospects")?,
        dimension(output, "fun")?,
    ))
}

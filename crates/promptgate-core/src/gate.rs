//! Quality gate rules engine.
//!
//! Checks a template's mean accuracy and consistency against
//! [`QualityThresholds`] and produces a [`GateVerdict`]. Both thresholds are
//! inclusive and calibrated against the bucketed consistency scale.

use promptgate_state::EvaluationReport;
use serde::{Deserialize, Serialize};

/// Minimum mean accuracy for a passing template.
pub const MIN_ACCURACY: f64 = 0.8;
/// Minimum mean consistency for a passing template.
pub const MIN_CONSISTENCY: f64 = 0.85;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct QualityThresholds {
    pub min_accuracy: f64,
    pub min_consistency: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_accuracy: MIN_ACCURACY,
            min_consistency: MIN_CONSISTENCY,
        }
    }
}

// ---------------------------------------------------------------------------
// Gate rules
// ---------------------------------------------------------------------------

/// A single rule a template must satisfy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateRule {
    /// Mean accuracy must meet or exceed `QualityThresholds::min_accuracy`.
    MinAccuracy,
    /// Mean consistency must meet or exceed `QualityThresholds::min_consistency`.
    MinConsistency,
}

/// A set of gate rules plus the thresholds they reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateRuleSet {
    pub thresholds: QualityThresholds,
    pub rules: Vec<GateRule>,
}

impl GateRuleSet {
    /// Default thresholds with both rules.
    pub fn standard() -> Self {
        Self {
            thresholds: QualityThresholds::default(),
            rules: vec![GateRule::MinAccuracy, GateRule::MinConsistency],
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// A single rule violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub rule: GateRule,
    /// Observed value that fell short.
    pub actual: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateVerdict {
    /// Violations found (empty when passed).
    pub violations: Vec<Violation>,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluate a template's means against every rule in `rule_set`.
pub fn evaluate_gate(rule_set: &GateRuleSet, accuracy: f64, consistency: f64) -> GateVerdict {
    let violations = rule_set
        .rules
        .iter()
        .filter_map(|rule| check_rule(*rule, &rule_set.thresholds, accuracy, consistency))
        .collect();
    GateVerdict { violations }
}

fn check_rule(
    rule: GateRule,
    thresholds: &QualityThresholds,
    accuracy: f64,
    consistency: f64,
) -> Option<Violation> {
    let (actual, required, label) = match rule {
        GateRule::MinAccuracy => (accuracy, thresholds.min_accuracy, "accuracy"),
        GateRule::MinConsistency => (consistency, thresholds.min_consistency, "consistency"),
    };

    (actual < required).then(|| Violation {
        rule,
        actual,
        reason: format!(
            "{} {:.2}% < required {:.2}%",
            label,
            actual * 100.0,
            required * 100.0,
        ),
    })
}

/// Release gate: whether the report's chosen template passed.
pub fn passes_quality_gates(report: &EvaluationReport) -> bool {
    report.aggregate.pass
}

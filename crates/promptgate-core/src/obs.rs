//! Structured observability hooks for promptgate pipeline events.
//!
//! This module provides:
//! - An evaluation-scoped tracing span via [`evaluation_span`]
//! - Emission functions for key lifecycle events: evaluation start/finish,
//!   per-template scores, sample errors, gate verdicts, draft transitions and
//!   publication
//!
//! Events are emitted at `info!` level (configurable via `RUST_LOG`).
//! For JSON output, pass `--json` to the binaries.

use tracing::{info, warn};

/// Span tagging everything inside one evaluation run with its report id and
/// trigger kind. Attach it with `tracing::Instrument` so it survives awaits.
///
/// # Example
///
/// ```ignore
/// orchestrator.run_full_evaluation()
///     .instrument(evaluation_span("report-123", "scheduled"))
///     .await
/// ```
pub fn evaluation_span(report_id: &str, trigger: &str) -> tracing::Span {
    tracing::info_span!("promptgate.evaluation", report_id = %report_id, trigger = %trigger)
}

/// Emit event: evaluation started over `templates` templates and `samples` samples.
pub fn emit_evaluation_started(report_id: &str, templates: usize, samples: usize) {
    info!(
        event = "evaluation.started",
        report_id = %report_id,
        templates = templates,
        samples = samples,
    );
}

/// Emit event: evaluation finished and its report was persisted.
pub fn emit_evaluation_finished(
    report_id: &str,
    duration_ms: u64,
    chosen: Option<&str>,
    passed: bool,
) {
    info!(
        event = "evaluation.finished",
        report_id = %report_id,
        duration_ms = duration_ms,
        chosen = chosen.unwrap_or("none"),
        passed = passed,
    );
}

/// Emit event: one template's playback means.
pub fn emit_template_scored(
    template: &str,
    samples: usize,
    errors: usize,
    accuracy: f64,
    consistency: f64,
) {
    info!(
        event = "template.scored",
        template = %template,
        samples = samples,
        errors = errors,
        accuracy = accuracy,
        consistency = consistency,
    );
}

/// Emit event: a sample was excluded from aggregation (warning level).
pub fn emit_sample_error(template: &str, sample_id: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "sample.error",
        template = %template,
        sample_id = %sample_id,
        error = %error,
    );
}

/// Emit event: a template was gated.
pub fn emit_gate_evaluated(template: &str, accuracy: f64, consistency: f64, passed: bool) {
    info!(
        event = "gate.evaluated",
        template = %template,
        accuracy = accuracy,
        consistency = consistency,
        passed = passed,
    );
}

/// Emit event: a draft moved between review states.
pub fn emit_draft_transition(draft_id: &str, from: &str, to: &str, reviewer: Option<&str>) {
    info!(
        event = "draft.transition",
        draft_id = %draft_id,
        from = %from,
        to = %to,
        reviewer = reviewer.unwrap_or("-"),
    );
}

/// Emit event: a draft was published as a report.
pub fn emit_report_published(draft_id: &str, report_id: &str, published_by: &str) {
    info!(
        event = "report.published",
        draft_id = %draft_id,
        report_id = %report_id,
        published_by = %published_by,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_span_create() {
        let span = evaluation_span("report-1", "run_now");
        let _entered = span.enter();
        emit_evaluation_started("report-1", 2, 10);
    }
}

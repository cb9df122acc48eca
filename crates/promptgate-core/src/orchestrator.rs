//! Evaluation Orchestrator.
//!
//! One full run: load the golden dataset, replay the active template of
//! every task, gate each one, pick the best by mean accuracy, optionally ask
//! for report ideas, and append a single [`EvaluationReport`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use promptgate_state::{
    AggregateScore, EvaluationReport, EvaluationReportStore, GoldenDataset, GoldenDatasetStore,
    ReportIdea, TemplateRef, TemplateScore,
};
use tracing::{warn, Instrument};

use crate::domain::evaluation::{
    accuracy_recommendation, consistency_recommendation, evaluation_error_recommendation,
    idea_prompt, parse_report_ideas,
};
use crate::domain::scoring::ScoreSummary;
use crate::domain::{PipelineError, Result};
use crate::gate::{evaluate_gate, GateRule, GateRuleSet};
use crate::inference::{infer_structured, InferenceClient};
use crate::metrics::METRICS;
use crate::obs;
use crate::playback::PlaybackEvaluator;
use crate::template_store::TemplateVersionStore;

/// Trigger label used when a run is started directly rather than through
/// the trigger service.
pub const DIRECT_TRIGGER: &str = "direct";

struct Candidate {
    template: TemplateRef,
    summary: ScoreSummary,
    passed: bool,
}

pub struct EvaluationOrchestrator {
    templates: Arc<TemplateVersionStore>,
    evaluator: PlaybackEvaluator,
    datasets: Arc<dyn GoldenDatasetStore>,
    reports: Arc<dyn EvaluationReportStore>,
    inference: Arc<dyn InferenceClient>,
    model: String,
    timeout: Duration,
    rules: GateRuleSet,
    suggest_ideas: bool,
}

impl EvaluationOrchestrator {
    pub fn new(
        templates: Arc<TemplateVersionStore>,
        datasets: Arc<dyn GoldenDatasetStore>,
        reports: Arc<dyn EvaluationReportStore>,
        inference: Arc<dyn InferenceClient>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let model = model.into();
        let evaluator = PlaybackEvaluator::new(
            Arc::clone(&templates),
            Arc::clone(&inference),
            model.clone(),
            timeout,
        );
        Self {
            templates,
            evaluator,
            datasets,
            reports,
            inference,
            model,
            timeout,
            rules: GateRuleSet::standard(),
            suggest_ideas: false,
        }
    }

    /// Ask the model for report ideas after scoring.
    pub fn with_ideas(mut self, enabled: bool) -> Self {
        self.suggest_ideas = enabled;
        self
    }

    pub async fn run_full_evaluation(&self) -> Result<EvaluationReport> {
        self.run_evaluation(DIRECT_TRIGGER).await
    }

    /// Run one evaluation, tagging its span and logs with `trigger`.
    pub async fn run_evaluation(&self, trigger: &str) -> Result<EvaluationReport> {
        let report_id = uuid::Uuid::new_v4().to_string();
        let span = obs::evaluation_span(&report_id, trigger);
        self.evaluate_all(report_id).instrument(span).await
    }

    async fn evaluate_all(&self, report_id: String) -> Result<EvaluationReport> {
        let started = Instant::now();

        let stored = self.datasets.load().await?;
        if stored.is_none() {
            warn!(
                report_id = %report_id,
                "no golden dataset built; evaluating against an empty dataset"
            );
        }
        let dataset_digest = stored.as_ref().map(|d| d.digest.clone());
        let dataset = stored.unwrap_or_else(|| GoldenDataset::new(Vec::new(), Utc::now()));

        let tasks = self.templates.active_tasks().await?;
        obs::emit_evaluation_started(&report_id, tasks.len(), dataset.len());

        let mut best: Option<Candidate> = None;
        let mut template_scores = Vec::with_capacity(tasks.len());
        let mut recommendations = Vec::new();

        for task in &tasks {
            let template = match self.templates.get_active(task).await {
                Ok(template) => template,
                Err(err @ PipelineError::NotFound { .. }) => {
                    // Deactivated between listing and lookup.
                    warn!(task = %task, error = %err, "skipping task without an active template");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let outcome = match self.evaluator.evaluate(&template, &dataset).await {
                Ok(outcome) => outcome,
                Err(PipelineError::NoValidSamples { .. }) => {
                    warn!(
                        template = %template.name,
                        task = %task,
                        "template produced no valid samples"
                    );
                    recommendations.push(evaluation_error_recommendation(&template.name));
                    template_scores.push(TemplateScore {
                        template: template.template_ref(),
                        task: task.clone(),
                        sample_count: 0,
                        error_count: dataset.len(),
                        mean_accuracy: 0.0,
                        mean_consistency: 0.0,
                        passed: false,
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };

            let summary = outcome.summary;
            obs::emit_template_scored(
                &template.name,
                summary.sample_count,
                summary.error_count,
                summary.mean_accuracy,
                summary.mean_consistency,
            );

            let verdict = evaluate_gate(
                &self.rules,
                summary.mean_accuracy,
                summary.mean_consistency,
            );
            for violation in &verdict.violations {
                recommendations.push(match violation.rule {
                    GateRule::MinAccuracy => {
                        accuracy_recommendation(&template.name, violation.actual)
                    }
                    GateRule::MinConsistency => {
                        consistency_recommendation(&template.name, violation.actual)
                    }
                });
            }
            let passed = verdict.passed();
            obs::emit_gate_evaluated(
                &template.name,
                summary.mean_accuracy,
                summary.mean_consistency,
                passed,
            );

            template_scores.push(TemplateScore {
                template: outcome.template.clone(),
                task: task.clone(),
                sample_count: summary.sample_count,
                error_count: summary.error_count,
                mean_accuracy: summary.mean_accuracy,
                mean_consistency: summary.mean_consistency,
                passed,
            });

            // Strictly greater: the first template evaluated keeps a tie.
            let better = best
                .as_ref()
                .map_or(true, |b| summary.mean_accuracy > b.summary.mean_accuracy);
            if better {
                best = Some(Candidate {
                    template: outcome.template,
                    summary,
                    passed,
                });
            }
        }

        let (chosen_template, aggregate) = match best {
            Some(c) => (
                Some(c.template),
                AggregateScore {
                    sample_count: c.summary.sample_count,
                    mean_accuracy: c.summary.mean_accuracy,
                    mean_consistency: c.summary.mean_consistency,
                    pass: c.passed,
                },
            ),
            None => (None, AggregateScore::empty()),
        };

        let report_ideas = if self.suggest_ideas {
            self.suggest_report_ideas(&template_scores, &recommendations)
                .await
        } else {
            Vec::new()
        };

        let report = EvaluationReport {
            report_id: report_id.clone(),
            timestamp: Utc::now(),
            chosen_template,
            aggregate,
            template_scores,
            recommendations,
            report_ideas,
            dataset_digest,
        };
        self.reports.append(report.clone()).await?;

        METRICS.inc_evaluations();
        obs::emit_evaluation_finished(
            &report_id,
            started.elapsed().as_millis() as u64,
            report.chosen_template.as_ref().map(|t| t.name.as_str()),
            report.aggregate.pass,
        );
        METRICS.flush();
        Ok(report)
    }

    async fn suggest_report_ideas(
        &self,
        scores: &[TemplateScore],
        recommendations: &[String],
    ) -> Vec<ReportIdea> {
        let prompt = idea_prompt(scores, recommendations);
        let ideas = infer_structured(self.inference.as_ref(), &self.model, prompt, self.timeout)
            .await
            .and_then(|output| parse_report_ideas(&output));
        match ideas {
            Ok(ideas) => ideas,
            Err(err) => {
                warn!(error = %err, "report idea suggestion failed; continuing without ideas");
                Vec::new()
            }
        }
    }

    pub async fn latest_report(&self) -> Result<Option<EvaluationReport>> {
        Ok(self.reports.latest().await?)
    }

    pub async fn get_report(&self, report_id: &str) -> Result<EvaluationReport> {
        self.reports
            .get(report_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("evaluation report", report_id))
    }

    /// All reports, newest first.
    pub async fn list_reports(&self) -> Result<Vec<EvaluationReport>> {
        Ok(self.reports.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::Params;
    use crate::inference::fakes::{ScriptedInference, ScriptedReply};
    use promptgate_state::fakes::{MemoryDatasetStore, MemoryReportStore, MemoryTemplateRegistry};
    use serde_json::json;

    #[tokio::test]
    async fn no_templates_and_no_dataset_yields_empty_failing_report() {
        let templates = Arc::new(TemplateVersionStore::new(Arc::new(
            MemoryTemplateRegistry::new(),
        )));
        let reports = Arc::new(MemoryReportStore::new());
        let orchestrator = EvaluationOrchestrator::new(
            templates,
            Arc::new(MemoryDatasetStore::new()),
            reports.clone(),
            Arc::new(ScriptedInference::new()),
            "test-model",
            Duration::from_secs(5),
        );

        let report = orchestrator.run_full_evaluation().await.unwrap();
        assert!(report.chosen_template.is_none());
        assert_eq!(report.aggregate, AggregateScore::empty());
        assert!(report.dataset_digest.is_none());
        assert_eq!(reports.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_dataset_recommends_fixing_every_template() {
        let templates = Arc::new(TemplateVersionStore::new(Arc::new(
            MemoryTemplateRegistry::new(),
        )));
        templates
            .create_version("job-analysis", "job_analysis", "Rate {{title}}", Params::new())
            .await
            .unwrap();
        let inference = ScriptedInference::new()
            .with_default(ScriptedReply::Json(json!({"difficulty": 5, "prospects": 5, "fun": 5})));
        let orchestrator = EvaluationOrchestrator::new(
            templates,
            Arc::new(MemoryDatasetStore::new()),
            Arc::new(MemoryReportStore::new()),
            Arc::new(inference),
            "test-model",
            Duration::from_secs(5),
        );

        let report = orchestrator.run_full_evaluation().await.unwrap();
        assert_eq!(
            report.recommendations,
            vec!["Fix evaluation errors for job-analysis".to_string()]
        );
        assert!(!report.aggregate.pass);
        assert_eq!(report.template_scores.len(), 1);
        assert!(!report.template_scores[0].passed);
    }

    #[tokio::test]
    async fn get_unknown_report_is_not_found() {
        let orchestrator = EvaluationOrchestrator::new(
            Arc::new(TemplateVersionStore::new(Arc::new(MemoryTemplateRegistry::new()))),
            Arc::new(MemoryDatasetStore::new()),
            Arc::new(MemoryReportStore::new()),
            Arc::new(ScriptedInference::new()),
            "test-model",
            Duration::from_secs(5),
        );
        let err = orchestrator.get_report("missing").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }
}

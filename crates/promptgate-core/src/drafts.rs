//! Draft Publication Workflow.
//!
//! Expands the report ideas of an evaluation into drafts, moves drafts
//! through review and publishes approved drafts exactly once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use promptgate_state::{
    DraftAuthor, DraftContent, DraftReview, DraftStatus, DraftStore, EvaluationReportStore,
    PublishedReport, ReportDraft, ReportIdea, StorageError,
};
use tracing::{info, warn};

use crate::domain::draft::{expansion_prompt, is_allowed_transition, DraftExpansion};
use crate::domain::{PipelineError, Result};
use crate::inference::{infer_structured, InferenceClient, InferenceError};
use crate::metrics::METRICS;
use crate::obs;

pub struct DraftWorkflow {
    reports: Arc<dyn EvaluationReportStore>,
    drafts: Arc<dyn DraftStore>,
    inference: Arc<dyn InferenceClient>,
    model: String,
    timeout: Duration,
}

impl DraftWorkflow {
    pub fn new(
        reports: Arc<dyn EvaluationReportStore>,
        drafts: Arc<dyn DraftStore>,
        inference: Arc<dyn InferenceClient>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            reports,
            drafts,
            inference,
            model: model.into(),
            timeout,
        }
    }

    async fn expand(&self, idea: &ReportIdea) -> std::result::Result<DraftContent, InferenceError> {
        let output = infer_structured(
            self.inference.as_ref(),
            &self.model,
            expansion_prompt(idea),
            self.timeout,
        )
        .await?;
        Ok(DraftExpansion::from_value(&output)?.resolve(idea))
    }

    /// Create one system draft per report idea of `evaluation_id`. Ideas the
    /// model fails to expand are logged and skipped.
    pub async fn generate_from_evaluation(&self, evaluation_id: &str) -> Result<Vec<ReportDraft>> {
        let report = self
            .reports
            .get(evaluation_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("evaluation report", evaluation_id))?;

        if report.report_ideas.is_empty() {
            info!(evaluation_id = %evaluation_id, "evaluation has no report ideas");
            return Ok(Vec::new());
        }

        let mut created = Vec::with_capacity(report.report_ideas.len());
        for idea in &report.report_ideas {
            let content = match self.expand(idea).await {
                Ok(content) => content,
                Err(err) => {
                    warn!(
                        evaluation_id = %evaluation_id,
                        idea = %idea.title,
                        error = %err,
                        "draft expansion failed; skipping idea"
                    );
                    continue;
                }
            };

            let draft = ReportDraft::new(content, DraftAuthor::System, evaluation_id, Utc::now());
            let draft = self.drafts.create(draft).await?;
            info!(
                event = "draft.created",
                draft_id = %draft.draft_id,
                evaluation_id = %evaluation_id,
                title = %draft.content.title,
            );
            METRICS.inc_drafts_generated();
            created.push(draft);
        }
        Ok(created)
    }

    /// Record a human-authored draft against `evaluation_id`.
    pub async fn create_human_draft(
        &self,
        evaluation_id: &str,
        content: DraftContent,
    ) -> Result<ReportDraft> {
        if self.reports.get(evaluation_id).await?.is_none() {
            return Err(PipelineError::not_found("evaluation report", evaluation_id));
        }
        if content.title.trim().is_empty() {
            return Err(PipelineError::PreconditionFailed(
                "draft title must not be empty".to_string(),
            ));
        }
        let draft = ReportDraft::new(content, DraftAuthor::Human, evaluation_id, Utc::now());
        Ok(self.drafts.create(draft).await?)
    }

    pub async fn get(&self, draft_id: &str) -> Result<ReportDraft> {
        self.drafts
            .get(draft_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("draft", draft_id))
    }

    /// Drafts, optionally filtered by status, newest first.
    pub async fn list(&self, status: Option<DraftStatus>) -> Result<Vec<ReportDraft>> {
        Ok(self.drafts.list(status).await?)
    }

    /// Move a draft along one review edge, stamping the review fields.
    pub async fn transition(
        &self,
        draft_id: &str,
        to: DraftStatus,
        reviewer: Option<String>,
        comment: Option<String>,
    ) -> Result<ReportDraft> {
        let current = self.get(draft_id).await?;
        let from = current.status;
        if !is_allowed_transition(from, to) {
            return Err(PipelineError::InvalidTransition { from, to });
        }

        let review = DraftReview {
            status: to,
            reviewed_at: Utc::now(),
            reviewer,
            comment,
        };
        let updated = match self.drafts.update_status(draft_id, from, review).await {
            Ok(updated) => updated,
            Err(StorageError::StatusConflict { actual, .. }) => {
                return Err(PipelineError::InvalidTransition {
                    from: actual.parse().unwrap_or(from),
                    to,
                });
            }
            Err(err) => return Err(err.into()),
        };

        obs::emit_draft_transition(
            draft_id,
            from.as_str(),
            to.as_str(),
            updated.reviewer.as_deref(),
        );
        Ok(updated)
    }

    /// Publish an approved draft. A second call fails the precondition.
    pub async fn publish(&self, draft_id: &str, published_by: &str) -> Result<PublishedReport> {
        if published_by.trim().is_empty() {
            return Err(PipelineError::PreconditionFailed(
                "published_by must not be empty".to_string(),
            ));
        }
        let current = self.get(draft_id).await?;
        if current.status != DraftStatus::Approved {
            return Err(PipelineError::PreconditionFailed(format!(
                "draft {} is {}, expected approved",
                draft_id, current.status
            )));
        }

        let published = match self.drafts.publish(draft_id, published_by, Utc::now()).await {
            Ok(published) => published,
            Err(err @ StorageError::StatusConflict { .. }) => {
                return Err(PipelineError::PreconditionFailed(err.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        obs::emit_draft_transition(
            draft_id,
            DraftStatus::Approved.as_str(),
            DraftStatus::Published.as_str(),
            None,
        );
        obs::emit_report_published(draft_id, &published.report_id, published_by);
        METRICS.inc_reports_published();
        Ok(published)
    }

    pub async fn published_report(&self, report_id: &str) -> Result<PublishedReport> {
        self.drafts
            .get_report(report_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("published report", report_id))
    }

    /// Published reports, newest first.
    pub async fn list_published(&self) -> Result<Vec<PublishedReport>> {
        Ok(self.drafts.list_reports().await?)
    }
}

//! In-memory fakes for storage traits (testing and local runs)
//!
//! Provides `MemoryTemplateRegistry`, `MemoryDatasetStore`,
//! `MemoryReportStore`, and `MemoryDraftStore` that satisfy the trait
//! contracts without any external dependencies. Every operation runs inside a
//! single critical section, which is what makes activation and publish atomic.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::schema::{
    DraftReview, DraftStatus, EvaluationReport, GoldenDataset, NewTemplate, PublishedReport,
    ReportDraft, TemplateRecord,
};
use crate::storage_traits::*;

fn lock<T>(mutex: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StorageError::Backend("in-memory store lock poisoned".to_string()))
}

// ---------------------------------------------------------------------------
// MemoryTemplateRegistry
// ---------------------------------------------------------------------------

/// In-memory template registry backed by a `Vec<TemplateRecord>` in insertion order.
#[derive(Debug, Default)]
pub struct MemoryTemplateRegistry {
    templates: Mutex<Vec<TemplateRecord>>,
}

impl MemoryTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateRegistry for MemoryTemplateRegistry {
    async fn create_version(&self, template: NewTemplate) -> StorageResult<TemplateRecord> {
        let mut templates = lock(&self.templates)?;
        let next_version = templates
            .iter()
            .filter(|t| t.name == template.name)
            .map(|t| t.version)
            .max()
            .unwrap_or(0)
            + 1;

        for sibling in templates.iter_mut().filter(|t| t.name == template.name) {
            sibling.active = false;
        }

        let record = TemplateRecord::from_new(template, next_version, Utc::now());
        templates.push(record.clone());
        Ok(record)
    }

    async fn activate(&self, template_id: &str) -> StorageResult<TemplateRecord> {
        let mut templates = lock(&self.templates)?;
        let name = templates
            .iter()
            .find(|t| t.template_id == template_id)
            .map(|t| t.name.clone())
            .ok_or_else(|| StorageError::not_found("template", template_id))?;

        let mut activated = None;
        for t in templates.iter_mut().filter(|t| t.name == name) {
            t.active = t.template_id == template_id;
            if t.active {
                activated = Some(t.clone());
            }
        }
        activated.ok_or_else(|| StorageError::not_found("template", template_id))
    }

    async fn get(&self, template_id: &str) -> StorageResult<Option<TemplateRecord>> {
        let templates = lock(&self.templates)?;
        Ok(templates
            .iter()
            .find(|t| t.template_id == template_id)
            .cloned())
    }

    async fn versions(&self, name: &str) -> StorageResult<Vec<TemplateRecord>> {
        let templates = lock(&self.templates)?;
        let mut versions: Vec<TemplateRecord> = templates
            .iter()
            .filter(|t| t.name == name)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    async fn active_for_task(&self, task: &str) -> StorageResult<Option<TemplateRecord>> {
        let templates = lock(&self.templates)?;
        Ok(templates
            .iter()
            .filter(|t| t.task == task && t.active)
            .max_by(|a, b| (a.version, a.created_at).cmp(&(b.version, b.created_at)))
            .cloned())
    }

    async fn list_active(&self) -> StorageResult<Vec<TemplateRecord>> {
        let templates = lock(&self.templates)?;
        Ok(templates.iter().filter(|t| t.active).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryDatasetStore
// ---------------------------------------------------------------------------

/// In-memory holder of the current golden dataset.
#[derive(Debug, Default)]
pub struct MemoryDatasetStore {
    dataset: Mutex<Option<GoldenDataset>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GoldenDatasetStore for MemoryDatasetStore {
    async fn replace(&self, dataset: GoldenDataset) -> StorageResult<()> {
        *lock(&self.dataset)? = Some(dataset);
        Ok(())
    }

    async fn load(&self) -> StorageResult<Option<GoldenDataset>> {
        Ok(lock(&self.dataset)?.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryReportStore
// ---------------------------------------------------------------------------

/// In-memory append-only report log.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: Mutex<Vec<EvaluationReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvaluationReportStore for MemoryReportStore {
    async fn append(&self, report: EvaluationReport) -> StorageResult<()> {
        let mut reports = lock(&self.reports)?;
        if reports.iter().any(|r| r.report_id == report.report_id) {
            return Err(StorageError::Conflict(format!(
                "evaluation report {} already exists",
                report.report_id
            )));
        }
        reports.push(report);
        Ok(())
    }

    async fn get(&self, report_id: &str) -> StorageResult<Option<EvaluationReport>> {
        let reports = lock(&self.reports)?;
        Ok(reports.iter().find(|r| r.report_id == report_id).cloned())
    }

    async fn latest(&self) -> StorageResult<Option<EvaluationReport>> {
        let reports = lock(&self.reports)?;
        // max_by_key keeps the last maximum, so equal timestamps favour the later append.
        Ok(reports.iter().max_by_key(|r| r.timestamp).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<EvaluationReport>> {
        let reports = lock(&self.reports)?;
        let mut all: Vec<EvaluationReport> = reports.iter().rev().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(all)
    }
}

// ---------------------------------------------------------------------------
// MemoryDraftStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DraftState {
    drafts: Vec<ReportDraft>,
    reports: Vec<PublishedReport>,
}

/// In-memory draft store; drafts and published reports share one lock.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    state: Mutex<DraftState>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn create(&self, draft: ReportDraft) -> StorageResult<ReportDraft> {
        let mut state = lock(&self.state)?;
        if state.drafts.iter().any(|d| d.draft_id == draft.draft_id) {
            return Err(StorageError::Conflict(format!(
                "draft {} already exists",
                draft.draft_id
            )));
        }
        state.drafts.push(draft.clone());
        Ok(draft)
    }

    async fn get(&self, draft_id: &str) -> StorageResult<Option<ReportDraft>> {
        let state = lock(&self.state)?;
        Ok(state.drafts.iter().find(|d| d.draft_id == draft_id).cloned())
    }

    async fn list(&self, status: Option<DraftStatus>) -> StorageResult<Vec<ReportDraft>> {
        let state = lock(&self.state)?;
        let mut drafts: Vec<ReportDraft> = state
            .drafts
            .iter()
            .rev()
            .filter(|d| status.map(|s| d.status == s).unwrap_or(true))
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drafts)
    }

    async fn update_status(
        &self,
        draft_id: &str,
        expected: DraftStatus,
        review: DraftReview,
    ) -> StorageResult<ReportDraft> {
        let mut state = lock(&self.state)?;
        let draft = state
            .drafts
            .iter_mut()
            .find(|d| d.draft_id == draft_id)
            .ok_or_else(|| StorageError::not_found("draft", draft_id))?;
        if draft.status != expected {
            return Err(StorageError::StatusConflict {
                draft_id: draft_id.to_string(),
                expected: expected.to_string(),
                actual: draft.status.to_string(),
            });
        }
        draft.status = review.status;
        draft.reviewed_at = Some(review.reviewed_at);
        draft.reviewer = review.reviewer;
        draft.comment = review.comment;
        Ok(draft.clone())
    }

    async fn publish(
        &self,
        draft_id: &str,
        published_by: &str,
        published_at: DateTime<Utc>,
    ) -> StorageResult<PublishedReport> {
        let mut state = lock(&self.state)?;
        let draft = state
            .drafts
            .iter_mut()
            .find(|d| d.draft_id == draft_id)
            .ok_or_else(|| StorageError::not_found("draft", draft_id))?;
        if draft.status != DraftStatus::Approved {
            return Err(StorageError::StatusConflict {
                draft_id: draft_id.to_string(),
                expected: DraftStatus::Approved.to_string(),
                actual: draft.status.to_string(),
            });
        }
        draft.status = DraftStatus::Published;
        draft.published_at = Some(published_at);
        draft.published_by = Some(published_by.to_string());

        let report = PublishedReport::from_draft(draft, published_by, published_at);
        state.reports.push(report.clone());
        Ok(report)
    }

    async fn get_report(&self, report_id: &str) -> StorageResult<Option<PublishedReport>> {
        let state = lock(&self.state)?;
        Ok(state
            .reports
            .iter()
            .find(|r| r.report_id == report_id)
            .cloned())
    }

    async fn list_reports(&self) -> StorageResult<Vec<PublishedReport>> {
        let state = lock(&self.state)?;
        let mut reports: Vec<PublishedReport> = state.reports.iter().rev().cloned().collect();
        reports.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(reports)
    }
}

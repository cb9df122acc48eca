use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::schema::{
    DraftReview, DraftStatus, EvaluationReport, GoldenDataset, NewTemplate, PublishedReport,
    ReportDraft, TemplateRecord,
};
use crate::storage_traits::{
    DraftStore, EvaluationReportStore, GoldenDatasetStore, StorageResult, TemplateRegistry,
};
use crate::SurrealHandle;

/// SurrealDB-backed implementation of every storage trait.
#[derive(Clone)]
pub struct SurrealStore {
    handle: Arc<SurrealHandle>,
}

impl SurrealStore {
    pub fn new(handle: Arc<SurrealHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl TemplateRegistry for SurrealStore {
    async fn create_version(&self, template: NewTemplate) -> StorageResult<TemplateRecord> {
        self.handle.template_create_version(template).await
    }

    async fn activate(&self, template_id: &str) -> StorageResult<TemplateRecord> {
        self.handle.template_activate(template_id).await
    }

    async fn get(&self, template_id: &str) -> StorageResult<Option<TemplateRecord>> {
        self.handle.template_get(template_id).await
    }

    async fn versions(&self, name: &str) -> StorageResult<Vec<TemplateRecord>> {
        self.handle.template_versions(name).await
    }

    async fn active_for_task(&self, task: &str) -> StorageResult<Option<TemplateRecord>> {
        self.handle.template_active_for_task(task).await
    }

    async fn list_active(&self) -> StorageResult<Vec<TemplateRecord>> {
        self.handle.template_list_active().await
    }
}

#[async_trait]
impl GoldenDatasetStore for SurrealStore {
    async fn replace(&self, dataset: GoldenDataset) -> StorageResult<()> {
        self.handle.dataset_replace(dataset).await
    }

    async fn load(&self) -> StorageResult<Option<GoldenDataset>> {
        self.handle.dataset_load().await
    }
}

#[async_trait]
impl EvaluationReportStore for SurrealStore {
    async fn append(&self, report: EvaluationReport) -> StorageResult<()> {
        self.handle.report_append(report).await
    }

    async fn get(&self, report_id: &str) -> StorageResult<Option<EvaluationReport>> {
        self.handle.report_get(report_id).await
    }

    async fn latest(&self) -> StorageResult<Option<EvaluationReport>> {
        self.handle.report_latest().await
    }

    async fn list(&self) -> StorageResult<Vec<EvaluationReport>> {
        self.handle.report_list().await
    }
}

#[async_trait]
impl DraftStore for SurrealStore {
    async fn create(&self, draft: ReportDraft) -> StorageResult<ReportDraft> {
        self.handle.draft_create(draft).await
    }

    async fn get(&self, draft_id: &str) -> StorageResult<Option<ReportDraft>> {
        self.handle.draft_get(draft_id).await
    }

    async fn list(&self, status: Option<DraftStatus>) -> StorageResult<Vec<ReportDraft>> {
        self.handle.draft_list(status).await
    }

    async fn update_status(
        &self,
        draft_id: &str,
        expected: DraftStatus,
        review: DraftReview,
    ) -> StorageResult<ReportDraft> {
        self.handle
            .draft_update_status(draft_id, expected, review)
            .await
    }

    async fn publish(
        &self,
        draft_id: &str,
        published_by: &str,
        published_at: DateTime<Utc>,
    ) -> StorageResult<PublishedReport> {
        self.handle
            .draft_publish(draft_id, published_by, published_at)
            .await
    }

    async fn get_report(&self, report_id: &str) -> StorageResult<Option<PublishedReport>> {
        self.handle.published_get(report_id).await
    }

    async fn list_reports(&self) -> StorageResult<Vec<PublishedReport>> {
        self.handle.published_list().await
    }
}

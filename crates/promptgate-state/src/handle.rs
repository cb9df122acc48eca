//! SurrealDB Handle - Connection and Operations
//!
//! Manages connection and provides the queries behind `SurrealStore`:
//! - template versions with transactional activation
//! - golden dataset replace/load
//! - append-only evaluation reports
//! - report drafts with conditional status updates and transactional publish
//!
//! Supports both local (in-memory) and cloud (WebSocket) connections.

use crate::error::{StateError, StorageError};
use crate::schema::{
    DraftReview, DraftStatus, EvaluationReport, GoldenDataset, NewTemplate, PublishedReport,
    ReportDraft, TemplateRecord,
};
use crate::storage_traits::StorageResult;
use crate::Result;
use chrono::{DateTime, Utc};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::{Response, Surreal};
use tracing::{debug, info, instrument, warn};

/// Configuration for SurrealDB Cloud connection
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    /// Database username
    pub username: String,
    /// Database password
    pub password: String,
    /// Namespace (default: "promptgate")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Create a new cloud configuration for a database user
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: "promptgate".to_string(),
            database: "main".to_string(),
            is_root: false,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set whether this is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_ENDPOINT (required)
    /// - SURREALDB_USERNAME (required)
    /// - SURREALDB_PASSWORD (required)
    /// - SURREALDB_NAMESPACE (optional, default: "promptgate")
    /// - SURREALDB_DATABASE (optional, default: "main")
    /// - SURREALDB_ROOT (optional, default: "false") - set to "true" for root users
    pub fn from_env() -> std::result::Result<Self, String> {
        let endpoint =
            std::env::var("SURREALDB_ENDPOINT").map_err(|_| "SURREALDB_ENDPOINT not set")?;
        let username =
            std::env::var("SURREALDB_USERNAME").map_err(|_| "SURREALDB_USERNAME not set")?;
        let password =
            std::env::var("SURREALDB_PASSWORD").map_err(|_| "SURREALDB_PASSWORD not set")?;
        let namespace =
            std::env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "promptgate".to_string());
        let database = std::env::var("SURREALDB_DATABASE").unwrap_or_else(|_| "main".to_string());
        let is_root = std::env::var("SURREALDB_ROOT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            endpoint,
            username,
            password,
            namespace,
            database,
            is_root,
        })
    }
}

/// SurrealDB connection handle for promptgate
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

/// Thrown by the publish transaction when the draft left `approved`.
const PUBLISH_GUARD: &str = "draft is no longer approved";

/// Whether a failed write lost a race: a unique index collision, a commit
/// conflict between transactions, or the publish guard.
fn is_write_conflict(message: &str) -> bool {
    message.contains("already contains")
        || message.contains("conflict")
        || message.contains(PUBLISH_GUARD)
}

fn classify_write(message: String) -> StorageError {
    if is_write_conflict(&message) {
        StorageError::Conflict(message)
    } else {
        StorageError::Backend(message)
    }
}

/// Map a failed write to `Conflict` when it lost a race, `Backend` otherwise.
fn write_error(err: surrealdb::Error) -> StorageError {
    classify_write(err.to_string())
}

/// Check every statement of a write. A failed transaction reports the cause
/// on one statement and "not executed" on the rest, so all of them are read.
fn check_write(mut response: Response) -> StorageResult<()> {
    let mut errors: Vec<_> = response.take_errors().into_iter().collect();
    if errors.is_empty() {
        return Ok(());
    }
    errors.sort_by_key(|(index, _)| *index);
    let message = errors
        .into_iter()
        .map(|(_, e)| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(classify_write(message))
}

impl SurrealHandle {
    /// Connect to SurrealDB in-memory and set up schema
    #[instrument(skip_all)]
    pub async fn setup_db() -> Result<Self> {
        info!("Connecting to SurrealDB (in-memory)");

        let db = surrealdb::engine::any::connect("mem://")
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        db.use_ns("promptgate")
            .use_db("main")
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        let handle = SurrealHandle { db };
        handle.init_schema().await?;

        info!("SurrealDB connected and schema initialized");
        Ok(handle)
    }

    /// Connect to SurrealDB Cloud
    #[instrument(
        skip(config),
        fields(
            endpoint = %config.endpoint,
            namespace = %config.namespace,
            database = %config.database
        )
    )]
    pub async fn setup_cloud(config: CloudConfig) -> Result<Self> {
        info!("Connecting to SurrealDB Cloud (root={})", config.is_root);

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root authentication failed: {}", e)))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| {
                StateError::Connection(format!("Database authentication failed: {}", e))
            })?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        let handle = SurrealHandle { db };
        handle.init_schema().await?;

        info!("SurrealDB Cloud connected and schema initialized");
        Ok(handle)
    }

    /// Connect using environment variables
    ///
    /// If SURREALDB_ENDPOINT is set, connects to cloud.
    /// If SURREALDB_URL is set, connects to that URL (e.g. `surrealkv://./promptgate.db`).
    /// Otherwise, falls back to in-memory.
    #[instrument(skip_all)]
    pub async fn setup_from_env() -> Result<Self> {
        if let Ok(config) = CloudConfig::from_env() {
            info!("Cloud config found, connecting to SurrealDB Cloud");
            return Self::setup_cloud(config).await;
        }

        if let Ok(url) = std::env::var("SURREALDB_URL") {
            info!("SURREALDB_URL found, connecting to {}", url);
            let db = surrealdb::engine::any::connect(&url)
                .await
                .map_err(|e| StateError::Connection(e.to_string()))?;

            db.use_ns("promptgate")
                .use_db("main")
                .await
                .map_err(|e| StateError::Connection(e.to_string()))?;

            let handle = SurrealHandle { db };
            handle.init_schema().await?;
            return Ok(handle);
        }

        info!("No cloud config found, using in-memory database");
        Self::setup_db().await
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> Result<()> {
        debug!("Initializing promptgate schema");

        let schema = r#"
            -- Template versions; (name, version) is the conditional-write guard
            DEFINE TABLE IF NOT EXISTS templates SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS idx_template_id ON templates FIELDS template_id UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_template_name_version ON templates FIELDS name, version UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_template_task_active ON templates FIELDS task, active;

            -- Golden dataset (single row, replaced wholesale)
            DEFINE TABLE IF NOT EXISTS datasets SCHEMALESS;

            -- Append-only evaluation reports
            DEFINE TABLE IF NOT EXISTS evaluation_reports SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS idx_report_id ON evaluation_reports FIELDS report_id UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_report_timestamp ON evaluation_reports FIELDS timestamp;

            -- Report drafts under review
            DEFINE TABLE IF NOT EXISTS report_drafts SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS idx_draft_id ON report_drafts FIELDS draft_id UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_draft_status ON report_drafts FIELDS status;

            -- Published reports; one per draft
            DEFINE TABLE IF NOT EXISTS published_reports SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS idx_published_id ON published_reports FIELDS report_id UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_published_draft ON published_reports FIELDS draft_id UNIQUE;
        "#;

        self.db
            .query(schema)
            .await
            .map_err(|e| StateError::SchemaSetup(e.to_string()))?
            .check()
            .map_err(|e| StateError::SchemaSetup(e.to_string()))?;

        debug!("Schema initialized successfully");
        Ok(())
    }

    // ========== Template Operations ==========

    /// Insert a new active version and deactivate its siblings in one transaction.
    #[instrument(skip(self, template), fields(name = %template.name))]
    pub async fn template_create_version(
        &self,
        template: NewTemplate,
    ) -> StorageResult<TemplateRecord> {
        let mut result = self
            .db
            .query("SELECT VALUE version FROM templates WHERE name = $name")
            .bind(("name", template.name.clone()))
            .await?;
        let versions: Vec<i64> = result.take(0)?;
        let next_version = versions.into_iter().max().unwrap_or(0) + 1;
        let next_version = u32::try_from(next_version)
            .map_err(|_| StorageError::Conflict("template version overflow".to_string()))?;

        let record = TemplateRecord::from_new(template, next_version, Utc::now());
        let template_id = record.template_id.clone();
        let name = record.name.clone();

        self.db
            .query(
                "BEGIN TRANSACTION;
                 UPDATE templates SET active = false WHERE name = $name;
                 CREATE templates CONTENT $record;
                 COMMIT TRANSACTION;",
            )
            .bind(("name", name))
            .bind(("record", record))
            .await
            .map_err(write_error)
            .and_then(check_write)?;

        debug!(version = next_version, "template version created");
        self.template_get(&template_id)
            .await?
            .ok_or_else(|| StorageError::Backend("created template not readable".to_string()))
    }

    /// Deactivate every version of the target's name and activate the target.
    #[instrument(skip(self))]
    pub async fn template_activate(&self, template_id: &str) -> StorageResult<TemplateRecord> {
        let target = self
            .template_get(template_id)
            .await?
            .ok_or_else(|| StorageError::not_found("template", template_id))?;

        self.db
            .query(
                "BEGIN TRANSACTION;
                 UPDATE templates SET active = false WHERE name = $name;
                 UPDATE templates SET active = true WHERE template_id = $id;
                 COMMIT TRANSACTION;",
            )
            .bind(("name", target.name.clone()))
            .bind(("id", template_id.to_string()))
            .await
            .map_err(write_error)
            .and_then(check_write)?;

        self.template_get(template_id)
            .await?
            .ok_or_else(|| StorageError::not_found("template", template_id))
    }

    #[instrument(skip(self))]
    pub async fn template_get(&self, template_id: &str) -> StorageResult<Option<TemplateRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM templates WHERE template_id = $id LIMIT 1")
            .bind(("id", template_id.to_string()))
            .await?;
        let rows: Vec<TemplateRecord> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn template_versions(&self, name: &str) -> StorageResult<Vec<TemplateRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM templates WHERE name = $name ORDER BY version DESC")
            .bind(("name", name.to_string()))
            .await?;
        let rows: Vec<TemplateRecord> = result.take(0)?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn template_active_for_task(
        &self,
        task: &str,
    ) -> StorageResult<Option<TemplateRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM templates WHERE task = $task AND active = true \
                 ORDER BY version DESC, created_at DESC LIMIT 1",
            )
            .bind(("task", task.to_string()))
            .await?;
        let rows: Vec<TemplateRecord> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn template_list_active(&self) -> StorageResult<Vec<TemplateRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM templates WHERE active = true ORDER BY created_at ASC")
            .await?;
        let rows: Vec<TemplateRecord> = result.take(0)?;
        Ok(rows)
    }

    // ========== Dataset Operations ==========

    /// Replace the golden dataset wholesale.
    #[instrument(skip(self, dataset), fields(samples = dataset.samples.len()))]
    pub async fn dataset_replace(&self, dataset: GoldenDataset) -> StorageResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION;
                 DELETE datasets;
                 CREATE datasets CONTENT $row;
                 COMMIT TRANSACTION;",
            )
            .bind(("row", dataset))
            .await?
            .check()?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn dataset_load(&self) -> StorageResult<Option<GoldenDataset>> {
        let mut result = self
            .db
            .query("SELECT * FROM datasets ORDER BY built_at DESC LIMIT 1")
            .await?;
        let rows: Vec<GoldenDataset> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    // ========== Evaluation Report Operations ==========

    #[instrument(skip(self, report), fields(report_id = %report.report_id))]
    pub async fn report_append(&self, report: EvaluationReport) -> StorageResult<()> {
        if self.report_get(&report.report_id).await?.is_some() {
            return Err(StorageError::Conflict(format!(
                "evaluation report {} already exists",
                report.report_id
            )));
        }
        let created: Option<EvaluationReport> = self
            .db
            .create("evaluation_reports")
            .content(report)
            .await
            .map_err(write_error)?;
        created
            .map(|_| ())
            .ok_or_else(|| StorageError::Backend("failed to create evaluation report".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn report_get(&self, report_id: &str) -> StorageResult<Option<EvaluationReport>> {
        let mut result = self
            .db
            .query("SELECT * FROM evaluation_reports WHERE report_id = $id LIMIT 1")
            .bind(("id", report_id.to_string()))
            .await?;
        let rows: Vec<EvaluationReport> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn report_latest(&self) -> StorageResult<Option<EvaluationReport>> {
        let mut result = self
            .db
            .query("SELECT * FROM evaluation_reports ORDER BY timestamp DESC LIMIT 1")
            .await?;
        let rows: Vec<EvaluationReport> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn report_list(&self) -> StorageResult<Vec<EvaluationReport>> {
        let mut result = self
            .db
            .query("SELECT * FROM evaluation_reports ORDER BY timestamp DESC")
            .await?;
        let rows: Vec<EvaluationReport> = result.take(0)?;
        Ok(rows)
    }

    // ========== Draft Operations ==========

    #[instrument(skip(self, draft), fields(draft_id = %draft.draft_id))]
    pub async fn draft_create(&self, draft: ReportDraft) -> StorageResult<ReportDraft> {
        let created: Option<ReportDraft> = self
            .db
            .create("report_drafts")
            .content(draft)
            .await
            .map_err(write_error)?;
        created
            .ok_or_else(|| StorageError::Backend("failed to create report draft".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn draft_get(&self, draft_id: &str) -> StorageResult<Option<ReportDraft>> {
        let mut result = self
            .db
            .query("SELECT * FROM report_drafts WHERE draft_id = $id LIMIT 1")
            .bind(("id", draft_id.to_string()))
            .await?;
        let rows: Vec<ReportDraft> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn draft_list(&self, status: Option<DraftStatus>) -> StorageResult<Vec<ReportDraft>> {
        let mut result = match status {
            Some(status) => {
                self.db
                    .query(
                        "SELECT * FROM report_drafts WHERE status = $status \
                         ORDER BY created_at DESC",
                    )
                    .bind(("status", status))
                    .await?
            }
            None => {
                self.db
                    .query("SELECT * FROM report_drafts ORDER BY created_at DESC")
                    .await?
            }
        };
        let rows: Vec<ReportDraft> = result.take(0)?;
        Ok(rows)
    }

    /// Conditional status update: only applies while the stored status equals `expected`.
    #[instrument(skip(self, review), fields(to = %review.status))]
    pub async fn draft_update_status(
        &self,
        draft_id: &str,
        expected: DraftStatus,
        review: DraftReview,
    ) -> StorageResult<ReportDraft> {
        let mut result = self
            .db
            .query(
                "UPDATE report_drafts SET status = $status, reviewed_at = $reviewed_at, \
                 reviewer = $reviewer, comment = $comment \
                 WHERE draft_id = $id AND status = $expected RETURN AFTER",
            )
            .bind(("status", review.status))
            .bind(("reviewed_at", SurrealDatetime::from(review.reviewed_at)))
            .bind(("reviewer", review.reviewer))
            .bind(("comment", review.comment))
            .bind(("id", draft_id.to_string()))
            .bind(("expected", expected))
            .await?;
        let rows: Vec<ReportDraft> = result.take(0)?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(row);
        }

        match self.draft_get(draft_id).await? {
            Some(current) => Err(StorageError::StatusConflict {
                draft_id: draft_id.to_string(),
                expected: expected.to_string(),
                actual: current.status.to_string(),
            }),
            None => Err(StorageError::not_found("draft", draft_id)),
        }
    }

    /// Flip an approved draft to published and create its report in one transaction.
    #[instrument(skip(self, published_at))]
    pub async fn draft_publish(
        &self,
        draft_id: &str,
        published_by: &str,
        published_at: DateTime<Utc>,
    ) -> StorageResult<PublishedReport> {
        let draft = self
            .draft_get(draft_id)
            .await?
            .ok_or_else(|| StorageError::not_found("draft", draft_id))?;
        if draft.status != DraftStatus::Approved {
            return Err(StorageError::StatusConflict {
                draft_id: draft_id.to_string(),
                expected: DraftStatus::Approved.to_string(),
                actual: draft.status.to_string(),
            });
        }

        let report = PublishedReport::from_draft(&draft, published_by, published_at);
        let outcome = self
            .db
            .query(
                "BEGIN TRANSACTION;
                 LET $updated = (UPDATE report_drafts SET status = 'published', \
                     published_at = $at, published_by = $by \
                     WHERE draft_id = $id AND status = 'approved' RETURN AFTER);
                 IF array::len($updated) = 0 { THROW 'draft is no longer approved' };
                 CREATE published_reports CONTENT $report;
                 COMMIT TRANSACTION;",
            )
            .bind(("at", SurrealDatetime::from(published_at)))
            .bind(("by", published_by.to_string()))
            .bind(("id", draft_id.to_string()))
            .bind(("report", report.clone()))
            .await
            .map_err(write_error)
            .and_then(check_write);

        if let Err(err) = outcome {
            warn!(error = %err, "publish transaction rolled back");
            let message = err.to_string();
            return Err(match self.draft_get(draft_id).await? {
                None => StorageError::not_found("draft", draft_id),
                Some(current)
                    if current.status != DraftStatus::Approved
                        || message.contains(PUBLISH_GUARD) =>
                {
                    StorageError::StatusConflict {
                        draft_id: draft_id.to_string(),
                        expected: DraftStatus::Approved.to_string(),
                        actual: current.status.to_string(),
                    }
                }
                Some(_) => err,
            });
        }

        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn published_get(&self, report_id: &str) -> StorageResult<Option<PublishedReport>> {
        let mut result = self
            .db
            .query("SELECT * FROM published_reports WHERE report_id = $id LIMIT 1")
            .bind(("id", report_id.to_string()))
            .await?;
        let rows: Vec<PublishedReport> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn published_list(&self) -> StorageResult<Vec<PublishedReport>> {
        let mut result = self
            .db
            .query("SELECT * FROM published_reports ORDER BY published_at DESC")
            .await?;
        let rows: Vec<PublishedReport> = result.take(0)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DraftAuthor, DraftContent};

    #[test]
    fn lost_races_classify_as_conflict() {
        for message in [
            "Database index `idx_template_name_version` already contains ['job-analysis', 2]",
            "Failed to commit transaction due to a read or write conflict",
            "An error occurred: draft is no longer approved",
        ] {
            let err = classify_write(message.to_string());
            assert!(matches!(err, StorageError::Conflict(_)), "{message}");
        }
    }

    #[test]
    fn other_failures_classify_as_backend() {
        let err = classify_write("There was a problem with the underlying datastore".to_string());
        assert!(matches!(err, StorageError::Backend(_)));
    }

    async fn approved_draft(handle: &SurrealHandle) -> ReportDraft {
        let content = DraftContent {
            title: "Rate Cards".to_string(),
            description: String::new(),
            category: "Market".to_string(),
            audience: "Agencies".to_string(),
            insights: Vec::new(),
            sources: Vec::new(),
            body: String::new(),
            estimated_demand: None,
        };
        let draft = handle
            .draft_create(ReportDraft::new(content, DraftAuthor::Human, "r1", Utc::now()))
            .await
            .unwrap();
        for (from, to) in [
            (DraftStatus::Draft, DraftStatus::Review),
            (DraftStatus::Review, DraftStatus::Approved),
        ] {
            let review = DraftReview {
                status: to,
                reviewed_at: Utc::now(),
                reviewer: None,
                comment: None,
            };
            handle
                .draft_update_status(&draft.draft_id, from, review)
                .await
                .unwrap();
        }
        draft
    }

    #[tokio::test]
    async fn failed_publish_on_approved_draft_is_a_backend_error() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let draft = approved_draft(&handle).await;
        handle
            .db
            .query("DEFINE FIELD published_by ON published_reports ASSERT $value != 'blocked'")
            .await
            .unwrap()
            .check()
            .unwrap();

        let err = handle
            .draft_publish(&draft.draft_id, "blocked", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)), "{err}");

        // The transaction rolled back, so a later publish still succeeds.
        let stored = handle.draft_get(&draft.draft_id).await.unwrap().unwrap();
        assert_eq!(stored.status, DraftStatus::Approved);
        let published = handle
            .draft_publish(&draft.draft_id, "editor", Utc::now())
            .await
            .unwrap();
        assert_eq!(published.draft_id, draft.draft_id);
    }

    #[tokio::test]
    async fn publish_of_published_draft_is_a_status_conflict() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let draft = approved_draft(&handle).await;
        handle
            .draft_publish(&draft.draft_id, "editor", Utc::now())
            .await
            .unwrap();

        let err = handle
            .draft_publish(&draft.draft_id, "editor", Utc::now())
            .await
            .unwrap_err();
        match err {
            StorageError::StatusConflict { actual, .. } => assert_eq!(actual, "published"),
            other => panic!("expected status conflict, got {other}"),
        }
    }

    #[tokio::test]
    async fn duplicate_draft_id_is_a_conflict() {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let draft = approved_draft(&handle).await;
        let err = handle.draft_create(draft).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)), "{err}");
    }
}

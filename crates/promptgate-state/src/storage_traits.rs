//! Storage trait definitions for promptgate
//!
//! These traits define the persistence seams of the pipeline:
//! - `TemplateRegistry`: versioned templates with a single active version per name
//! - `GoldenDatasetStore`: the reference dataset (wholesale replace)
//! - `EvaluationReportStore`: append-only evaluation reports
//! - `DraftStore`: report drafts, status compare-and-set, and publication
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;
use crate::schema::{
    DraftReview, DraftStatus, EvaluationReport, GoldenDataset, NewTemplate, PublishedReport,
    ReportDraft, TemplateRecord,
};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::Serialization(format!(
                "invalid digest: {}",
                s
            )));
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TemplateRegistry
// ---------------------------------------------------------------------------

/// Versioned template registry.
///
/// Guarantees:
/// - `create_version` assigns `max(version) + 1` for the name and leaves the
///   new version as the only active one, in a single atomic step.
/// - `activate` deactivates every version of the target's name and activates
///   the target, in a single atomic step.
/// - Versions are never deleted.
/// - A write that loses a race with a concurrent one fails with `Conflict`
///   and changes nothing; a broken backend fails with `Backend`.
#[async_trait]
pub trait TemplateRegistry: Send + Sync {
    /// Insert a new active version, deactivating its siblings.
    async fn create_version(&self, template: NewTemplate) -> StorageResult<TemplateRecord>;

    /// Make `template_id` the only active version of its name.
    async fn activate(&self, template_id: &str) -> StorageResult<TemplateRecord>;

    /// Fetch a version by id.
    async fn get(&self, template_id: &str) -> StorageResult<Option<TemplateRecord>>;

    /// All versions of a name, newest version first.
    async fn versions(&self, name: &str) -> StorageResult<Vec<TemplateRecord>>;

    /// The active template for a task. When several names share the task the
    /// highest version wins.
    async fn active_for_task(&self, task: &str) -> StorageResult<Option<TemplateRecord>>;

    /// Every active version, across names.
    async fn list_active(&self) -> StorageResult<Vec<TemplateRecord>>;
}

// ---------------------------------------------------------------------------
// GoldenDatasetStore
// ---------------------------------------------------------------------------

/// Holder of the single golden dataset.
#[async_trait]
pub trait GoldenDatasetStore: Send + Sync {
    /// Replace the stored dataset entirely. No merge with the prior set.
    async fn replace(&self, dataset: GoldenDataset) -> StorageResult<()>;

    /// The current dataset, if one has been built.
    async fn load(&self) -> StorageResult<Option<GoldenDataset>>;
}

// ---------------------------------------------------------------------------
// EvaluationReportStore
// ---------------------------------------------------------------------------

/// Append-only report log.
///
/// Guarantees:
/// - Reports are never mutated once appended.
/// - `latest` returns the report with the greatest `timestamp`.
#[async_trait]
pub trait EvaluationReportStore: Send + Sync {
    /// Append a report. Fails with `Conflict` if the id already exists.
    async fn append(&self, report: EvaluationReport) -> StorageResult<()>;

    async fn get(&self, report_id: &str) -> StorageResult<Option<EvaluationReport>>;

    async fn latest(&self) -> StorageResult<Option<EvaluationReport>>;

    /// All reports, newest first.
    async fn list(&self) -> StorageResult<Vec<EvaluationReport>>;
}

// ---------------------------------------------------------------------------
// DraftStore
// ---------------------------------------------------------------------------

/// Draft persistence with optimistic status updates.
///
/// Semantics:
/// - `update_status` applies `review` only if the stored status still equals
///   `expected`; otherwise `StatusConflict`.
/// - `publish` requires `approved`, flips the draft to `published`, stamps
///   it, and creates the `PublishedReport`, all in one atomic step. A draft
///   that is not (or no longer) `approved` yields `StatusConflict`; any other
///   failure leaves the draft `approved` and surfaces as `Conflict` or
///   `Backend`.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn create(&self, draft: ReportDraft) -> StorageResult<ReportDraft>;

    async fn get(&self, draft_id: &str) -> StorageResult<Option<ReportDraft>>;

    /// Drafts, optionally filtered by status, newest first.
    async fn list(&self, status: Option<DraftStatus>) -> StorageResult<Vec<ReportDraft>>;

    async fn update_status(
        &self,
        draft_id: &str,
        expected: DraftStatus,
        review: DraftReview,
    ) -> StorageResult<ReportDraft>;

    async fn publish(
        &self,
        draft_id: &str,
        published_by: &str,
        published_at: DateTime<Utc>,
    ) -> StorageResult<PublishedReport>;

    async fn get_report(&self, report_id: &str) -> StorageResult<Option<PublishedReport>>;

    /// Published reports, newest first.
    async fn list_reports(&self) -> StorageResult<Vec<PublishedReport>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_try_from_rejects_short_strings() {
        let err = ContentDigest::try_from("abc".to_string()).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn digest_try_from_normalizes_case() {
        let upper = ContentDigest::from_bytes(b"x").as_str().to_ascii_uppercase();
        let parsed = ContentDigest::try_from(upper).expect("valid hex");
        assert_eq!(parsed, ContentDigest::from_bytes(b"x"));
        assert_eq!(parsed.short().len(), 12);
    }

    #[test]
    fn digest_deserialize_validates() {
        let good = serde_json::to_string(&ContentDigest::from_bytes(b"x")).expect("serialize");
        let parsed: ContentDigest = serde_json::from_str(&good).expect("valid digest");
        assert_eq!(parsed, ContentDigest::from_bytes(b"x"));

        assert!(serde_json::from_str::<ContentDigest>("\"not-a-digest\"").is_err());
    }
}

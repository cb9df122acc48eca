//! Record definitions shared by every storage backend.
//!
//! Collections:
//! - templates: versioned instruction templates (one active per name)
//! - datasets: the golden dataset (replaced wholesale on rebuild)
//! - evaluation_reports: append-only evaluation reports
//! - report_drafts: AI-generated drafts moving through review
//! - published_reports: immutable artifacts materialized by publish

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::ContentDigest;

/// Serialize chrono timestamps as SurrealDB datetimes
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde::Serialize::serialize(&SurrealDatetime::from(*date), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Optional variant of `surreal_datetime`
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = date.map(SurrealDatetime::from);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Input for a new template version. The registry assigns id, version and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub task: String,
    pub body: String,
    pub default_parameters: BTreeMap<String, serde_json::Value>,
}

/// One immutable revision of an instruction template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    /// Unique identifier of this version.
    pub template_id: String,
    /// Logical identity shared by all versions.
    pub name: String,
    /// Monotonic per `name`, starting at 1.
    pub version: u32,
    /// Category key used to look up the active template.
    pub task: String,
    /// Template text with `{{key}}` placeholders.
    pub body: String,
    /// Values merged under call-time parameters on render.
    pub default_parameters: BTreeMap<String, serde_json::Value>,
    /// SHA-256 of `body`.
    pub body_digest: ContentDigest,
    /// Exactly one version per `name` is active.
    pub active: bool,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TemplateRecord {
    /// Build an active record for `new` at the given version.
    pub fn from_new(new: NewTemplate, version: u32, created_at: DateTime<Utc>) -> Self {
        let body_digest = ContentDigest::from_bytes(new.body.as_bytes());
        Self {
            template_id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            version,
            task: new.task,
            body: new.body,
            default_parameters: new.default_parameters,
            body_digest,
            active: true,
            created_at,
        }
    }

    pub fn template_ref(&self) -> TemplateRef {
        TemplateRef {
            template_id: self.template_id.clone(),
            name: self.name.clone(),
            version: self.version,
        }
    }
}

/// Identity of a template version as recorded in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub template_id: String,
    pub name: String,
    pub version: u32,
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

// ---------------------------------------------------------------------------
// Golden dataset
// ---------------------------------------------------------------------------

/// The three scored dimensions, each on a 0-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTriple {
    pub difficulty: f64,
    pub prospects: f64,
    pub fun: f64,
}

impl ScoreTriple {
    pub fn new(difficulty: f64, prospects: f64, fun: f64) -> Self {
        Self {
            difficulty,
            prospects,
            fun,
        }
    }
}

/// Structured input replayed through a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// A verified upstream record; only records with `ratings` become samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub ratings: Option<ScoreTriple>,
}

/// A labeled reference sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenSample {
    pub sample_id: String,
    pub input: SampleInput,
    pub expected: ScoreTriple,
}

/// The full reference set. Rebuilding replaces it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenDataset {
    pub dataset_id: String,
    /// SHA-256 over the canonical JSON of `samples`.
    pub digest: ContentDigest,
    #[serde(with = "surreal_datetime")]
    pub built_at: DateTime<Utc>,
    pub samples: Vec<GoldenSample>,
}

impl GoldenDataset {
    pub fn new(samples: Vec<GoldenSample>, built_at: DateTime<Utc>) -> Self {
        // Vec of plain structs always serializes.
        let canonical = serde_json::to_vec(&samples).unwrap_or_default();
        Self {
            dataset_id: uuid::Uuid::new_v4().to_string(),
            digest: ContentDigest::from_bytes(&canonical),
            built_at,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Evaluation reports
// ---------------------------------------------------------------------------

/// Aggregate of the chosen best template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateScore {
    pub sample_count: usize,
    pub mean_accuracy: f64,
    pub mean_consistency: f64,
    /// Whether the chosen template met both quality thresholds.
    pub pass: bool,
}

impl AggregateScore {
    pub fn empty() -> Self {
        Self {
            sample_count: 0,
            mean_accuracy: 0.0,
            mean_consistency: 0.0,
            pass: false,
        }
    }
}

/// Per-template row of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateScore {
    pub template: TemplateRef,
    pub task: String,
    pub sample_count: usize,
    pub error_count: usize,
    pub mean_accuracy: f64,
    pub mean_consistency: f64,
    pub passed: bool,
}

/// A suggested report topic, expanded into drafts by the publication workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportIdea {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "estimatedDemand", alias = "estimated_demand")]
    pub estimated_demand: Option<f64>,
    #[serde(default)]
    pub reason: String,
}

/// Append-only outcome of one full evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub report_id: String,
    #[serde(with = "surreal_datetime")]
    pub timestamp: DateTime<Utc>,
    pub chosen_template: Option<TemplateRef>,
    pub aggregate: AggregateScore,
    #[serde(default)]
    pub template_scores: Vec<TemplateScore>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub report_ideas: Vec<ReportIdea>,
    pub dataset_digest: Option<ContentDigest>,
}

// ---------------------------------------------------------------------------
// Drafts and published reports
// ---------------------------------------------------------------------------

/// Review state of a draft. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Review,
    Approved,
    Published,
    Rejected,
}

impl DraftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Review => "review",
            Self::Approved => "approved",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "review" => Ok(Self::Review),
            "approved" => Ok(Self::Approved),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown draft status: {}", other)),
        }
    }
}

/// Who created a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftAuthor {
    System,
    Human,
}

/// The publishable body of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftContent {
    pub title: String,
    pub description: String,
    pub category: String,
    pub audience: String,
    pub insights: Vec<String>,
    pub sources: Vec<String>,
    /// Full report text (Markdown).
    pub body: String,
    pub estimated_demand: Option<f64>,
}

/// A report draft under review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub draft_id: String,
    pub content: DraftContent,
    pub status: DraftStatus,
    pub created_by: DraftAuthor,
    pub evaluation_id: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer: Option<String>,
    pub comment: Option<String>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub published_at: Option<DateTime<Utc>>,
    pub published_by: Option<String>,
}

impl ReportDraft {
    /// A fresh draft in `draft` status.
    pub fn new(
        content: DraftContent,
        created_by: DraftAuthor,
        evaluation_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            draft_id: uuid::Uuid::new_v4().to_string(),
            content,
            status: DraftStatus::Draft,
            created_by,
            evaluation_id: evaluation_id.into(),
            created_at,
            reviewed_at: None,
            reviewer: None,
            comment: None,
            published_at: None,
            published_by: None,
        }
    }
}

/// Review stamp applied together with a status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftReview {
    pub status: DraftStatus,
    #[serde(with = "surreal_datetime")]
    pub reviewed_at: DateTime<Utc>,
    pub reviewer: Option<String>,
    pub comment: Option<String>,
}

/// Immutable artifact created exactly once per successful publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedReport {
    pub report_id: String,
    pub draft_id: String,
    pub content: DraftContent,
    pub published_by: String,
    #[serde(with = "surreal_datetime")]
    pub published_at: DateTime<Utc>,
}

impl PublishedReport {
    /// Copy a draft's content into a new published artifact.
    pub fn from_draft(
        draft: &ReportDraft,
        published_by: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            draft_id: draft.draft_id.clone(),
            content: draft.content.clone(),
            published_by: published_by.into(),
            published_at,
        }
    }
}

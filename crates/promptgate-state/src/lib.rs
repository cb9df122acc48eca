//! Promptgate-State: persistence for the promptgate pipeline
//!
//! This crate owns every record the pipeline stores and the traits the
//! higher layers program against, with a SurrealDB backend and in-memory
//! fakes.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: Data integrity, atomic activation/publication, append-only history.
//!
//! ## Key Components
//!
//! - `SurrealHandle`: Manages connection, schema and transactions
//! - `SurrealStore`: Implements the storage traits over a shared handle
//! - `fakes`: Mutex-backed stores for tests and local runs
//! - `schema`: Templates, golden dataset, evaluation reports, drafts

mod error;
pub mod fakes;
mod handle;
pub mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use handle::{CloudConfig, SurrealHandle};
pub use schema::{
    AggregateScore, DraftAuthor, DraftContent, DraftReview, DraftStatus, EvaluationReport,
    GoldenDataset, GoldenSample, NewTemplate, PublishedReport, ReportDraft, ReportIdea,
    SampleInput, ScoreTriple, SourceRecord, TemplateRecord, TemplateRef, TemplateScore,
};
pub use storage_traits::{
    ContentDigest, DraftStore, EvaluationReportStore, GoldenDatasetStore, StorageResult,
    TemplateRegistry,
};
pub use surreal_store::SurrealStore;

/// Result type for promptgate-state connection operations
pub type Result<T> = std::result::Result<T, StateError>;

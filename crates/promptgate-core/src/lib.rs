//! Promptgate Core Library
//!
//! Template versioning, golden-dataset playback, quality gates, evaluation
//! orchestration and the draft publication workflow, built on the storage
//! traits of `promptgate-state`.

pub mod config;
pub mod dataset;
pub mod domain;
pub mod drafts;
pub mod gate;
pub mod inference;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod playback;
pub mod reporting;
pub mod telemetry;
pub mod template_store;
pub mod trigger;

pub use config::{ConfigError, PipelineConfig};
pub use dataset::{load_source_records, DatasetBuildSummary, ReferenceDatasetManager};
pub use domain::{
    is_allowed_transition, DraftExpansion, EvaluationResult, Params, PipelineError, Result,
    SampleError, ScoreSummary,
};
pub use drafts::DraftWorkflow;
pub use gate::{
    evaluate_gate, passes_quality_gates, GateRule, GateRuleSet, GateVerdict, QualityThresholds,
    Violation, MIN_ACCURACY, MIN_CONSISTENCY,
};
pub use inference::{
    FallbackClient, InferenceClient, InferenceError, InferenceOutput, InferenceRequest,
    OllamaClient, OllamaConfig, OutputShape,
};
pub use orchestrator::EvaluationOrchestrator;
pub use playback::{PlaybackEvaluator, PlaybackOutcome};
pub use reporting::{render_summary, write_report_json, write_summary_md};
pub use template_store::{TemplateVersionStore, DEFAULT_TEMPLATES, JOB_ANALYSIS_TASK};
pub use trigger::{
    spawn as spawn_trigger, EvaluationService, TriggerHandle, TriggerKind, TriggerMessage,
};

pub use promptgate_state::{
    DraftContent, DraftStatus, EvaluationReport, GoldenDataset, PublishedReport, ReportDraft,
    ReportIdea, SourceRecord, SurrealHandle, SurrealStore, TemplateRecord,
};

pub use metrics::METRICS;
pub use obs::{
    emit_draft_transition, emit_evaluation_finished, emit_evaluation_started, emit_gate_evaluated,
    emit_report_published, emit_sample_error, emit_template_scored, evaluation_span,
};
pub use telemetry::init_tracing;

/// promptgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

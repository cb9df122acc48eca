//! Domain models and pure rules for promptgate.
//!
//! - `template`: placeholder rendering
//! - `scoring`: accuracy, consistency and score parsing
//! - `evaluation`: recommendation text and report-idea suggestions
//! - `draft`: review state machine and idea expansion
//! - `error`: `PipelineError`

pub mod draft;
pub mod error;
pub mod evaluation;
pub mod scoring;
pub mod template;

pub use draft::{is_allowed_transition, DraftExpansion, DEFAULT_AUDIENCE, DEFAULT_SOURCES};
pub use error::{PipelineError, Result};
pub use scoring::{
    accuracy, consistency, parse_score_triple, EvaluationResult, SampleError, ScoreSummary,
};
pub use template::{placeholders, render_body, Params, Rendered};

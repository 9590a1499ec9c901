//! Pipeline-specific error types.
//!
//! All variants are rule-level: a failing rule is excluded from the batch
//! with its error surfaced to the caller, never failing the whole run.

use thiserror::Error;

/// Errors raised while applying a pipeline to a rule or post-processing
/// its query.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A guard pass rejected the rule. The message is surfaced verbatim.
    #[error("{0}")]
    RuleFailure(String),

    /// A detection item referenced a field outside the supported set.
    #[error("Invalid detection item field name encountered: {field}. {message}")]
    UnsupportedField { field: String, message: String },

    /// A query post-processor could not complete.
    #[error("query post-processing failed: {0}")]
    Postprocessing(String),

    /// A query could not be rendered from the transformed rule.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PipelineError>;

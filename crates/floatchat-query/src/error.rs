use floatchat_llm::{CompletionError, ConfigError};
use floatchat_store::StoreError;
use serde::Serialize;
use std::fmt;

/// Why the orchestrator left the primary path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecoveryReason {
    /// Completion failed or the model returned no usable SQL.
    GenerationFailed,
    /// The generated statement was rejected by the store.
    ExecutionFailed,
}

impl fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GenerationFailed => "generation failed",
            Self::ExecutionFailed => "execution failed",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Rejected before the pipeline starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing credential for the hosted backend. Startup only.
    #[error("{0}")]
    Auth(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The store or completion client could not be set up.
    #[error("startup failed: {0}")]
    Startup(String),

    /// Both the primary and the fallback statement failed.
    #[error("pipeline failed after {reason}: {original_error}; fallback SQL also failed: {fallback_error}")]
    PipelineFailed {
        reason: RecoveryReason,
        original_sql: Option<String>,
        original_error: String,
        fallback_sql: String,
        fallback_error: String,
    },
}

impl PipelineError {
    /// Short name of the stage that failed, for diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input",
            Self::Auth(_) | Self::Config(_) | Self::Startup(_) => "startup",
            Self::PipelineFailed { .. } => "execution",
        }
    }
}

impl From<CompletionError> for PipelineError {
    fn from(e: CompletionError) -> Self {
        match e {
            CompletionError::Auth(msg) => Self::Auth(msg),
            other => Self::Startup(other.to_string()),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        Self::Startup(e.to_string())
    }
}

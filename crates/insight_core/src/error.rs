//! Error types for the core module.

use thiserror::Error;

use crate::pipeline::PipelineState;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Session key not found: {0}")]
    KeyNotFound(String),

    #[error("Session key '{key}' is owned by {owner}, refusing write from {producer}")]
    KeyOwned {
        key: String,
        owner: String,
        producer: String,
    },

    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    #[error("No stage registered for state: {0}")]
    StageNotFound(PipelineState),

    #[error("More than one stage registered for state: {0}")]
    DuplicateStage(PipelineState),

    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Wrap an arbitrary stage error.
    pub fn stage_failed(
        stage: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            source: source.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

//! Error types for agents module.

use insight_data::DataError;
use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur during agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Core error: {0}")]
    Core(#[from] insight_core::CoreError),

    #[error("External call failed: {0}")]
    ExternalCall(String),

    #[error("Missing context: {0}")]
    MissingContext(String),
}

impl AgentError {
    /// Create an external call error.
    pub fn external(message: impl Into<String>) -> Self {
        Self::ExternalCall(message.into())
    }

    /// The data error at the root of this failure, if any.
    ///
    /// Stage failures wrap the agent error that caused them, so the whole
    /// source chain is searched.
    pub fn data_error(&self) -> Option<&DataError> {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            if let Some(data) = err.downcast_ref::<DataError>() {
                return Some(data);
            }
            current = err.source();
        }
        None
    }
}

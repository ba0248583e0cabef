//! Stage definitions.
//!
//! A stage is the unit of work the pipeline runs while it sits in one of the
//! working states. Each stage reads its inputs from the [`SessionState`] and
//! writes the artifacts it produces back into it.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use insight_core::{CoreResult, PipelineState, SessionState, Stage, StageReport};
//!
//! struct CountStage;
//!
//! #[async_trait]
//! impl Stage for CountStage {
//!     fn name(&self) -> &str { "count" }
//!     fn state(&self) -> PipelineState { PipelineState::Analytics }
//!
//!     async fn run(&self, session: &mut SessionState) -> CoreResult<StageReport> {
//!         session.set_from(self.name(), "count", &42)?;
//!         Ok(StageReport::new("count").produced("count"))
//!     }
//! }
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::pipeline::PipelineState;
use crate::session::SessionState;

/// Result of a completed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub message: Option<String>,
    /// Session keys written by the stage
    pub produced_keys: Vec<String>,
    /// Files written by the stage
    pub artifacts: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl StageReport {
    pub fn new(stage: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            stage: stage.into(),
            message: None,
            produced_keys: Vec::new(),
            artifacts: Vec::new(),
            started_at: now,
            completed_at: now,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn produced(mut self, key: impl Into<String>) -> Self {
        self.produced_keys.push(key.into());
        self
    }

    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(path.into());
        self
    }
}

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name, used for logging and session key ownership.
    fn name(&self) -> &str;

    /// The working state this stage runs in.
    fn state(&self) -> PipelineState;

    /// Run the stage against the session.
    async fn run(&self, session: &mut SessionState) -> CoreResult<StageReport>;
}

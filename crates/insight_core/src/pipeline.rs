//! Pipeline states and transitions.
//!
//! The pipeline is a fixed linear machine:
//!
//! ```text
//! Start → Intake → Analytics → InsightWriting → Done
//!   └────────┴──────────┴─────────────┴──────→ Failed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Start,
    Intake,
    Analytics,
    InsightWriting,
    Done,
    Failed,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::Start
    }
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Intake => "intake",
            Self::Analytics => "analytics",
            Self::InsightWriting => "insight_writing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Linear successor on the happy path.
    pub fn next(&self) -> Option<PipelineState> {
        match self {
            Self::Start => Some(Self::Intake),
            Self::Intake => Some(Self::Analytics),
            Self::Analytics => Some(Self::InsightWriting),
            Self::InsightWriting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// States that run a stage.
    pub fn working_states() -> [PipelineState; 3] {
        [Self::Intake, Self::Analytics, Self::InsightWriting]
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_transition(&self, to: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }

    /// Validate a transition, returning the target state.
    pub fn transition(&self, to: PipelineState) -> CoreResult<PipelineState> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition { from: *self, to })
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: PipelineState,
    pub to: PipelineState,
    pub at: DateTime<Utc>,
    pub message: Option<String>,
}

impl Transition {
    pub fn new(from: PipelineState, to: PipelineState) -> Self {
        Self {
            from,
            to,
            at: Utc::now(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

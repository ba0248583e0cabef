//! # insight_core
//!
//! Core pipeline machinery for InsightFlow.
//!
//! This crate provides the state machine, the per-run session store and the
//! cross-run memory bank that the agents are built on.
//!
//! # Architecture
//!
//! - **Session**: Key/value artifacts scoped to one run
//! - **Memory bank**: Append-only KPI snapshots persisted across runs
//! - **Stages**: Units of work bound to a pipeline state
//! - **Pipeline**: Runs the stages in the fixed `Start → Intake → Analytics →
//!   InsightWriting → Done` order and persists a run log
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use insight_core::{Pipeline, SessionState};
//!
//! let pipeline = Pipeline::new("insightflow_logs", vec![
//!     Arc::new(IntakeStage), Arc::new(AnalyticsStage), Arc::new(WriterStage),
//! ])?;
//! let mut session = SessionState::new();
//! let log = pipeline.execute(&mut session).await?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod memory;
pub mod pipeline;
pub mod session;
pub mod stage;

// Re-export main types for convenience
pub use config::{FlowConfig, LlmSettings, MEMORY_FILE};
pub use error::{CoreError, CoreResult};
pub use executor::{Pipeline, RunLog, TRANSITIONS_FILE};
pub use memory::{LongTermMemoryBank, MemoryEntry};
pub use pipeline::{PipelineState, Transition};
pub use session::SessionState;
pub use stage::{Stage, StageReport};

//! # insight_agents
//!
//! The agents that make up an InsightFlow run.
//!
//! | Agent | State | Reads | Writes |
//! |-------|-------|-------|--------|
//! | [`DataIntakeAgent`] | Intake | `source_path` | `records`, `profile` |
//! | [`AnalyticsAgent`] | Analytics | `records` | `kpis`, `chart_path` |
//! | [`InsightWriterAgent`] | InsightWriting | `kpis`, `profile`?, `previous_snapshot`? | `summary` |
//!
//! [`OrchestratorAgent`] builds the pipeline from these stages and records
//! each successful run in the long-term memory bank.
//!
//! Summaries come from a fixed template unless a text generation credential
//! (`GEMINI_API_KEY`, `OPENAI_API_KEY` or `ANTHROPIC_API_KEY`) is set, in
//! which case the template is only the fallback.

pub mod analytics;
pub mod error;
pub mod insight;
pub mod intake;
pub mod keys;
pub mod llm;
pub mod orchestrator;

pub use analytics::AnalyticsAgent;
pub use error::{AgentError, AgentResult};
pub use insight::{InsightWriterAgent, SummaryContext, SummaryStrategy, TextGenerator};
pub use intake::DataIntakeAgent;
pub use llm::{LlmAdapter, LlmProvider};
pub use orchestrator::{memory_key, OrchestratorAgent, PipelineReport};

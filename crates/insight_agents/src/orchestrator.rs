//! Orchestrator agent.
//!
//! Wires the three working agents into a [`Pipeline`] and ties each run to
//! the long-term memory bank: the previous snapshot for the same source is
//! seeded into the session before the run, and the new KPI snapshot is
//! recorded after a successful one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use insight_core::{
    FlowConfig, LongTermMemoryBank, MemoryEntry, Pipeline, PipelineState, SessionState, Stage,
    Transition,
};
use insight_data::{KpiResult, ProfileReport};

use crate::analytics::AnalyticsAgent;
use crate::error::AgentResult;
use crate::insight::{InsightWriterAgent, SummaryStrategy};
use crate::intake::DataIntakeAgent;
use crate::keys;

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub source: PathBuf,
    pub state: PipelineState,
    pub profile: ProfileReport,
    pub kpis: KpiResult,
    pub chart_path: PathBuf,
    pub summary: String,
    /// Persisted run log
    pub run_log: PathBuf,
    pub transitions: Vec<Transition>,
}

/// Runs the full intake → analytics → insight pipeline.
#[derive(Debug)]
pub struct OrchestratorAgent {
    config: FlowConfig,
    pipeline: Pipeline,
}

impl OrchestratorAgent {
    pub const NAME: &'static str = "orchestrator";

    /// Build the orchestrator with an explicit summary strategy.
    pub fn new(config: FlowConfig, strategy: SummaryStrategy) -> AgentResult<Self> {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(DataIntakeAgent::new()),
            Arc::new(AnalyticsAgent::from_config(&config)),
            Arc::new(InsightWriterAgent::new(strategy)),
        ];
        let pipeline = Pipeline::new(&config.log_dir, stages)?;

        Ok(Self { config, pipeline })
    }

    /// Build the orchestrator, choosing the summary strategy from the
    /// environment.
    pub fn from_config(config: FlowConfig) -> AgentResult<Self> {
        let strategy = SummaryStrategy::from_env(&config.llm);
        Self::new(config, strategy)
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Process one CSV file end to end.
    ///
    /// On failure the session keeps whatever the completed stages wrote and
    /// the memory bank is left untouched.
    pub async fn process_file(
        &self,
        path: &Path,
        session: &mut SessionState,
        memory: &mut LongTermMemoryBank,
    ) -> AgentResult<PipelineReport> {
        let source = memory_key(path);
        info!("Processing {:?} (run {})", path, session.run_id);

        session.set_from(Self::NAME, keys::SOURCE_PATH, &path)?;
        match memory.latest_for(&source) {
            Some(previous) => {
                info!("Found previous snapshot from {}", previous.recorded_at);
                session.set_from(Self::NAME, keys::PREVIOUS_SNAPSHOT, previous)?;
            }
            None => {
                session.remove(keys::PREVIOUS_SNAPSHOT);
            }
        }

        let log = match self.pipeline.execute(session).await {
            Ok(log) => log,
            Err(e) => {
                warn!("Run {} failed, memory bank not updated", session.run_id);
                return Err(e.into());
            }
        };

        let kpis: KpiResult = session.get(keys::KPIS)?;
        memory.record(MemoryEntry::new(source, session.run_id, kpis.snapshot()))?;

        Ok(PipelineReport {
            run_id: session.run_id,
            source: path.to_path_buf(),
            state: log.state,
            profile: session.get(keys::PROFILE)?,
            chart_path: session.get(keys::CHART_PATH)?,
            summary: session.get(keys::SUMMARY)?,
            kpis,
            run_log: log.log_path(),
            transitions: log.transitions,
        })
    }
}

/// Key under which a file's snapshots are stored in the memory bank.
///
/// The canonical path when the file exists, so relative and absolute
/// invocations share history.
pub fn memory_key(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pipeline_order() {
        let temp = tempdir().unwrap();
        let config = FlowConfig::default().rooted_at(temp.path());
        let orchestrator = OrchestratorAgent::new(config, SummaryStrategy::Template).unwrap();

        assert_eq!(
            orchestrator.pipeline().stage_names(),
            vec![
                DataIntakeAgent::NAME,
                AnalyticsAgent::NAME,
                InsightWriterAgent::NAME
            ]
        );
        assert_eq!(orchestrator.pipeline().log_dir(), temp.path().join("insightflow_logs"));
    }

    #[test]
    fn test_memory_key_canonicalizes_existing_files() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("orders.csv");
        fs::write(&file, "x").unwrap();

        let dotted = temp.path().join(".").join("orders.csv");
        assert_eq!(memory_key(&dotted), memory_key(&file));
        assert_eq!(memory_key(Path::new("missing.csv")), "missing.csv");
    }
}

//! Data intake agent.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use insight_core::{CoreError, CoreResult, PipelineState, SessionState, Stage, StageReport};
use insight_data::{ProfileReport, RecordSet};

use crate::error::{AgentError, AgentResult};
use crate::keys;

/// Loads, profiles and cleans the source CSV.
///
/// Reads [`keys::SOURCE_PATH`], writes [`keys::RECORDS`] and [`keys::PROFILE`].
#[derive(Debug, Default, Clone)]
pub struct DataIntakeAgent;

impl DataIntakeAgent {
    pub const NAME: &'static str = "data_intake";

    pub fn new() -> Self {
        Self
    }

    /// Read, profile and clean a CSV file.
    pub fn ingest(&self, path: &Path) -> AgentResult<(RecordSet, ProfileReport)> {
        Ok(insight_data::ingest(path)?)
    }

    fn process(&self, session: &mut SessionState) -> AgentResult<StageReport> {
        let source: PathBuf = session
            .get_optional(keys::SOURCE_PATH)?
            .ok_or_else(|| AgentError::MissingContext(keys::SOURCE_PATH.to_string()))?;

        let (records, profile) = self.ingest(&source)?;
        info!(
            "Ingested {:?}: {} rows kept of {}",
            source, profile.cleaning.rows_after, profile.num_rows
        );

        session.set_from(Self::NAME, keys::RECORDS, &records)?;
        session.set_from(Self::NAME, keys::PROFILE, &profile)?;

        Ok(StageReport::new(Self::NAME)
            .with_message(format!(
                "{} rows x {} columns, {} after cleaning",
                profile.num_rows, profile.num_cols, profile.cleaning.rows_after
            ))
            .produced(keys::RECORDS)
            .produced(keys::PROFILE))
    }
}

#[async_trait]
impl Stage for DataIntakeAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn state(&self) -> PipelineState {
        PipelineState::Intake
    }

    async fn run(&self, session: &mut SessionState) -> CoreResult<StageReport> {
        self.process(session)
            .map_err(|e| CoreError::stage_failed(Self::NAME, e))
    }
}

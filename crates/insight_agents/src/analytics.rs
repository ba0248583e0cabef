//! Analytics agent: KPIs and the monthly revenue chart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use insight_core::{CoreError, CoreResult, FlowConfig, PipelineState, SessionState, Stage, StageReport};
use insight_data::{compute_kpis, render_chart, KpiResult, RecordSet};

use crate::error::AgentResult;
use crate::keys;

/// Computes KPIs and renders the chart.
///
/// Reads [`keys::RECORDS`], writes [`keys::KPIS`] and [`keys::CHART_PATH`].
#[derive(Debug, Clone)]
pub struct AnalyticsAgent {
    chart_path: PathBuf,
}

impl AnalyticsAgent {
    pub const NAME: &'static str = "analytics";

    pub fn new(chart_path: impl Into<PathBuf>) -> Self {
        Self {
            chart_path: chart_path.into(),
        }
    }

    pub fn from_config(config: &FlowConfig) -> Self {
        Self::new(config.chart_path())
    }

    pub fn chart_path(&self) -> &Path {
        &self.chart_path
    }

    pub fn compute(&self, records: &RecordSet) -> AgentResult<KpiResult> {
        Ok(compute_kpis(records)?)
    }

    /// Render the monthly revenue chart to the configured path.
    pub fn chart(&self, kpis: &KpiResult) -> AgentResult<PathBuf> {
        Ok(render_chart(&kpis.monthly_revenue, &self.chart_path)?)
    }

    fn process(&self, session: &mut SessionState) -> AgentResult<StageReport> {
        let records: RecordSet = session.get(keys::RECORDS)?;

        let kpis = self.compute(&records)?;
        session.set_from(Self::NAME, keys::KPIS, &kpis)?;

        let chart = self.chart(&kpis)?;
        session.set_from(Self::NAME, keys::CHART_PATH, &chart)?;
        info!("Analytics done: {} months charted", kpis.monthly_revenue.len());

        Ok(StageReport::new(Self::NAME)
            .with_message(format!(
                "revenue {:.2} over {} orders",
                kpis.total_revenue, kpis.order_count
            ))
            .produced(keys::KPIS)
            .produced(keys::CHART_PATH)
            .with_artifact(chart))
    }
}

#[async_trait]
impl Stage for AnalyticsAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn state(&self) -> PipelineState {
        PipelineState::Analytics
    }

    async fn run(&self, session: &mut SessionState) -> CoreResult<StageReport> {
        self.process(session)
            .map_err(|e| CoreError::stage_failed(Self::NAME, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use insight_data::{Cell, DataError};
    use tempfile::tempdir;

    fn records() -> RecordSet {
        RecordSet::from_rows(
            &["order_id", "customer_id", "order_date", "amount"],
            vec![
                vec![Cell::from(1.0), Cell::from("a"), Cell::from("2024-01-02"), Cell::from(40.0)],
                vec![Cell::from(2.0), Cell::from("b"), Cell::from("2024-02-02"), Cell::from(60.0)],
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_analytics_writes_kpis_and_chart() {
        let temp = tempdir().unwrap();
        let agent = AnalyticsAgent::new(temp.path().join("out").join("chart.svg"));

        let mut session = SessionState::new();
        session.set(keys::RECORDS, &records()).unwrap();

        let report = agent.run(&mut session).await.unwrap();
        assert_eq!(report.artifacts, vec![agent.chart_path().to_path_buf()]);

        let kpis: KpiResult = session.get(keys::KPIS).unwrap();
        assert_eq!(kpis.total_revenue, 100.0);
        assert_eq!(kpis.average_order_value, 50.0);

        let chart: PathBuf = session.get(keys::CHART_PATH).unwrap();
        assert!(chart.exists());
    }

    #[test]
    fn test_missing_column_surfaces() {
        let agent = AnalyticsAgent::new("unused.svg");
        let records = RecordSet::from_rows(&["order_id"], vec![]).unwrap();
        let err = agent.compute(&records).unwrap_err();
        assert!(matches!(err, AgentError::Data(DataError::MissingColumn(ref c)) if c == "amount"));
    }

    #[test]
    fn test_chart_path_from_config() {
        let config = FlowConfig::default();
        let agent = AnalyticsAgent::from_config(&config);
        assert_eq!(agent.chart_path(), config.chart_path());
    }
}

//! Insight writer agent.
//!
//! Produces the executive summary. The strategy is fixed when the agent is
//! built: a deterministic template, or a text generator with the template as
//! fallback for any failure.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use insight_core::{
    CoreError, CoreResult, LlmSettings, MemoryEntry, PipelineState, SessionState, Stage, StageReport,
};
use insight_data::kpi::TOTAL_REVENUE;
use insight_data::{KpiResult, ProfileReport};

use crate::error::AgentResult;
use crate::keys;
use crate::llm::LlmAdapter;

const CLOSING_LINE: &str =
    "This dataset shows consistent patterns suitable for further forecasting or segmentation.";

/// Source of generated summary text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AgentResult<String>;
}

/// How the summary is produced.
#[derive(Clone)]
pub enum SummaryStrategy {
    Template,
    Generated(Arc<dyn TextGenerator>),
}

impl SummaryStrategy {
    /// `Generated` when a provider credential is present, `Template` otherwise.
    pub fn from_env(settings: &LlmSettings) -> Self {
        match LlmAdapter::from_env(settings) {
            Ok(adapter) => {
                info!(
                    "Summary generation enabled ({:?}, {})",
                    adapter.provider(),
                    adapter.model()
                );
                Self::Generated(Arc::new(adapter))
            }
            Err(_) => {
                info!("No text generation credentials, using template summaries");
                Self::Template
            }
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

impl std::fmt::Debug for SummaryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template => f.write_str("Template"),
            Self::Generated(_) => f.write_str("Generated"),
        }
    }
}

/// Optional inputs that enrich the summary.
#[derive(Debug, Clone, Default)]
pub struct SummaryContext {
    pub profile: Option<ProfileReport>,
    /// Snapshot recorded by the previous run on the same source
    pub previous: Option<MemoryEntry>,
}

/// Writes the executive summary.
///
/// Reads [`keys::KPIS`] plus the optional [`keys::PROFILE`] and
/// [`keys::PREVIOUS_SNAPSHOT`], writes [`keys::SUMMARY`].
#[derive(Debug, Clone)]
pub struct InsightWriterAgent {
    strategy: SummaryStrategy,
}

impl InsightWriterAgent {
    pub const NAME: &'static str = "insight_writer";

    pub fn new(strategy: SummaryStrategy) -> Self {
        Self { strategy }
    }

    pub fn template() -> Self {
        Self::new(SummaryStrategy::Template)
    }

    pub fn strategy(&self) -> &SummaryStrategy {
        &self.strategy
    }

    pub async fn summarize(&self, kpis: &KpiResult) -> String {
        self.summarize_with(kpis, &SummaryContext::default()).await
    }

    /// Produce the summary. Never fails: generation problems fall back to
    /// the template.
    pub async fn summarize_with(&self, kpis: &KpiResult, context: &SummaryContext) -> String {
        let generator = match &self.strategy {
            SummaryStrategy::Template => return Self::render_template(kpis, context),
            SummaryStrategy::Generated(generator) => generator,
        };

        match generator.generate(&Self::build_prompt(kpis, context)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Text generation returned an empty response, using template");
                Self::render_template(kpis, context)
            }
            Err(e) => {
                warn!("Text generation failed, using template: {}", e);
                Self::render_template(kpis, context)
            }
        }
    }

    /// Deterministic summary.
    pub fn render_template(kpis: &KpiResult, context: &SummaryContext) -> String {
        let mut out = String::from("Executive Summary:\n");

        if let Some(profile) = &context.profile {
            let _ = writeln!(out, "- Rows: {}", profile.num_rows);
            let _ = writeln!(out, "- Columns: {}", profile.num_cols);
        }
        let _ = writeln!(out, "- Total Revenue: {:.2}", kpis.total_revenue);
        let _ = writeln!(out, "- Total Orders: {}", kpis.order_count);
        let _ = writeln!(out, "- Unique Customers: {}", kpis.unique_customers);
        let _ = writeln!(out, "- Average Order Value: {:.2}", kpis.average_order_value);
        if let Some((month, revenue)) = kpis.best_month() {
            let _ = writeln!(out, "- Best Month: {} ({:.2})", month, revenue);
        }
        if let Some(previous) = context.previous.as_ref().and_then(|p| p.value(TOTAL_REVENUE)) {
            let _ = writeln!(out, "{}", trend_line(kpis.total_revenue, previous));
        }

        out.push_str(CLOSING_LINE);
        out
    }

    /// Prompt sent to the text generator.
    pub fn build_prompt(kpis: &KpiResult, context: &SummaryContext) -> String {
        let mut prompt = String::from(
            "You are a business analyst. Write a short executive summary \
             (at most five bullet points) of the following e-commerce KPIs.\n\n",
        );

        if let Some(profile) = &context.profile {
            let _ = writeln!(
                prompt,
                "Dataset: {} rows, {} columns, {} rows after cleaning",
                profile.num_rows, profile.num_cols, profile.cleaning.rows_after
            );
        }
        let _ = writeln!(prompt, "Total revenue: {:.2}", kpis.total_revenue);
        let _ = writeln!(prompt, "Orders: {}", kpis.order_count);
        let _ = writeln!(prompt, "Unique customers: {}", kpis.unique_customers);
        let _ = writeln!(prompt, "Average order value: {:.2}", kpis.average_order_value);
        prompt.push_str("Monthly revenue:\n");
        for (month, revenue) in &kpis.monthly_revenue {
            let _ = writeln!(prompt, "  {}: {:.2}", month, revenue);
        }
        if let Some(previous) = context.previous.as_ref().and_then(|p| p.value(TOTAL_REVENUE)) {
            let _ = writeln!(prompt, "Previous run total revenue: {:.2}", previous);
        }

        prompt
    }

    async fn process(&self, session: &mut SessionState) -> AgentResult<StageReport> {
        let kpis: KpiResult = session.get(keys::KPIS)?;
        let context = SummaryContext {
            profile: session.get_optional(keys::PROFILE)?,
            previous: session.get_optional(keys::PREVIOUS_SNAPSHOT)?,
        };

        let summary = self.summarize_with(&kpis, &context).await;
        session.set_from(Self::NAME, keys::SUMMARY, &summary)?;

        Ok(StageReport::new(Self::NAME)
            .with_message(format!("{:?} summary, {} chars", self.strategy, summary.len()))
            .produced(keys::SUMMARY))
    }
}

fn trend_line(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return format!(
            "- Revenue Trend: {:.2} vs no revenue in the previous run",
            current
        );
    }

    let change = (current - previous) / previous.abs() * 100.0;
    if current > previous {
        format!("- Revenue Trend: up {:.1}% vs previous run ({:.2})", change, previous)
    } else if current < previous {
        format!("- Revenue Trend: down {:.1}% vs previous run ({:.2})", -change, previous)
    } else {
        format!("- Revenue Trend: unchanged vs previous run ({:.2})", previous)
    }
}

#[async_trait]
impl Stage for InsightWriterAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn state(&self) -> PipelineState {
        PipelineState::InsightWriting
    }

    async fn run(&self, session: &mut SessionState) -> CoreResult<StageReport> {
        self.process(session)
            .await
            .map_err(|e| CoreError::stage_failed(Self::NAME, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use insight_data::{MonthlySeries, YearMonth};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn kpis() -> KpiResult {
        let mut monthly_revenue = MonthlySeries::new();
        monthly_revenue.insert(YearMonth::new(2024, 1), 300.0);
        monthly_revenue.insert(YearMonth::new(2024, 2), 701.0);
        KpiResult {
            total_revenue: 1001.0,
            order_count: 4,
            unique_customers: 3,
            average_order_value: 250.25,
            monthly_revenue,
        }
    }

    fn previous(revenue: f64) -> MemoryEntry {
        let mut values = BTreeMap::new();
        values.insert(TOTAL_REVENUE.to_string(), revenue);
        MemoryEntry::new("orders.csv", Uuid::new_v4(), values)
    }

    #[test]
    fn test_template_lines() {
        let summary = InsightWriterAgent::render_template(&kpis(), &SummaryContext::default());
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Executive Summary:",
                "- Total Revenue: 1001.00",
                "- Total Orders: 4",
                "- Unique Customers: 3",
                "- Average Order Value: 250.25",
                "- Best Month: 2024-02 (701.00)",
                CLOSING_LINE,
            ]
        );
    }

    #[tokio::test]
    async fn test_template_is_deterministic() {
        let agent = InsightWriterAgent::template();
        let first = agent.summarize(&kpis()).await;
        let second = agent.summarize(&kpis()).await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_trend_line() {
        let context = SummaryContext {
            profile: None,
            previous: Some(previous(800.8)),
        };
        let summary = InsightWriterAgent::render_template(&kpis(), &context);
        assert!(summary.contains("- Revenue Trend: up 25.0% vs previous run (800.80)"));

        assert_eq!(
            trend_line(50.0, 100.0),
            "- Revenue Trend: down 50.0% vs previous run (100.00)"
        );
        assert_eq!(
            trend_line(100.0, 100.0),
            "- Revenue Trend: unchanged vs previous run (100.00)"
        );
    }

    #[tokio::test]
    async fn test_generated_text_is_used() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt| prompt.contains("Total revenue: 1001.00") && prompt.contains("2024-02: 701.00"))
            .times(1)
            .returning(|_| Ok("  Revenue grew steadily.\n".to_string()));

        let agent = InsightWriterAgent::new(SummaryStrategy::Generated(Arc::new(generator)));
        assert_eq!(agent.summarize(&kpis()).await, "Revenue grew steadily.");
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back_to_template() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(AgentError::external("quota exceeded")));

        let agent = InsightWriterAgent::new(SummaryStrategy::Generated(Arc::new(generator)));
        let expected = InsightWriterAgent::render_template(&kpis(), &SummaryContext::default());
        assert_eq!(agent.summarize(&kpis()).await, expected);
    }

    #[tokio::test]
    async fn test_empty_generation_falls_back_to_template() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok("   ".to_string()));

        let agent = InsightWriterAgent::new(SummaryStrategy::Generated(Arc::new(generator)));
        let summary = agent.summarize(&kpis()).await;
        assert!(summary.starts_with("Executive Summary:"));
    }

    #[tokio::test]
    async fn test_stage_reads_optional_context() {
        let mut session = SessionState::new();
        session.set(keys::KPIS, &kpis()).unwrap();
        session.set(keys::PREVIOUS_SNAPSHOT, &previous(1001.0)).unwrap();

        InsightWriterAgent::template().run(&mut session).await.unwrap();

        let summary: String = session.get(keys::SUMMARY).unwrap();
        assert!(summary.contains("unchanged vs previous run"));
        assert!(!summary.contains("- Rows:"));
    }

    #[tokio::test]
    async fn test_stage_without_kpis_fails() {
        let mut session = SessionState::new();
        let err = InsightWriterAgent::template().run(&mut session).await.unwrap_err();
        assert!(matches!(err, CoreError::StageFailed { ref stage, .. } if stage == InsightWriterAgent::NAME));
    }
}

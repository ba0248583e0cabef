//! CLI command definitions.
//!
//! This module defines the command structure for the InsightFlow CLI and the
//! helpers shared by the subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use insight_agents::{OrchestratorAgent, PipelineReport, SummaryStrategy};
use insight_core::{FlowConfig, LongTermMemoryBank, SessionState};

pub mod demo;
pub mod generate;
pub mod history;
pub mod run;

/// InsightFlow - automated CSV business insights
#[derive(Parser, Debug)]
#[command(name = "insightflow")]
#[command(version, about = "InsightFlow - automated CSV business insights")]
#[command(long_about = r#"
InsightFlow turns an order export into a data profile, KPIs, a monthly
revenue chart and an executive summary.

COMMANDS:
  run       → Run the pipeline on a CSV file
  demo      → Generate the demo dataset and run the pipeline on it
  generate  → Write the demo dataset only
  history   → Show KPI snapshots from previous runs

SUMMARIES:
  Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY to generate the
  summary with an LLM. Without a key, or with --offline, a fixed template
  is used.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Format error
  4 - Missing column
  5 - I/O error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true, env = "INSIGHTFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for charts and generated datasets
    #[arg(long, global = true, env = "INSIGHTFLOW_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory for run logs and the log file
    #[arg(long, global = true, env = "INSIGHTFLOW_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Memory bank file
    #[arg(long, global = true, env = "INSIGHTFLOW_MEMORY")]
    pub memory: Option<PathBuf>,

    /// Never call an LLM, always use the template summary
    #[arg(long, global = true, env = "INSIGHTFLOW_OFFLINE")]
    pub offline: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Configuration file values, overridden by flags.
    pub fn resolve(&self) -> Result<FlowConfig> {
        let mut config = match &self.config {
            Some(path) => FlowConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => FlowConfig::default(),
        };

        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = log_dir.clone();
        }
        if let Some(memory) = &self.memory {
            config.memory_path = Some(memory.clone());
        }

        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline on a CSV file
    Run(run::RunArgs),

    /// Generate the demo dataset and run the pipeline on it
    Demo(demo::DemoArgs),

    /// Write the demo dataset without running the pipeline
    Generate(generate::GenerateArgs),

    /// Show KPI snapshots from previous runs
    History(history::HistoryArgs),
}

/// Resolved settings handed to every command.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: FlowConfig,
    pub offline: bool,
}

impl AppContext {
    fn strategy(&self) -> SummaryStrategy {
        if self.offline {
            SummaryStrategy::Template
        } else {
            SummaryStrategy::from_env(&self.config.llm)
        }
    }
}

/// Run the full pipeline on one file and record it in the memory bank.
pub async fn run_pipeline(ctx: &AppContext, path: &Path) -> Result<PipelineReport> {
    let orchestrator = OrchestratorAgent::new(ctx.config.clone(), ctx.strategy())
        .context("Failed to build pipeline")?;
    let memory_path = ctx.config.memory_path();
    let mut memory = LongTermMemoryBank::open(&memory_path)
        .with_context(|| format!("Failed to open memory bank {}", memory_path.display()))?;
    let mut session = SessionState::new();

    let result = orchestrator
        .process_file(path, &mut session, &mut memory)
        .await;
    memory.close().context("Failed to close memory bank")?;

    let report = result.with_context(|| format!("Pipeline failed for {}", path.display()))?;
    info!("Run {} finished", report.run_id);
    Ok(report)
}

/// Print a report as pretty JSON or as a human-readable overview.
pub fn print_report(report: &PipelineReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let profile = &report.profile;
    let cleaning = &profile.cleaning;
    println!("📋 Profile");
    println!(
        "   Rows: {} ({} after cleaning: {} with missing values, {} duplicates)",
        profile.num_rows,
        cleaning.rows_after,
        cleaning.null_rows_dropped,
        cleaning.duplicate_rows_dropped
    );
    println!("   Columns: {}", profile.num_cols);
    for column in &profile.columns {
        println!(
            "     - {} ({}, {} nulls)",
            column.name, column.dtype, column.null_count
        );
    }
    println!();

    let kpis = &report.kpis;
    println!("📈 KPIs");
    println!("   Total revenue:       {:.2}", kpis.total_revenue);
    println!("   Orders:              {}", kpis.order_count);
    println!("   Unique customers:    {}", kpis.unique_customers);
    println!("   Average order value: {:.2}", kpis.average_order_value);
    println!("   Monthly revenue:");
    for (month, revenue) in &kpis.monthly_revenue {
        println!("     {}  {:>12.2}", month, revenue);
    }
    println!();

    println!("📝 {}", report.summary.replace('\n', "\n   "));
    println!();
    println!("🖼️  Chart:   {}", report.chart_path.display());
    println!("📁 Run log: {}", report.run_log.display());

    Ok(())
}

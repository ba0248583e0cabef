//! Demo command - Generate the demo dataset and analyze it.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use insight_data::{write_demo_csv, DemoConfig, DEMO_FILE};

use super::{print_report, run_pipeline, AppContext};

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Seed for a reproducible dataset
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of days of orders to generate
    #[arg(long, default_value_t = 90)]
    pub days: usize,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: DemoArgs, ctx: &AppContext) -> Result<()> {
    let mut demo = DemoConfig::default().with_days(args.days);
    demo.seed = args.seed;

    let path = ctx.config.output_dir.join(DEMO_FILE);
    write_demo_csv(&path, &demo)
        .with_context(|| format!("Failed to write demo dataset to {}", path.display()))?;
    info!("Running InsightFlow demo on {:?}", path);

    if !args.json {
        println!("🧪 Demo dataset: {}", path.display());
        println!();
    }

    let report = run_pipeline(ctx, &path).await?;
    print_report(&report, args.json)?;

    if !args.json {
        println!();
        println!("✅ Demo complete");
    }
    Ok(())
}

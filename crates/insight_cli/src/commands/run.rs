//! Run command - Run the pipeline on a CSV file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{print_report, run_pipeline, AppContext};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// CSV file to analyze
    pub csv: PathBuf,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: RunArgs, ctx: &AppContext) -> Result<()> {
    info!("Running InsightFlow on {:?}", args.csv);

    let report = run_pipeline(ctx, &args.csv).await?;
    print_report(&report, args.json)?;

    if !args.json {
        println!();
        println!("✅ Analysis complete");
    }
    Ok(())
}

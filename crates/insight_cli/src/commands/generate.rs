//! Generate command - Write the demo dataset.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use insight_data::{write_demo_csv, DemoConfig};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Destination CSV file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Seed for a reproducible dataset
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of days of orders to generate
    #[arg(long, default_value_t = 90)]
    pub days: usize,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let mut demo = DemoConfig::default().with_days(args.days);
    demo.seed = args.seed;

    let path = write_demo_csv(&args.output, &demo)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("✅ Wrote {} days of demo orders to {}", args.days, path.display());
    Ok(())
}

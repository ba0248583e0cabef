//! History command - Show KPI snapshots from previous runs.

use anyhow::{Context, Result};
use clap::Args;

use insight_core::LongTermMemoryBank;
use insight_data::kpi::{AVERAGE_ORDER_VALUE, ORDER_COUNT, TOTAL_REVENUE, UNIQUE_CUSTOMERS};

use super::AppContext;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Number of entries to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: HistoryArgs, ctx: &AppContext) -> Result<()> {
    let path = &ctx.config.memory_path();
    if !path.exists() {
        println!("No runs recorded yet ({} does not exist)", path.display());
        return Ok(());
    }

    let memory = LongTermMemoryBank::open(path)
        .with_context(|| format!("Failed to open memory bank {}", path.display()))?;
    let entries = memory.recent(args.limit);

    if args.json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No runs recorded yet");
        return Ok(());
    }

    println!(
        "📚 Last {} of {} runs ({})",
        entries.len(),
        memory.len(),
        path.display()
    );
    println!();
    println!(
        "{:<20} {:>14} {:>8} {:>10} {:>12}  SOURCE",
        "RECORDED", "REVENUE", "ORDERS", "CUSTOMERS", "AVG ORDER"
    );
    for entry in entries {
        let value = |name: &str| entry.value(name).unwrap_or_default();
        println!(
            "{:<20} {:>14.2} {:>8} {:>10} {:>12.2}  {}",
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            value(TOTAL_REVENUE),
            value(ORDER_COUNT),
            value(UNIQUE_CUSTOMERS),
            value(AVERAGE_ORDER_VALUE),
            entry.source
        );
    }

    Ok(())
}

//! Demo e-commerce dataset.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::DataResult;
use crate::record::{Cell, RecordSet};

/// File name used when the demo dataset is written into an output directory.
pub const DEMO_FILE: &str = "demo_ecommerce.csv";

/// Shape of the generated dataset.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// One order per day
    pub days: usize,
    pub start: NaiveDate,
    pub first_order_id: i64,
    /// Customer ids are drawn from `1..customers`
    pub customers: i64,
    /// Amounts are drawn from `min_amount..max_amount`
    pub min_amount: i64,
    pub max_amount: i64,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            days: 90,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            first_order_id: 1000,
            customers: 20,
            min_amount: 200,
            max_amount: 1500,
            seed: None,
        }
    }
}

impl DemoConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_days(mut self, days: usize) -> Self {
        self.days = days;
        self
    }
}

/// Generate the demo orders table.
pub fn generate(config: &DemoConfig) -> RecordSet {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut records = RecordSet::new(
        ["order_id", "customer_id", "order_date", "amount"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    );

    for day in 0..config.days {
        let date = config.start + Duration::days(day as i64);
        let row = vec![
            Cell::from(config.first_order_id + day as i64),
            Cell::from(rng.gen_range(1..config.customers.max(2))),
            Cell::Text(date.format("%Y-%m-%d").to_string()),
            Cell::from(rng.gen_range(config.min_amount..config.max_amount.max(config.min_amount + 1))),
        ];
        records.rows_mut().push(row);
    }

    records
}

/// Write a record set as CSV.
pub fn write_csv(records: &RecordSet, path: &Path) -> DataResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(records.columns())?;
    for row in records.rows() {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Generate the demo dataset and write it to `path`.
pub fn write_demo_csv(path: &Path, config: &DemoConfig) -> DataResult<PathBuf> {
    let records = generate(config);
    write_csv(&records, path)?;
    info!("Demo dataset with {} rows written to {:?}", records.num_rows(), path);
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::ingest;
    use crate::kpi::compute_kpis;
    use tempfile::tempdir;

    #[test]
    fn test_generate_shape() {
        let records = generate(&DemoConfig::default().with_seed(7));
        assert_eq!(records.num_rows(), 90);
        assert_eq!(records.columns(), ["order_id", "customer_id", "order_date", "amount"]);

        let first = &records.rows()[0];
        assert_eq!(first[0], Cell::from(1000.0));
        assert_eq!(first[2], Cell::from("2024-01-01"));
        let last = &records.rows()[89];
        assert_eq!(last[2], Cell::from("2024-03-30"));

        for row in records.rows() {
            let customer = row[1].as_f64().unwrap();
            let amount = row[3].as_f64().unwrap();
            assert!((1.0..20.0).contains(&customer));
            assert!((200.0..1500.0).contains(&amount));
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let config = DemoConfig::default().with_seed(42).with_days(30);
        assert_eq!(generate(&config), generate(&config));
    }

    #[test]
    fn test_written_demo_round_trips_through_intake() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(DEMO_FILE);
        write_demo_csv(&path, &DemoConfig::default().with_seed(1)).unwrap();

        let (records, profile) = ingest(&path).unwrap();
        assert_eq!(profile.num_rows, 90);
        assert_eq!(profile.cleaning.rows_after, 90);

        let kpis = compute_kpis(&records).unwrap();
        assert_eq!(kpis.order_count, 90);
        assert_eq!(kpis.monthly_revenue.len(), 3);
    }
}

//! KPI computation.
//!
//! All KPIs are deterministic aggregations over the cleaned record set:
//!
//! | KPI | Definition |
//! |-----|------------|
//! | total revenue | sum of the monthly revenue values, in month order |
//! | order count | distinct `order_id` |
//! | unique customers | distinct `customer_id` |
//! | average order value | total revenue / order count |
//! | monthly revenue | sum of `amount` per calendar month of `order_date` |
//!
//! Total revenue is derived from the monthly series so that summing the
//! series in month order reproduces it exactly.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::error::{DataError, DataResult};
use crate::record::{parse_date, Cell, RecordSet};

pub const TOTAL_REVENUE: &str = "total_revenue";
pub const ORDER_COUNT: &str = "order_count";
pub const UNIQUE_CUSTOMERS: &str = "unique_customers";
pub const AVERAGE_ORDER_VALUE: &str = "average_order_value";

/// Columns `compute_kpis` needs, in the order they are checked.
pub const KPI_COLUMNS: [&str; 4] = ["amount", "order_id", "customer_id", "order_date"];

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {:?}", s))?;
        let year = year.parse().map_err(|_| format!("invalid year in {:?}", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in {:?}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in {:?}", s));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Monthly revenue, ordered by month.
pub type MonthlySeries = BTreeMap<YearMonth, f64>;

/// KPI values for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    pub total_revenue: f64,
    pub order_count: usize,
    pub unique_customers: usize,
    pub average_order_value: f64,
    pub monthly_revenue: MonthlySeries,
}

impl KpiResult {
    /// Scalar KPIs keyed by name, suitable for the memory bank.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let mut values = BTreeMap::new();
        values.insert(TOTAL_REVENUE.to_string(), self.total_revenue);
        values.insert(ORDER_COUNT.to_string(), self.order_count as f64);
        values.insert(UNIQUE_CUSTOMERS.to_string(), self.unique_customers as f64);
        values.insert(AVERAGE_ORDER_VALUE.to_string(), self.average_order_value);
        values
    }

    /// Month with the highest revenue. Ties go to the earliest month.
    pub fn best_month(&self) -> Option<(YearMonth, f64)> {
        self.monthly_revenue
            .iter()
            .fold(None, |best: Option<(YearMonth, f64)>, (&month, &value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((month, value)),
            })
    }
}

/// Compute the KPI set from a cleaned record set.
pub fn compute_kpis(records: &RecordSet) -> DataResult<KpiResult> {
    let [amount_idx, order_idx, customer_idx, date_idx] = {
        let mut indices = [0usize; 4];
        for (slot, column) in indices.iter_mut().zip(KPI_COLUMNS) {
            *slot = records.require_column(column)?;
        }
        indices
    };

    info!("Computing KPIs over {} rows", records.num_rows());

    let mut orders = HashSet::new();
    let mut customers = HashSet::new();
    let mut monthly_revenue = MonthlySeries::new();

    for (row_number, row) in records.rows().iter().enumerate() {
        let amount = row[amount_idx]
            .as_f64()
            .ok_or_else(|| invalid(&row[amount_idx], "amount", row_number))?;
        let month = month_of(&row[date_idx])
            .ok_or_else(|| invalid(&row[date_idx], "order_date", row_number))?;
        let order = row[order_idx]
            .key()
            .ok_or_else(|| invalid(&row[order_idx], "order_id", row_number))?;
        let customer = row[customer_idx]
            .key()
            .ok_or_else(|| invalid(&row[customer_idx], "customer_id", row_number))?;

        *monthly_revenue.entry(month).or_insert(0.0) += amount;
        orders.insert(order);
        customers.insert(customer);
    }

    let total_revenue: f64 = monthly_revenue.values().sum();
    let order_count = orders.len();
    let average_order_value = if order_count == 0 {
        0.0
    } else {
        total_revenue / order_count as f64
    };

    info!(
        "KPIs computed: revenue={:.2}, orders={}, customers={}",
        total_revenue,
        order_count,
        customers.len()
    );

    Ok(KpiResult {
        total_revenue,
        order_count,
        unique_customers: customers.len(),
        average_order_value,
        monthly_revenue,
    })
}

fn month_of(cell: &Cell) -> Option<YearMonth> {
    let date = parse_date(&cell.key()?)?;
    Some(YearMonth::new(date.year(), date.month()))
}

fn invalid(cell: &Cell, column: &str, row: usize) -> DataError {
    // Row numbers are 1-based to match what a spreadsheet shows
    DataError::invalid_value(column, row + 1, cell.to_string())
}

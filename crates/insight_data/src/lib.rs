//! # insight_data
//!
//! Tabular data handling for InsightFlow.
//!
//! - **Intake**: Read an order export, normalize headers, profile and clean
//! - **KPIs**: Revenue, order and customer aggregates plus a monthly series
//! - **Charts**: Monthly revenue as a standalone SVG bar chart
//! - **Demo**: Reproducible synthetic order data

pub mod chart;
pub mod demo;
pub mod error;
pub mod intake;
pub mod kpi;
pub mod profile;
pub mod record;

pub use chart::{render_chart, render_svg, MONTHLY_REVENUE_CHART};
pub use demo::{generate, write_csv, write_demo_csv, DemoConfig, DEMO_FILE};
pub use error::{DataError, DataResult};
pub use intake::{clean, ingest, ingest_reader, read_csv, REQUIRED_COLUMNS};
pub use kpi::{compute_kpis, KpiResult, MonthlySeries, YearMonth};
pub use profile::{CleaningStats, ColumnProfile, ProfileReport};
pub use record::{Cell, ColumnKind, RecordSet};

//! Session keys shared between the agents.

/// Path of the CSV being processed (`PathBuf`)
pub const SOURCE_PATH: &str = "source_path";
/// Cleaned record set (`RecordSet`)
pub const RECORDS: &str = "records";
/// Raw-table profile with cleaning stats (`ProfileReport`)
pub const PROFILE: &str = "profile";
/// Computed KPIs (`KpiResult`)
pub const KPIS: &str = "kpis";
/// Written chart (`PathBuf`)
pub const CHART_PATH: &str = "chart_path";
/// Executive summary (`String`)
pub const SUMMARY: &str = "summary";
/// Last memory bank entry for the same source (`MemoryEntry`)
pub const PREVIOUS_SNAPSHOT: &str = "previous_snapshot";

//! Descriptive profiling of a record set.

use serde::{Deserialize, Serialize};

use crate::record::{ColumnKind, RecordSet};

/// Per-column profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: ColumnKind,
    pub null_count: usize,
}

/// What the cleaning pass did to the raw table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub rows_before: usize,
    pub null_rows_dropped: usize,
    pub duplicate_rows_dropped: usize,
    pub rows_after: usize,
    /// Columns converted to numbers
    pub coerced_columns: Vec<String>,
}

/// Profile of the raw table plus cleaning statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub num_rows: usize,
    pub num_cols: usize,
    pub columns: Vec<ColumnProfile>,
    #[serde(default)]
    pub cleaning: CleaningStats,
}

impl ProfileReport {
    /// Profile a record set without touching it.
    pub fn of(records: &RecordSet) -> Self {
        let columns = records
            .columns()
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let cells = records.rows().iter().map(|row| &row[index]);
                ColumnProfile {
                    name: name.clone(),
                    dtype: ColumnKind::infer(cells.clone()),
                    null_count: cells.filter(|c| c.is_null()).count(),
                }
            })
            .collect();

        Self {
            num_rows: records.num_rows(),
            num_cols: records.num_cols(),
            columns,
            cleaning: CleaningStats::default(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn total_nulls(&self) -> usize {
        self.columns.iter().map(|c| c.null_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Cell;

    #[test]
    fn test_profile_counts_and_types() {
        let records = RecordSet::from_rows(
            &["order_id", "amount", "note"],
            vec![
                vec![Cell::from("1"), Cell::from("10.5"), Cell::Null],
                vec![Cell::from("2"), Cell::Null, Cell::Null],
                vec![Cell::from("3"), Cell::from("7"), Cell::from("gift")],
            ],
        )
        .unwrap();

        let profile = ProfileReport::of(&records);
        assert_eq!(profile.num_rows, 3);
        assert_eq!(profile.num_cols, 3);
        assert_eq!(profile.column("order_id").unwrap().dtype, ColumnKind::Integer);
        assert_eq!(profile.column("amount").unwrap().dtype, ColumnKind::Float);
        assert_eq!(profile.column("amount").unwrap().null_count, 1);
        assert_eq!(profile.column("note").unwrap().dtype, ColumnKind::Text);
        assert_eq!(profile.total_nulls(), 3);
    }

    #[test]
    fn test_profile_does_not_alter_records() {
        let records = RecordSet::from_rows(&["a"], vec![vec![Cell::from("x")]]).unwrap();
        let before = records.clone();
        let _ = ProfileReport::of(&records);
        assert_eq!(records, before);
    }
}

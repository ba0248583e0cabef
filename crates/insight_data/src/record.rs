//! In-memory tabular record set.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of the cell. Text is parsed when it looks numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => parse_number(s),
            Cell::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Identity key used for distinct counts and duplicate detection.
    pub fn key(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

/// Parse a finite number, ignoring surrounding whitespace.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a calendar date from the formats commonly found in exports.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Inferred column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Date,
    Text,
    /// Every value is null
    Empty,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Date => "date",
            Self::Text => "text",
            Self::Empty => "empty",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Infer the kind of a column from its cells.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut seen = false;
        let mut integer = true;
        let mut numeric = true;
        let mut date = true;

        for cell in cells {
            if cell.is_null() {
                continue;
            }
            seen = true;
            match cell.as_f64() {
                Some(n) => integer &= n.fract() == 0.0,
                None => {
                    numeric = false;
                    integer = false;
                }
            }
            if date {
                date = cell.as_str().and_then(parse_date).is_some();
            }
        }

        if !seen {
            Self::Empty
        } else if integer {
            Self::Integer
        } else if numeric {
            Self::Float
        } else if date {
            Self::Date
        } else {
            Self::Text
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named columns and rows of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a record set from literal columns and rows.
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<Cell>>) -> DataResult<Self> {
        let mut records = Self::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            records.push_row(row)?;
        }
        Ok(records)
    }

    /// Append a row. The row must have one cell per column.
    pub fn push_row(&mut self, row: Vec<Cell>) -> DataResult<()> {
        if row.len() != self.columns.len() {
            return Err(DataError::Format(format!(
                "row {} has {} fields, expected {}",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Cell>> {
        &mut self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of a column that must be present.
    pub fn require_column(&self, name: &str) -> DataResult<usize> {
        self.column_index(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Inferred kind of a column.
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.column(name).map(|cells| ColumnKind::infer(cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        for input in [
            "2024-03-07",
            "2024/03/07",
            "03/07/2024",
            "2024-03-07 13:45:00",
            "2024-03-07T13:45:00",
            "2024-03-07T13:45:00+02:00",
        ] {
            assert_eq!(parse_date(input), Some(expected), "{}", input);
        }
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_infer_kinds() {
        let ints = [Cell::from("1"), Cell::Null, Cell::from("42")];
        assert_eq!(ColumnKind::infer(&ints), ColumnKind::Integer);

        let floats = [Cell::from("1.5"), Cell::from(2.0)];
        assert_eq!(ColumnKind::infer(&floats), ColumnKind::Float);

        let dates = [Cell::from("2024-01-01"), Cell::from("2024-02-01")];
        assert_eq!(ColumnKind::infer(&dates), ColumnKind::Date);

        let text = [Cell::from("1"), Cell::from("abc")];
        assert_eq!(ColumnKind::infer(&text), ColumnKind::Text);

        assert_eq!(ColumnKind::infer(&[Cell::Null]), ColumnKind::Empty);
    }

    #[test]
    fn test_cell_keys() {
        assert_eq!(Cell::from(1000.0).key().as_deref(), Some("1000"));
        assert_eq!(Cell::from("C-7").key().as_deref(), Some("C-7"));
        assert_eq!(Cell::Null.key(), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_cell_serde_is_untagged() {
        let row = vec![Cell::Null, Cell::from(12.5), Cell::from("x")];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,12.5,"x"]"#);

        let back: Vec<Cell> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut records = RecordSet::new(vec!["a".into(), "b".into()]);
        assert!(records.push_row(vec![Cell::from("1")]).is_err());
        records.push_row(vec![Cell::from("1"), Cell::Null]).unwrap();

        assert_eq!(records.num_rows(), 1);
        assert!(records.require_column("c").is_err());
        assert_eq!(records.kind_of("a"), Some(ColumnKind::Integer));
    }
}

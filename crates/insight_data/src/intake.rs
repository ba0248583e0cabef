//! CSV intake: read, normalize, profile and clean.
//!
//! Cleaning policy:
//! 1. Null markers become [`Cell::Null`]
//! 2. Rows with a null in a required column are dropped
//! 3. Columns whose non-null values all parse as numbers become numeric;
//!    anything else is left untouched
//! 4. Duplicate rows are dropped, first occurrence wins. Rows are compared
//!    after coercion, so `100` and `100.0` are the same value

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{DataError, DataResult};
use crate::profile::{CleaningStats, ProfileReport};
use crate::record::{parse_number, Cell, RecordSet};

/// Columns every order export must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["order_id", "customer_id", "order_date", "amount"];

/// Legacy header names mapped onto canonical ones.
pub const COLUMN_ALIASES: [(&str, &str); 2] = [("revenue", "amount"), ("date", "order_date")];

const NULL_MARKERS: [&str; 6] = ["", "na", "n/a", "nan", "null", "none"];

static HEADER_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid header pattern"));

/// Read, profile and clean a CSV file.
///
/// Unreadable files, ragged rows, a missing header and tables with no data
/// rows all fail with [`DataError::Format`].
pub fn ingest(path: &Path) -> DataResult<(RecordSet, ProfileReport)> {
    info!("Loading CSV from {:?}", path);
    let file = File::open(path)
        .map_err(|e| DataError::Format(format!("cannot read {}: {}", path.display(), e)))?;
    ingest_reader(file)
}

/// Same as [`ingest`], from any reader.
pub fn ingest_reader<R: Read>(reader: R) -> DataResult<(RecordSet, ProfileReport)> {
    let mut records = read_csv(reader)?;
    let mut profile = ProfileReport::of(&records);
    profile.cleaning = clean(&mut records);

    info!(
        "Dataset profiled: {} rows x {} columns, {} rows after cleaning",
        profile.num_rows, profile.num_cols, profile.cleaning.rows_after
    );
    Ok((records, profile))
}

/// Parse CSV into a raw record set with normalized headers.
pub fn read_csv<R: Read>(reader: R) -> DataResult<RecordSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| DataError::Format(e.to_string()))?
        .clone();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(DataError::Format("missing header row".to_string()));
    }

    let columns = normalize_headers(headers.iter())?;
    let mut records = RecordSet::new(columns);

    for result in reader.records() {
        let record = result.map_err(|e| DataError::Format(e.to_string()))?;
        let row = record.iter().map(to_cell).collect();
        records.push_row(row)?;
    }

    if records.is_empty() {
        return Err(DataError::Format("no data rows".to_string()));
    }

    debug!("Read {} raw rows", records.num_rows());
    Ok(records)
}

fn to_cell(field: &str) -> Cell {
    if NULL_MARKERS.contains(&field.to_ascii_lowercase().as_str()) {
        Cell::Null
    } else {
        Cell::Text(field.to_string())
    }
}

/// Lowercase headers, collapse separators to `_`, then apply aliases.
pub fn normalize_headers<'a>(headers: impl Iterator<Item = &'a str>) -> DataResult<Vec<String>> {
    let mut columns: Vec<String> = headers
        .map(|h| {
            HEADER_SEPARATORS
                .replace_all(&h.trim().to_lowercase(), "_")
                .trim_matches('_')
                .to_string()
        })
        .collect();

    for (alias, canonical) in COLUMN_ALIASES {
        if !columns.iter().any(|c| c == canonical) {
            if let Some(column) = columns.iter_mut().find(|c| c.as_str() == alias) {
                debug!("Renaming column '{}' to '{}'", alias, canonical);
                *column = canonical.to_string();
            }
        }
    }

    let mut seen = HashSet::new();
    for column in &columns {
        if column.is_empty() {
            return Err(DataError::Format("empty column name".to_string()));
        }
        if !seen.insert(column.as_str()) {
            return Err(DataError::Format(format!("duplicate column '{}'", column)));
        }
    }

    Ok(columns)
}

/// Apply the cleaning policy in place.
pub fn clean(records: &mut RecordSet) -> CleaningStats {
    let rows_before = records.num_rows();

    let required: Vec<usize> = REQUIRED_COLUMNS
        .iter()
        .filter_map(|c| records.column_index(c))
        .collect();
    records
        .rows_mut()
        .retain(|row| required.iter().all(|&i| !row[i].is_null()));
    let null_rows_dropped = rows_before - records.num_rows();

    let coerced_columns = coerce_numeric(records);

    let after_nulls = records.num_rows();
    let mut seen: HashSet<Vec<Option<String>>> = HashSet::new();
    records
        .rows_mut()
        .retain(|row| seen.insert(row.iter().map(Cell::key).collect()));
    let duplicate_rows_dropped = after_nulls - records.num_rows();

    debug!(
        "Cleaning dropped {} null rows and {} duplicates",
        null_rows_dropped, duplicate_rows_dropped
    );

    CleaningStats {
        rows_before,
        null_rows_dropped,
        duplicate_rows_dropped,
        rows_after: records.num_rows(),
        coerced_columns,
    }
}

/// Convert numeric-looking text columns to numbers. Best effort: a column
/// with any non-numeric value is left as text.
fn coerce_numeric(records: &mut RecordSet) -> Vec<String> {
    let mut coerced = Vec::new();

    for index in 0..records.num_cols() {
        let mut has_text = false;
        let convertible = records.rows().iter().all(|row| match &row[index] {
            Cell::Text(s) => {
                has_text = true;
                parse_number(s).is_some()
            }
            _ => true,
        });
        if !convertible || !has_text {
            continue;
        }

        for row in records.rows_mut() {
            if let Cell::Text(s) = &row[index] {
                if let Some(n) = parse_number(s) {
                    row[index] = Cell::Number(n);
                }
            }
        }
        coerced.push(records.columns()[index].clone());
    }

    coerced
}

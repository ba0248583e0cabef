//! Error types for data operations.

use thiserror::Error;

/// Result type alias for data operations.
pub type DataResult<T> = Result<T, DataError>;

/// Errors that can occur while reading or aggregating tabular data.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid value in column '{column}' at row {row}: {value:?}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    pub fn invalid_value(column: impl Into<String>, row: usize, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            row,
            value: value.into(),
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return Self::Format(err.to_string());
        }
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Self::Io(io),
            other => Self::Format(format!("{:?}", other)),
        }
    }
}

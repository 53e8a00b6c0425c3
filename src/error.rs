// src/error.rs
use thiserror::Error;

use crate::chart::ChartKind;

/// Failure to turn an uploaded file into a dataset.
///
/// Every variant carries owned text so the error can travel inside UI messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("could not read '{path}': {message}")]
    Io { path: String, message: String },
    #[error("No columns to parse from file")]
    Empty,
    #[error("Error tokenizing data. Expected {expected} fields in line {line}, saw {found}")]
    Malformed { line: u64, expected: u64, found: u64 },
    #[error("invalid UTF-8 in line {line}")]
    Encoding { line: u64 },
    #[error("CSV parse error: {0}")]
    Csv(String),
    #[error("file loader stopped unexpectedly: {0}")]
    Worker(String),
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::UnequalLengths { pos, expected_len, len } => LoadError::Malformed {
                line: pos.as_ref().map_or(0, |p| p.line()),
                expected: *expected_len,
                found: *len,
            },
            csv::ErrorKind::Utf8 { pos, .. } => LoadError::Encoding {
                line: pos.as_ref().map_or(0, |p| p.line()),
            },
            _ => LoadError::Csv(err.to_string()),
        }
    }
}

/// A chart selection that cannot be turned into a chart.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("{0} needs at least one numeric column; this dataset has none.")]
    NoNumericColumns(ChartKind),
    #[error("The dataset has no columns to plot.")]
    NoColumns,
    #[error("Column '{0}' does not exist in this dataset.")]
    UnknownColumn(String),
    #[error("Column '{0}' is not numeric.")]
    NotNumeric(String),
    #[error("Bin count {0} is outside the allowed range.")]
    BinsOutOfRange(u32),
}

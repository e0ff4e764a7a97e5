//! The [`PimmsError`] `enum` definition and error messages.
//!
use thiserror::Error;

use crate::comparison::Side;

/// The [`PimmsError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum PimmsError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Delimited file error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    // File parsing related errors
    #[error("Feature file line {line_number} {reason}.\nLine: {line}")]
    GffParse {
        line_number: usize,
        reason: String,
        line: String,
    },
    #[error("Feature file line {line_number} has an invalid start or end position.\nLine: {line}")]
    GffInvalidPosition { line_number: usize, line: String },

    // Table schema errors
    #[error("Key columns {missing:?} are not present in the {table} table")]
    SchemaError { table: String, missing: Vec<String> },
    #[error("Adding suffixes would create a duplicate column '{0}'")]
    SuffixCollision(String),
    #[error("Column '{0}' is duplicated")]
    DuplicateColumn(String),
    #[error("Column '{0}' is not in the table")]
    UnknownColumn(String),
    #[error("Column '{0}' does not contain numeric values")]
    InvalidColumnType(String),
    #[error("Column '{name}' has {found} values, but the table has {expected} rows")]
    ColumnLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    // Comparison table query errors
    #[error("Expected {expected} {side} column(s) containing '{substring}', found {matches:?}")]
    AmbiguousColumn {
        substring: String,
        side: Side,
        matches: Vec<String>,
        expected: usize,
    },
    #[error("Comparison metric '{0}' is not a registered comparison column")]
    InvalidComparisonMetric(String),
    #[error("Serialized record is a '{found}', expected a '{expected}'")]
    TransportKind { expected: String, found: String },

    // External statistics errors. These are recorded, never raised out of
    // ComparisonTable::run_external_statistics().
    #[error("Differential statistics failed: {0}")]
    StatisticsFailure(String),

    // Command line tool related errors
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}

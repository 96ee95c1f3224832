//! Errors raised by the analysis layer.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The requested column does not exist in the product table.
    #[error("column '{column}' not found; available columns: {}", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    /// The requested column exists but does not hold numbers.
    #[error("column '{column}' is not numeric")]
    NotNumeric { column: String },
}

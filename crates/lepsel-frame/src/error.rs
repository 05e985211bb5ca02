//! Error types for the event graph.

use thiserror::Error;

use crate::dtype::DType;

/// Event graph error type.
#[derive(Error, Debug)]
pub enum FrameError {
    /// A referenced column does not exist at this node.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// A column with this name already exists.
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    /// A column was requested as a type other than its own.
    #[error("column '{column}' has type {found}, requested as {expected}")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Requested type.
        expected: DType,
        /// Actual column type.
        found: DType,
    },

    /// An expression failed to parse or type-check.
    #[error("expression error: {0}")]
    Expression(String),

    /// A defined column or filter failed while evaluating one row.
    #[error("evaluating '{column}' failed at row {row}: {message}")]
    Evaluation {
        /// Column (or filter label) being evaluated.
        column: String,
        /// Source row index.
        row: usize,
        /// What went wrong.
        message: String,
    },

    /// A column does not have the table's row count.
    #[error("column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        /// Column name.
        column: String,
        /// Table row count.
        expected: usize,
        /// Column row count.
        found: usize,
    },

    /// Malformed input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// `true` when the error only says "not this type".
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, FrameError::TypeMismatch { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FrameError>;

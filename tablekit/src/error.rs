//! Error types for table operations.

use thiserror::Error;

use crate::cipher::CipherError;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Errors raised while inspecting, querying or writing a table.
///
/// Every failure is returned to the caller as a value. Nothing is retried and
/// nothing is recovered locally.
#[derive(Debug, Error)]
pub enum TableError {
    /// The table does not exist, or its metadata could not be read.
    #[error("table '{table}' not found")]
    SchemaNotFound {
        /// Table that was looked up.
        table: String,
    },

    /// A column named by the caller is not part of the table.
    #[error("column '{column}' does not exist in the table '{table}'")]
    ColumnNotFound {
        /// Offending column.
        column: String,
        /// Table the column was looked up in.
        table: String,
    },

    /// Number of supplied values does not match what the statement needs.
    #[error("size mismatch, expected {expected} values but got {actual}")]
    SizeMismatch {
        /// Required number of values.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// The driver refused to compile the SQL.
    #[error("failed to prepare query string: {sql}; error detail: {detail}")]
    PrepareFailed {
        /// SQL text that failed to compile.
        sql: String,
        /// Driver diagnostic.
        detail: String,
    },

    /// Binding or stepping the statement failed.
    #[error("failed to run query: {sql}, {params}; error detail: {detail}")]
    ExecutionFailed {
        /// SQL text that was executed.
        sql: String,
        /// JSON rendering of the bound parameter values.
        params: String,
        /// Driver diagnostic.
        detail: String,
    },

    /// A result handle without result columns was handed to the materializer.
    #[error("statement handle does not produce result rows")]
    InvalidResultHandle,

    /// Column encryption or decryption failed.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// Configuration could not be loaded or applied.
    #[error("config error: {0}")]
    Config(String),

    /// Any other operation failure.
    #[error("{0}")]
    Operation(String),
}

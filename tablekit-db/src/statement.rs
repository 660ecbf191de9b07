//! Safe wrapper around a `SQLite` prepared statement.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawStmt`] which encapsulates the raw pointers and C type conversions.

use super::error::{DbError, DbResult};
use super::ffi::{self, RawStmt};
use super::value::Value;

/// Result of a single `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A result row is available.
    Row,
    /// The statement has finished executing.
    Done,
}

/// A prepared `SQLite` statement.
///
/// Created via [`Connection::prepare`](super::Connection::prepare).
/// Tied to the lifetime of the connection that created it.
/// Finalized when dropped.
pub struct Statement<'conn> {
    raw: RawStmt<'conn>,
}

impl<'conn> Statement<'conn> {
    /// Wraps a raw statement handle.
    pub(super) const fn new(raw: RawStmt<'conn>) -> Self {
        Self { raw }
    }

    /// Number of `?` placeholders in the compiled SQL.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.raw.parameter_count()
    }

    /// Binds a slice of [`Value`]s to the statement parameters (1-indexed).
    ///
    /// The values are copied into the statement, so the slice may be dropped
    /// before [`step`](Self::step) is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of values differs from the number of
    /// placeholders, or if `SQLite` rejects a bind.
    pub fn bind_values(&mut self, values: &[Value]) -> DbResult<()> {
        let expected = self.raw.parameter_count();
        if values.len() != expected {
            return Err(DbError::new(
                ffi::SQLITE_RANGE,
                format!("expected {expected} parameters, got {}", values.len()),
            ));
        }
        for (i, val) in values.iter().enumerate() {
            let idx = i + 1;
            match val {
                Value::Integer(v) => self.raw.bind_i64(idx, *v)?,
                Value::Real(v) => self.raw.bind_f64(idx, *v)?,
                Value::Text(v) => self.raw.bind_text(idx, v)?,
                Value::Blob(v) => self.raw.bind_blob(idx, v)?,
                Value::Null => self.raw.bind_null(idx)?,
            }
        }
        Ok(())
    }

    /// Executes a single step.
    ///
    /// # Errors
    ///
    /// Returns the `SQLite` error if the step fails.
    pub fn step(&mut self) -> DbResult<StepResult> {
        let rc = self.raw.step()?;
        if rc == ffi::SQLITE_ROW {
            Ok(StepResult::Row)
        } else {
            Ok(StepResult::Done)
        }
    }

    /// Number of columns in the result set (0 for statements without rows).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.raw.column_count()
    }

    /// Name of result column `idx` as reported by the driver.
    #[must_use]
    pub fn column_name(&self, idx: usize) -> String {
        self.raw.column_name(idx)
    }

    /// Reads column `idx` of the current row using its storage class.
    #[must_use]
    pub fn column_value(&self, idx: usize) -> Value {
        match self.raw.column_type(idx) {
            ffi::SQLITE_INTEGER => Value::Integer(self.raw.column_i64(idx)),
            ffi::SQLITE_FLOAT => Value::Real(self.raw.column_f64(idx)),
            ffi::SQLITE_TEXT => Value::Text(self.raw.column_text(idx)),
            ffi::SQLITE_BLOB => Value::Blob(self.raw.column_blob(idx)),
            _ => Value::Null,
        }
    }

    /// Reads a column as `i64`.
    #[must_use]
    pub fn column_i64(&self, idx: usize) -> i64 {
        self.raw.column_i64(idx)
    }

    /// Reads a column as a UTF-8 string. Returns an empty string for NULL.
    #[must_use]
    pub fn column_text(&self, idx: usize) -> String {
        self.raw.column_text(idx)
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("parameters", &self.parameter_count())
            .field("columns", &self.column_count())
            .finish()
    }
}

//! Prepares, binds and executes one statement.

use tablekit_db::{Connection, Statement, StepResult};

use crate::binder::BoundParameters;
use crate::error::{TableError, TableResult};

/// Executed statement awaiting result consumption.
///
/// Owns the prepared statement. The statement is finalized when the handle
/// is dropped, on success and error paths alike.
#[derive(Debug)]
pub struct StatementHandle<'conn> {
    sql: String,
    params: String,
    stmt: Statement<'conn>,
    first: Option<StepResult>,
    rows_changed: usize,
}

impl<'conn> StatementHandle<'conn> {
    /// Returns `true` if the statement produces result columns.
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.stmt.column_count() > 0
    }

    /// Rows inserted, updated or deleted by the statement. Zero for queries.
    #[must_use]
    pub const fn rows_changed(&self) -> usize {
        self.rows_changed
    }

    /// Number of result columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.stmt.column_count()
    }

    /// Name of result column `idx`.
    #[must_use]
    pub fn column_name(&self, idx: usize) -> String {
        self.stmt.column_name(idx)
    }

    /// Advances to the next row. The first call reports the outcome of the
    /// initial execution step.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ExecutionFailed`] if stepping fails.
    pub fn advance(&mut self) -> TableResult<StepResult> {
        if let Some(first) = self.first.take() {
            return Ok(first);
        }
        self.stmt.step().map_err(|err| {
            log::debug!(
                "execution failed for '{}' with {}: {err}",
                self.sql,
                self.params
            );
            TableError::ExecutionFailed {
                sql: self.sql.clone(),
                params: self.params.clone(),
                detail: err.to_string(),
            }
        })
    }

    /// Statement positioned on the current row.
    #[must_use]
    pub const fn current(&self) -> &Statement<'conn> {
        &self.stmt
    }
}

/// Runs SQL against one connection.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Executor<'conn> {
    /// Creates an executor over `conn`.
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Prepares `sql`, attaches `params` and performs the first execution
    /// step.
    ///
    /// # Errors
    ///
    /// - [`TableError::PrepareFailed`] if the SQL does not compile.
    /// - [`TableError::SizeMismatch`] if the placeholder count differs from
    ///   the number of parameters.
    /// - [`TableError::ExecutionFailed`] if binding or execution fails.
    pub fn run(&self, sql: &str, params: &BoundParameters) -> TableResult<StatementHandle<'conn>> {
        let mut stmt = self.conn.prepare(sql).map_err(|err| {
            log::debug!("prepare failed for '{sql}': {err}");
            TableError::PrepareFailed {
                sql: sql.to_string(),
                detail: err.message,
            }
        })?;

        let expected = stmt.parameter_count();
        if expected != params.len() {
            return Err(TableError::SizeMismatch {
                expected,
                actual: params.len(),
            });
        }

        let execution_failed = |detail: String| {
            let params = params.to_json();
            log::debug!("execution failed for '{sql}' with {params}: {detail}");
            TableError::ExecutionFailed {
                sql: sql.to_string(),
                params,
                detail,
            }
        };

        stmt.bind_values(params.values())
            .map_err(|err| execution_failed(err.to_string()))?;
        let first = stmt
            .step()
            .map_err(|err| execution_failed(err.to_string()))?;
        let rows_changed = if stmt.column_count() == 0 {
            self.conn.changes()
        } else {
            0
        };

        Ok(StatementHandle {
            sql: sql.to_string(),
            params: params.to_json(),
            stmt,
            first: Some(first),
            rows_changed,
        })
    }
}

//! Reads an executed statement into owned records.

use tablekit_db::StepResult;

use crate::error::{TableError, TableResult};
use crate::executor::StatementHandle;
use crate::types::Record;

/// Drains `handle` into one [`Record`] per result row, in driver column
/// order, and releases it.
///
/// The whole result set is held in memory.
///
/// # Errors
///
/// Returns [`TableError::InvalidResultHandle`] if the handle has no result
/// columns, or the stepping error if reading a row fails.
pub fn materialize(mut handle: StatementHandle<'_>) -> TableResult<Vec<Record>> {
    if !handle.is_query() {
        return Err(TableError::InvalidResultHandle);
    }
    let columns = (0..handle.column_count())
        .map(|idx| handle.column_name(idx))
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    while handle.advance()? == StepResult::Row {
        let stmt = handle.current();
        let mut record = Record::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            record.insert(column.as_str(), stmt.column_value(idx));
        }
        rows.push(record);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use tablekit_db::{Connection, Value};

    use super::*;
    use crate::binder::{bind, BoundParameters};
    use crate::executor::Executor;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT, score REAL);
             INSERT INTO t VALUES (1, 'a', 1.5), (2, 'b', NULL);",
        )
        .expect("seed");
        conn
    }

    #[test]
    fn test_materialize_rows_in_column_order() {
        let conn = conn();
        let handle = Executor::new(&conn)
            .run("SELECT name, id, score FROM t ORDER BY id", &BoundParameters::default())
            .expect("run");
        let rows = materialize(handle).expect("materialize");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), ["name", "id", "score"]);
        assert_eq!(rows[0].get("score"), Some(&Value::Real(1.5)));
        assert_eq!(rows[1].get("name"), Some(&Value::from("b")));
        assert_eq!(rows[1].get("score"), Some(&Value::Null));
    }

    #[test]
    fn test_materialize_empty_result() {
        let conn = conn();
        let params = bind("i", vec![Value::from(99)]).expect("bind");
        let handle = Executor::new(&conn)
            .run("SELECT * FROM t WHERE id = ?", &params)
            .expect("run");
        assert!(materialize(handle).expect("materialize").is_empty());
    }

    #[test]
    fn test_materialize_rejects_non_query() {
        let conn = conn();
        let handle = Executor::new(&conn)
            .run("DELETE FROM t WHERE id = 2", &BoundParameters::default())
            .expect("run");
        assert!(matches!(
            materialize(handle),
            Err(TableError::InvalidResultHandle)
        ));
    }
}

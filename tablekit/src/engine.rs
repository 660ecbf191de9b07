//! Builder, binder, executor and materializer composed over one connection.

use tablekit_db::Connection;

use crate::binder::bind;
use crate::error::TableResult;
use crate::executor::Executor;
use crate::materializer::materialize;
use crate::query::PreparedQuery;
use crate::types::Record;

/// Runs [`PreparedQuery`] values against a connection.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'conn> {
    executor: Executor<'conn>,
}

impl<'conn> QueryEngine<'conn> {
    /// Creates an engine over `conn`.
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self {
            executor: Executor::new(conn),
        }
    }

    /// Executes a query and returns every row.
    ///
    /// # Errors
    ///
    /// Returns any binding, execution or materialization error.
    pub fn fetch(&self, query: PreparedQuery) -> TableResult<Vec<Record>> {
        let params = bind(&query.signature, query.values)?;
        let handle = self.executor.run(&query.sql, &params)?;
        materialize(handle)
    }

    /// Executes a statement and returns the number of rows it changed.
    ///
    /// # Errors
    ///
    /// Returns any binding or execution error.
    pub fn execute(&self, query: PreparedQuery) -> TableResult<usize> {
        let params = bind(&query.signature, query.values)?;
        let handle = self.executor.run(&query.sql, &params)?;
        Ok(handle.rows_changed())
    }
}

#[cfg(test)]
mod tests {
    use tablekit_db::Value;

    use super::*;
    use crate::record;
    use crate::schema::inspect;

    #[test]
    fn test_insert_then_fetch() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE Users (id INTEGER, name TEXT);")
            .expect("create");
        let schema = inspect(&conn, "Users").expect("inspect");
        let engine = QueryEngine::new(&conn);

        let insert = PreparedQuery::insert("Users", &schema, record! { "name" => "Bob" })
            .expect("insert query");
        assert_eq!(engine.execute(insert).expect("execute"), 1);

        let select = PreparedQuery::select("Users", &schema, record! { "name" => "Bob" })
            .expect("select query");
        let rows = engine.fetch(select).expect("fetch");
        assert_eq!(rows, vec![record! { "id" => 0, "name" => "Bob" }]);
    }

    #[test]
    fn test_update_binds_text_to_int_column() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE t (id INTEGER, n INTEGER); INSERT INTO t VALUES (1, 1);")
            .expect("seed");
        let schema = inspect(&conn, "t").expect("inspect");
        let engine = QueryEngine::new(&conn);
        let update = PreparedQuery::update(
            "t",
            &schema,
            record! { "n" => "5" },
            record! { "id" => "1" },
        )
        .expect("update query");
        assert_eq!(engine.execute(update).expect("execute"), 1);
        let n = conn
            .query_row("SELECT n FROM t", &[], |stmt| Ok(stmt.column_value(0)))
            .expect("read");
        assert_eq!(n, Value::Integer(5));
    }
}

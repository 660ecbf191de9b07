//! Single-table facade.

use tablekit_db::Connection;

use crate::cipher::Cipher;
use crate::codec::EncryptionCodec;
use crate::engine::QueryEngine;
use crate::error::{TableError, TableResult};
use crate::query::{reconcile_insert, PreparedQuery};
use crate::schema::{inspect, TableSchema};
use crate::types::{EncryptedColumns, Record, Row};

/// One table of the store, its discovered schema and its encrypted columns.
///
/// The schema is read once at construction. If that fails, the table keeps an
/// empty schema and every operation returns [`TableError::SchemaNotFound`].
///
/// Values of encrypted columns are stored as ciphertext. Predicates on those
/// columns are encrypted before the lookup, which only matches when the
/// cipher is deterministic.
///
/// # Examples
///
/// ```
/// use tablekit::{record, Table};
/// use tablekit_db::Connection;
///
/// let conn = Connection::open_in_memory()?;
/// conn.execute_batch("CREATE TABLE Users (id INTEGER, name TEXT);")?;
///
/// let users = Table::try_new(&conn, "Users")?;
/// users.insert(record! { "name" => "Bob" })?;
/// assert!(users.exists(record! { "name" => "Bob" })?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Table<'a> {
    name: String,
    schema: TableSchema,
    encrypted: EncryptedColumns,
    engine: QueryEngine<'a>,
    codec: Option<EncryptionCodec<'a>>,
}

impl<'a> Table<'a> {
    /// Binds `name` on `conn` without encrypted columns.
    ///
    /// A schema inspection failure is logged and leaves the table unusable.
    #[must_use]
    pub fn new(conn: &'a Connection, name: impl Into<String>) -> Self {
        Self::build(conn, name.into(), EncryptedColumns::none(), None)
    }

    /// Binds `name` on `conn`, failing if its schema cannot be read.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::SchemaNotFound`] if the table cannot be inspected.
    pub fn try_new(conn: &'a Connection, name: impl Into<String>) -> TableResult<Self> {
        let name = name.into();
        let schema = inspect(conn, &name)?;
        Ok(Self::from_parts(conn, name, schema, EncryptedColumns::none(), None))
    }

    /// Binds `name` on `conn` with `columns` encrypted through `cipher`.
    ///
    /// A schema inspection failure is logged and leaves the table unusable.
    #[must_use]
    pub fn with_encryption(
        conn: &'a Connection,
        name: impl Into<String>,
        cipher: &'a dyn Cipher,
        columns: EncryptedColumns,
    ) -> Self {
        Self::build(conn, name.into(), columns, Some(cipher))
    }

    /// Strict form of [`with_encryption`](Self::with_encryption).
    ///
    /// # Errors
    ///
    /// Returns [`TableError::SchemaNotFound`] if the table cannot be inspected.
    pub fn try_with_encryption(
        conn: &'a Connection,
        name: impl Into<String>,
        cipher: &'a dyn Cipher,
        columns: EncryptedColumns,
    ) -> TableResult<Self> {
        let name = name.into();
        let schema = inspect(conn, &name)?;
        Ok(Self::from_parts(conn, name, schema, columns, Some(cipher)))
    }

    fn build(
        conn: &'a Connection,
        name: String,
        encrypted: EncryptedColumns,
        cipher: Option<&'a dyn Cipher>,
    ) -> Self {
        let schema = inspect(conn, &name).unwrap_or_else(|err| {
            log::error!("failed to read the schema of table '{name}': {err}");
            TableSchema::default()
        });
        Self::from_parts(conn, name, schema, encrypted, cipher)
    }

    fn from_parts(
        conn: &'a Connection,
        name: String,
        schema: TableSchema,
        encrypted: EncryptedColumns,
        cipher: Option<&'a dyn Cipher>,
    ) -> Self {
        Self {
            name,
            schema,
            encrypted,
            engine: QueryEngine::new(conn),
            codec: cipher.map(EncryptionCodec::new),
        }
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discovered schema. Empty if inspection failed.
    #[must_use]
    pub const fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Encrypted column policy.
    #[must_use]
    pub const fn encrypted_columns(&self) -> &EncryptedColumns {
        &self.encrypted
    }

    /// Returns `true` if the table has `column`.
    #[must_use]
    pub fn column_exists(&self, column: &str) -> bool {
        self.schema.contains(column)
    }

    /// Inserts one row and returns the number of rows written.
    ///
    /// Columns missing from an associative row receive type defaults. Defaults
    /// of encrypted columns are encrypted like supplied values.
    ///
    /// # Errors
    ///
    /// - [`TableError::ColumnNotFound`] if the row names an unknown column.
    /// - [`TableError::SizeMismatch`] if a positional row has the wrong length.
    /// - [`TableError::Operation`] for a blob value in an encrypted column.
    /// - Any cipher, binding or execution error.
    pub fn insert(&self, row: impl Into<Row>) -> TableResult<usize> {
        let schema = self.checked_schema()?;
        let record = reconcile_insert(&self.name, schema, self.resolve(row.into())?)?;
        let record = self.encrypt(record)?;
        let query = PreparedQuery::insert(&self.name, schema, record)?;
        self.engine.execute(query)
    }

    /// Returns the rows matching every `column = value` term of `predicate`.
    /// An empty predicate returns every row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnNotFound`] for an unknown predicate column,
    /// or any cipher, execution or materialization error.
    pub fn select(&self, predicate: Record) -> TableResult<Vec<Record>> {
        let schema = self.checked_schema()?;
        let predicate = self.encrypt(predicate)?;
        let query = PreparedQuery::select(&self.name, schema, predicate)?;
        let rows = self.engine.fetch(query)?;
        self.decrypt(rows)
    }

    /// Returns every row, with `suffix` appended verbatim to the query.
    ///
    /// `suffix` is raw SQL (`ORDER BY ...`, `LIMIT ...`). It is not
    /// parameterized and must never carry untrusted input.
    ///
    /// # Errors
    ///
    /// Returns any cipher, execution or materialization error.
    pub fn select_all(&self, suffix: &str) -> TableResult<Vec<Record>> {
        self.checked_schema()?;
        let rows = self
            .engine
            .fetch(PreparedQuery::select_all(&self.name, suffix))?;
        self.decrypt(rows)
    }

    /// Sets `values` on the rows matching `predicate` and returns the number
    /// of rows changed.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Operation`] if `values` or `predicate` is empty,
    /// [`TableError::ColumnNotFound`] for an unknown column, or any cipher or
    /// execution error.
    pub fn update(&self, values: Record, predicate: Record) -> TableResult<usize> {
        self.try_update(values, predicate).inspect_err(|err| {
            log::error!("update of table '{}' failed: {err}", self.name);
        })
    }

    fn try_update(&self, values: Record, predicate: Record) -> TableResult<usize> {
        let schema = self.checked_schema()?;
        if values.is_empty() {
            return Err(TableError::Operation("update without values".to_string()));
        }
        if predicate.is_empty() {
            return Err(TableError::Operation(
                "update without a predicate".to_string(),
            ));
        }
        let values = self.encrypt(values)?;
        let predicate = self.encrypt(predicate)?;
        let query = PreparedQuery::update(&self.name, schema, values, predicate)?;
        self.engine.execute(query)
    }

    /// Returns `true` if at least one row matches `predicate`.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn exists(&self, predicate: Record) -> TableResult<bool> {
        Ok(!self.select(predicate)?.is_empty())
    }

    fn checked_schema(&self) -> TableResult<&TableSchema> {
        if self.schema.is_empty() {
            return Err(TableError::SchemaNotFound {
                table: self.name.clone(),
            });
        }
        Ok(&self.schema)
    }

    fn resolve(&self, row: Row) -> TableResult<Record> {
        match row {
            Row::Associative(record) => Ok(record),
            Row::Positional(values) => {
                log::warn!(
                    "positional insert into '{}' is deprecated, pass named columns instead",
                    self.name
                );
                if values.len() != self.schema.len() {
                    return Err(TableError::SizeMismatch {
                        expected: self.schema.len(),
                        actual: values.len(),
                    });
                }
                Ok(self.schema.column_names().zip(values).collect())
            }
        }
    }

    fn encrypt(&self, record: Record) -> TableResult<Record> {
        match &self.codec {
            Some(codec) => codec.encrypt_row(record, &self.encrypted),
            None => Ok(record),
        }
    }

    fn decrypt(&self, rows: Vec<Record>) -> TableResult<Vec<Record>> {
        match &self.codec {
            Some(codec) => codec.decrypt_rows(rows, &self.encrypted),
            None => Ok(rows),
        }
    }
}

impl std::fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("encrypted", &self.encrypted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tablekit_db::Value;

    use super::*;
    use crate::record;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE Users (id INTEGER, name TEXT, email TEXT);")
            .expect("create");
        conn
    }

    #[test]
    fn test_missing_table_fails_every_operation() {
        let conn = conn();
        let table = Table::new(&conn, "Nope");
        assert!(table.schema().is_empty());
        assert!(matches!(
            table.insert(record! { "a" => 1 }),
            Err(TableError::SchemaNotFound { .. })
        ));
        assert!(matches!(
            table.select(Record::new()),
            Err(TableError::SchemaNotFound { .. })
        ));
        assert!(matches!(
            table.select_all(""),
            Err(TableError::SchemaNotFound { .. })
        ));
        assert!(matches!(
            table.update(record! { "a" => 1 }, record! { "a" => 2 }),
            Err(TableError::SchemaNotFound { .. })
        ));
        assert!(matches!(
            table.exists(record! { "a" => 1 }),
            Err(TableError::SchemaNotFound { .. })
        ));
        assert!(Table::try_new(&conn, "Nope").is_err());
    }

    #[test]
    fn test_positional_insert() {
        let conn = conn();
        let table = Table::new(&conn, "Users");
        let written = table
            .insert(vec![Value::from(1), Value::from("Bob"), Value::from("b@x")])
            .expect("insert");
        assert_eq!(written, 1);
        assert_eq!(
            table.select_all("").expect("select"),
            vec![record! { "id" => 1, "name" => "Bob", "email" => "b@x" }]
        );
    }

    #[test]
    fn test_positional_insert_size_mismatch() {
        let conn = conn();
        let table = Table::new(&conn, "Users");
        let err = table
            .insert(vec![Value::from(1)])
            .expect_err("wrong length");
        assert!(matches!(
            err,
            TableError::SizeMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_update_requires_values_and_predicate() {
        let conn = conn();
        let table = Table::new(&conn, "Users");
        assert!(matches!(
            table.update(Record::new(), record! { "id" => 1 }),
            Err(TableError::Operation(_))
        ));
        assert!(matches!(
            table.update(record! { "name" => "x" }, Record::new()),
            Err(TableError::Operation(_))
        ));
    }

    #[test]
    fn test_accessors() {
        let conn = conn();
        let table = Table::new(&conn, "Users");
        assert_eq!(table.name(), "Users");
        assert!(table.column_exists("email"));
        assert!(!table.column_exists("age"));
        assert!(table.encrypted_columns().is_empty());
        assert_eq!(table.schema().signature(), "iss");
    }
}

//! SQL text generation for flat equality predicates and assignments.
//!
//! Values never appear in the generated SQL. Every value becomes a `?`
//! placeholder and travels alongside the text in a [`PreparedQuery`], with
//! its type signature looked up from the table schema.

use tablekit_db::Value;

use crate::error::{TableError, TableResult};
use crate::schema::TableSchema;
use crate::types::Record;

/// Quotes an identifier with backticks, doubling any embedded backtick.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn equality_terms<'a>(columns: impl Iterator<Item = &'a str>, separator: &str) -> String {
    columns
        .map(|column| format!("{}=?", quote_ident(column)))
        .collect::<Vec<_>>()
        .join(separator)
}

/// `SELECT * FROM `table` WHERE `c1`=? AND ...` in predicate order.
///
/// An empty predicate selects every row.
#[must_use]
pub fn build_select(table: &str, predicate: &Record) -> String {
    let mut sql = format!("SELECT * FROM {}", quote_ident(table));
    if !predicate.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&equality_terms(predicate.columns(), " AND "));
    }
    sql
}

/// `SELECT * FROM `table` ` followed by `suffix` verbatim.
///
/// The suffix is raw SQL and is not parameterized.
#[must_use]
pub fn build_select_all(table: &str, suffix: &str) -> String {
    format!("SELECT * FROM {} {suffix}", quote_ident(table))
}

/// `UPDATE `table` SET `a`=?, ... WHERE `c`=? AND ...`.
///
/// The SET list follows `values` order and the WHERE list follows
/// `predicate` order.
#[must_use]
pub fn build_update(table: &str, values: &Record, predicate: &Record) -> String {
    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        equality_terms(values.columns(), ", "),
        equality_terms(predicate.columns(), " AND ")
    )
}

/// `INSERT INTO `table`(`c1`,...) VALUES (?,...)` over every schema column,
/// in schema order.
#[must_use]
pub fn build_insert(table: &str, schema: &TableSchema) -> String {
    let columns = schema
        .column_names()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(",");
    let placeholders = vec!["?"; schema.len()].join(",");
    format!(
        "INSERT INTO {}({columns}) VALUES ({placeholders})",
        quote_ident(table)
    )
}

/// Validates `record` against `schema` and returns it with one entry per
/// schema column, in schema order.
///
/// Columns the record leaves out receive their type default. A record that
/// is already complete comes back reordered and otherwise unchanged.
///
/// # Errors
///
/// Returns [`TableError::ColumnNotFound`] for the first record column that is
/// not part of the schema. Nothing is reconciled in that case.
pub fn reconcile_insert(
    table: &str,
    schema: &TableSchema,
    mut record: Record,
) -> TableResult<Record> {
    if let Some(column) = record.columns().find(|column| !schema.contains(column)) {
        return Err(TableError::ColumnNotFound {
            column: column.to_string(),
            table: table.to_string(),
        });
    }
    let mut reconciled = Record::with_capacity(schema.len());
    for (column, ty) in schema.iter() {
        let value = record.remove(column).unwrap_or_else(|| {
            log::warn!(
                "column '{column}' missing from insert into '{table}', using {ty} default"
            );
            ty.default_value()
        });
        reconciled.insert(column, value);
    }
    Ok(reconciled)
}

/// SQL text, type signature and ordered parameter values.
///
/// `signature.len() == values.len()` and equals the number of placeholders
/// in `sql`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    /// SQL text with positional placeholders.
    pub sql: String,
    /// One type code per placeholder.
    pub signature: String,
    /// Parameter values in placeholder order.
    pub values: Vec<Value>,
}

impl PreparedQuery {
    /// Parameterized select over `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnNotFound`] if the predicate names a column
    /// the table does not have.
    pub fn select(table: &str, schema: &TableSchema, predicate: Record) -> TableResult<Self> {
        let signature = signature_of(table, schema, &predicate)?;
        Ok(Self {
            sql: build_select(table, &predicate),
            signature,
            values: predicate.into_values(),
        })
    }

    /// Unconditioned select with a raw suffix and no parameters.
    #[must_use]
    pub fn select_all(table: &str, suffix: &str) -> Self {
        Self {
            sql: build_select_all(table, suffix),
            signature: String::new(),
            values: Vec::new(),
        }
    }

    /// Update of `values` on the rows matching `predicate`. Parameters are the
    /// SET values followed by the predicate values.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnNotFound`] if either map names an unknown
    /// column.
    pub fn update(
        table: &str,
        schema: &TableSchema,
        values: Record,
        predicate: Record,
    ) -> TableResult<Self> {
        let mut signature = signature_of(table, schema, &values)?;
        signature.push_str(&signature_of(table, schema, &predicate)?);
        let sql = build_update(table, &values, &predicate);
        let mut params = values.into_values();
        params.extend(predicate.into_values());
        Ok(Self {
            sql,
            signature,
            values: params,
        })
    }

    /// Insert of one row over every schema column. `record` is reconciled
    /// first.
    ///
    /// # Errors
    ///
    /// See [`reconcile_insert`].
    pub fn insert(table: &str, schema: &TableSchema, record: Record) -> TableResult<Self> {
        let values = reconcile_insert(table, schema, record)?.into_values();
        Ok(Self {
            sql: build_insert(table, schema),
            signature: schema.signature(),
            values,
        })
    }
}

fn signature_of(table: &str, schema: &TableSchema, record: &Record) -> TableResult<String> {
    record
        .columns()
        .map(|column| {
            schema
                .broad_type(column)
                .map(|ty| ty.code())
                .ok_or_else(|| TableError::ColumnNotFound {
                    column: column.to_string(),
                    table: table.to_string(),
                })
        })
        .collect()
}

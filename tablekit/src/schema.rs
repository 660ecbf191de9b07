//! Runtime discovery of a table's columns and their broad value types.

use std::fmt;

use tablekit_db::{params, Connection, Value};

use crate::error::{TableError, TableResult};

/// Column metadata query. The table name is bound, never interpolated.
const TABLE_INFO_SQL: &str = "SELECT name, type FROM pragma_table_info(?)";

/// Coarse value category of a column, inferred from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadType {
    /// Integer columns (`int`, `bigint(20)`, `INTEGER`, ...).
    Int,
    /// Floating point and decimal columns.
    Double,
    /// Binary columns.
    Blob,
    /// Everything else.
    String,
}

impl BroadType {
    /// Infers the broad type from the native type name reported by the store.
    ///
    /// Anything containing `int` is an integer; `double`, `float`, `decimal`
    /// and `real` (with or without a precision suffix) are doubles; anything
    /// containing `blob` is a blob; the rest is treated as a string.
    #[must_use]
    pub fn infer(native_type: &str) -> Self {
        let native = native_type.trim().to_ascii_lowercase();
        let base = native.split(['(', ' ']).next().unwrap_or_default();
        if native.contains("int") {
            Self::Int
        } else if matches!(base, "double" | "float" | "decimal" | "real") {
            Self::Double
        } else if native.contains("blob") {
            Self::Blob
        } else {
            Self::String
        }
    }

    /// One-character code used in parameter type signatures.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Int => 'i',
            Self::Double => 'd',
            Self::Blob => 'b',
            Self::String => 's',
        }
    }

    /// Parses a signature code.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'i' => Some(Self::Int),
            'd' => Some(Self::Double),
            'b' => Some(Self::Blob),
            's' => Some(Self::String),
            _ => None,
        }
    }

    /// Value substituted for a column missing from an insert payload.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Int => Value::Integer(0),
            Self::Double => Value::Real(0.0),
            Self::Blob | Self::String => Value::Text(String::new()),
        }
    }
}

impl fmt::Display for BroadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Blob => "blob",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// Ordered column name to [`BroadType`] mapping of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<(String, BroadType)>,
}

impl TableSchema {
    /// Creates a schema from columns in table order.
    #[must_use]
    pub const fn new(columns: Vec<(String, BroadType)>) -> Self {
        Self { columns }
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` for the empty schema of a table that failed inspection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns `true` if the table has `column`.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.broad_type(column).is_some()
    }

    /// Broad type of `column`, if the table has it.
    #[must_use]
    pub fn broad_type(&self, column: &str) -> Option<BroadType> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
    }

    /// Iterates `(column, type)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, BroadType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Iterates column names in table order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Type signature of all columns in table order, e.g. `"iss"`.
    #[must_use]
    pub fn signature(&self) -> String {
        self.columns.iter().map(|(_, ty)| ty.code()).collect()
    }
}

impl<S: Into<String>> FromIterator<(S, BroadType)> for TableSchema {
    fn from_iter<I: IntoIterator<Item = (S, BroadType)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(name, ty)| (name.into(), ty)).collect())
    }
}

/// Reads the columns of `table` from the store.
///
/// # Errors
///
/// Returns [`TableError::SchemaNotFound`] if the table does not exist or its
/// metadata cannot be read.
pub fn inspect(conn: &Connection, table: &str) -> TableResult<TableSchema> {
    let columns = conn
        .query_map(TABLE_INFO_SQL, params![table], |stmt| {
            Ok((stmt.column_text(0), BroadType::infer(&stmt.column_text(1))))
        })
        .map_err(|err| {
            log::debug!("reading column metadata of '{table}' failed: {err}");
            TableError::SchemaNotFound {
                table: table.to_string(),
            }
        })?;
    if columns.is_empty() {
        return Err(TableError::SchemaNotFound {
            table: table.to_string(),
        });
    }
    Ok(TableSchema::new(columns))
}

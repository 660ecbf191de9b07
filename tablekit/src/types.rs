//! Row-level data types shared by the query pipeline and the table facade.

use std::collections::BTreeSet;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tablekit_db::Value;

/// Ordered mapping of column name to value.
///
/// Iteration follows insertion order. Re-inserting an existing column
/// replaces its value in place and keeps its position. Used for insert
/// payloads, predicates, SET lists and materialized result rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates an empty record with room for `capacity` columns.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Sets `column` to `value`, returning the previous value if the column
    /// was already present.
    pub fn insert(
        &mut self,
        column: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        let column = column.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == column) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((column, value));
        None
    }

    /// Returns the value stored for `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Removes `column`, returning its value.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(name, _)| name == column)?;
        Some(self.entries.remove(idx).1)
    }

    /// Returns `true` if `column` is present.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Iterates column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Iterates values in order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Consumes the record, returning its values in order.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }

    /// Applies `f` to every value, keeping column order.
    pub(crate) fn try_map_values<E>(
        self,
        mut f: impl FnMut(&str, Value) -> Result<Value, E>,
    ) -> Result<Self, E> {
        let entries = self
            .entries
            .into_iter()
            .map(|(name, value)| {
                let value = f(&name, value)?;
                Ok((name, value))
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self { entries })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Serializes as a map in column order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in &self.entries {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Builds a [`Record`] from `column => value` pairs.
///
/// Usage: `record! { "name" => "Bob", "age" => 5 }`
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.insert($column, $value); )+
        record
    }};
}

/// Insert payload as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Values keyed by column name. Missing columns receive type defaults.
    Associative(Record),
    /// Values in table column order, one per column.
    ///
    /// Kept for compatibility with callers that predate named columns; prefer
    /// [`Row::Associative`].
    Positional(Vec<Value>),
}

impl From<Record> for Row {
    fn from(record: Record) -> Self {
        Self::Associative(record)
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

/// Which columns of a table are stored encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptedColumns {
    /// Only the named columns.
    Columns(BTreeSet<String>),
    /// Every column of the table.
    All,
}

impl EncryptedColumns {
    /// No encrypted columns.
    #[must_use]
    pub const fn none() -> Self {
        Self::Columns(BTreeSet::new())
    }

    /// Every column is encrypted.
    #[must_use]
    pub const fn all() -> Self {
        Self::All
    }

    /// The given columns are encrypted.
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Columns(columns.into_iter().map(Into::into).collect())
    }

    /// Returns `true` if values of `column` are stored encrypted.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        match self {
            Self::Columns(columns) => columns.contains(column),
            Self::All => true,
        }
    }

    /// Returns `true` if no column is encrypted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Columns(columns) => columns.is_empty(),
            Self::All => false,
        }
    }
}

impl Default for EncryptedColumns {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_insertion_order() {
        let record = record! { "city" => "RIT", "age" => 5, "name" => "Bob" };
        assert_eq!(record.columns().collect::<Vec<_>>(), ["city", "age", "name"]);
    }

    #[test]
    fn test_record_reinsert_replaces_in_place() {
        let mut record = record! { "a" => 1, "b" => 2 };
        let previous = record.insert("a", 10);
        assert_eq!(previous, Some(Value::Integer(1)));
        assert_eq!(
            record.into_values(),
            vec![Value::Integer(10), Value::Integer(2)]
        );
    }

    #[test]
    fn test_record_serializes_in_column_order() {
        let record = record! { "z" => 1, "a" => "x", "m" => Value::Null };
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(json, r#"{"z":1,"a":"x","m":null}"#);
    }

    #[test]
    fn test_encrypted_columns() {
        let policy = EncryptedColumns::columns(["email"]);
        assert!(policy.contains("email"));
        assert!(!policy.contains("name"));
        assert!(EncryptedColumns::all().contains("anything"));
        assert!(EncryptedColumns::default().is_empty());
        assert!(!EncryptedColumns::all().is_empty());
    }
}

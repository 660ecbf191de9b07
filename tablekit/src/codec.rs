//! Applies a column encryption policy to rows.

use tablekit_db::Value;

use crate::cipher::Cipher;
use crate::error::{TableError, TableResult};
use crate::types::{EncryptedColumns, Record};

/// Encrypts and decrypts the policy columns of a row through a [`Cipher`].
///
/// Text is encrypted as is, integers and reals through their text form, so
/// they read back as text. `NULL` is kept as is. Blobs are rejected since the
/// cipher is string to string. The codec knows nothing about column types.
#[derive(Clone, Copy)]
pub struct EncryptionCodec<'c> {
    cipher: &'c dyn Cipher,
}

impl<'c> EncryptionCodec<'c> {
    /// Creates a codec over `cipher`.
    #[must_use]
    pub const fn new(cipher: &'c dyn Cipher) -> Self {
        Self { cipher }
    }

    /// Encrypts the policy columns of `record`.
    ///
    /// # Errors
    ///
    /// - [`TableError::Cipher`] if the cipher fails.
    /// - [`TableError::Operation`] for a blob value in a policy column.
    pub fn encrypt_row(&self, record: Record, policy: &EncryptedColumns) -> TableResult<Record> {
        if policy.is_empty() {
            return Ok(record);
        }
        record.try_map_values(|column, value| -> TableResult<Value> {
            if !policy.contains(column) {
                return Ok(value);
            }
            let plain = match value {
                Value::Null => return Ok(Value::Null),
                Value::Text(text) => text,
                Value::Integer(n) => n.to_string(),
                Value::Real(x) => x.to_string(),
                Value::Blob(_) => {
                    return Err(TableError::Operation(format!(
                        "column '{column}' is encrypted and cannot hold a blob"
                    )));
                }
            };
            Ok(Value::Text(self.cipher.encrypt(&plain)?))
        })
    }

    /// Decrypts the policy columns of `record`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Cipher`] if a stored value does not decrypt.
    pub fn decrypt_row(&self, record: Record, policy: &EncryptedColumns) -> TableResult<Record> {
        if policy.is_empty() {
            return Ok(record);
        }
        record.try_map_values(|column, value| -> TableResult<Value> {
            match value {
                Value::Text(sealed) if policy.contains(column) => {
                    Ok(Value::Text(self.cipher.decrypt(&sealed)?))
                }
                other => Ok(other),
            }
        })
    }

    /// Decrypts every row of `rows`.
    ///
    /// # Errors
    ///
    /// See [`decrypt_row`](Self::decrypt_row).
    pub fn decrypt_rows(
        &self,
        rows: Vec<Record>,
        policy: &EncryptedColumns,
    ) -> TableResult<Vec<Record>> {
        rows.into_iter()
            .map(|row| self.decrypt_row(row, policy))
            .collect()
    }
}

impl std::fmt::Debug for EncryptionCodec<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionCodec").finish_non_exhaustive()
    }
}

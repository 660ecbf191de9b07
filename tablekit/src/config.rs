//! Store configuration loaded from JSON.
//!
//! ```json
//! {
//!   "database_path": "app.sqlite",
//!   "read_only": false,
//!   "encryption_key_path": "column.key"
//! }
//! ```
//!
//! The key file holds a 32-byte key as 64 hex characters.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tablekit_db::{Connection, IN_MEMORY};
use zeroize::Zeroizing;

use crate::cipher::DeterministicCipher;
use crate::error::{TableError, TableResult};

/// Where the store lives and how its encrypted columns are keyed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file, or `:memory:`.
    pub database_path: PathBuf,
    /// Opens the database read-only.
    #[serde(default)]
    pub read_only: bool,
    /// File holding the hex-encoded column encryption key.
    #[serde(default)]
    pub encryption_key_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY),
            read_only: false,
            encryption_key_path: None,
        }
    }
}

impl StoreConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Config`] if the document is invalid.
    pub fn from_json(json: &str) -> TableResult<Self> {
        serde_json::from_str(json).map_err(|err| TableError::Config(err.to_string()))
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> TableResult<Self> {
        let json = fs::read_to_string(path).map_err(|err| {
            TableError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Opens the configured database.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Config`] if the database cannot be opened.
    pub fn open_connection(&self) -> TableResult<Connection> {
        let result = if self.database_path.as_os_str() == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(&self.database_path, self.read_only)
        };
        result.map_err(|err| {
            TableError::Config(format!(
                "failed to open {}: {err}",
                self.database_path.display()
            ))
        })
    }

    /// Loads the column cipher, if a key file is configured.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Config`] if the key file cannot be read, or
    /// [`TableError::Cipher`] if it does not hold a valid key.
    pub fn load_cipher(&self) -> TableResult<Option<DeterministicCipher>> {
        let Some(path) = &self.encryption_key_path else {
            return Ok(None);
        };
        let key_hex = Zeroizing::new(fs::read_to_string(path).map_err(|err| {
            TableError::Config(format!("failed to read key file {}: {err}", path.display()))
        })?);
        Ok(Some(DeterministicCipher::from_hex(&key_hex)?))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::cipher::{Cipher, CipherError};

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_json(r#"{"database_path": ":memory:"}"#).expect("parse");
        assert_eq!(config, StoreConfig::default());
        assert!(config.load_cipher().expect("no key").is_none());
        assert!(config.open_connection().is_ok());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = StoreConfig::from_json(r#"{"database_path": "a", "pool_size": 4}"#)
            .expect_err("unknown field");
        assert!(matches!(err, TableError::Config(_)));
    }

    #[test]
    fn test_from_file_and_key_loading() {
        let mut key = NamedTempFile::new().expect("key file");
        writeln!(key, "{}", "11".repeat(32)).expect("write key");

        let dir = tempfile::tempdir().expect("dir");
        let config_path = dir.path().join("store.json");
        let json = serde_json::json!({
            "database_path": dir.path().join("store.sqlite"),
            "encryption_key_path": key.path(),
        });
        fs::write(&config_path, json.to_string()).expect("write config");

        let config = StoreConfig::from_file(&config_path).expect("load");
        assert!(!config.read_only);
        let cipher = config.load_cipher().expect("load key").expect("configured");
        let sealed = cipher.encrypt("hello").expect("encrypt");
        assert_eq!(cipher.decrypt(&sealed).expect("decrypt"), "hello");
        assert!(config.open_connection().is_ok());
    }

    #[test]
    fn test_bad_key_file() {
        let mut key = NamedTempFile::new().expect("key file");
        write!(key, "abcd").expect("write key");
        let config = StoreConfig {
            encryption_key_path: Some(key.path().to_path_buf()),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.load_cipher(),
            Err(TableError::Cipher(CipherError::InvalidKey(_)))
        ));
    }

    #[test]
    fn test_missing_files() {
        let missing = Path::new("/nonexistent/tablekit/store.json");
        assert!(matches!(
            StoreConfig::from_file(missing),
            Err(TableError::Config(_))
        ));
        let config = StoreConfig {
            encryption_key_path: Some(missing.to_path_buf()),
            ..StoreConfig::default()
        };
        assert!(matches!(config.load_cipher(), Err(TableError::Config(_))));
    }
}

//! Schema-aware, parameterized access to single tables of a `SQLite` store,
//! with transparent per-column encryption.
//!
//! A [`Table`] reads its column types once when it is created. Inserts,
//! selects and updates are turned into SQL with `?` placeholders; values
//! travel separately, typed by the schema. Columns listed in the table's
//! [`EncryptedColumns`] are encrypted on the way in and decrypted on the way
//! out, including the values of lookup predicates.
//!
//! ```
//! use tablekit::{record, DeterministicCipher, EncryptedColumns, Table, Value};
//! use tablekit_db::Connection;
//!
//! let conn = Connection::open_in_memory()?;
//! conn.execute_batch("CREATE TABLE Users (id INTEGER, name TEXT, email TEXT);")?;
//!
//! let cipher = DeterministicCipher::new(&[7u8; 32])?;
//! let users = Table::with_encryption(
//!     &conn,
//!     "Users",
//!     &cipher,
//!     EncryptedColumns::columns(["email"]),
//! );
//! users.insert(record! { "name" => "Bob", "email" => "b@x.com" })?;
//!
//! let rows = users.select(record! { "email" => "b@x.com" })?;
//! assert_eq!(rows[0].get("name"), Some(&Value::from("Bob")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod binder;
pub mod cipher;
pub mod codec;
pub mod config;
pub mod engine;
pub mod executor;
pub mod logger;
pub mod materializer;
pub mod query;
pub mod schema;

mod error;
pub use error::*;

mod table;
pub use table::Table;

mod types;
pub use types::{EncryptedColumns, Record, Row};

pub use cipher::{Cipher, CipherError, DeterministicCipher};
pub use config::StoreConfig;
pub use schema::{BroadType, TableSchema};
pub use tablekit_db::{Connection, Value};

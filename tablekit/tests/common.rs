//! Common test utilities shared across integration tests.

#![allow(dead_code, missing_docs)]

use std::sync::{Arc, Mutex};

use tablekit::cipher::KEY_LEN;
use tablekit::logger::{LogLevel, Logger};
use tablekit::{Connection, DeterministicCipher};

pub const USERS_DDL: &str = "CREATE TABLE Users (
    id bigint(20),
    name varchar(255),
    email varchar(255)
);";

/// In-memory store with an empty `Users` table.
pub fn users_db() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(USERS_DDL).expect("create Users");
    conn
}

pub fn cipher() -> DeterministicCipher {
    DeterministicCipher::new(&[0x42; KEY_LEN]).expect("cipher")
}

/// Number of rows in `table`, read directly from the store.
pub fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM `{table}`"), &[], |stmt| {
        Ok(stmt.column_i64(0))
    })
    .expect("count rows")
}

/// Logger that keeps every message in memory.
#[derive(Default)]
pub struct CapturingLogger {
    messages: Mutex<Vec<(LogLevel, String)>>,
}

impl CapturingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages
            .lock()
            .expect("lock")
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }
}

impl Logger for CapturingLogger {
    fn log(&self, level: LogLevel, message: String) {
        self.messages.lock().expect("lock").push((level, message));
    }
}

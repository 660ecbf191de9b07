//! Unit tests for the safe `SQLite` db wrapper.

use super::*;

fn users_db() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER, name TEXT, score REAL, avatar BLOB);",
    )
    .expect("create table");
    conn
}

#[test]
fn test_open_in_memory() {
    let conn = users_db();
    conn.execute(
        "INSERT INTO users (id, name) VALUES (?, ?)",
        params![1_i64, "hello"],
    )
    .expect("insert");
    let result = conn
        .query_row("SELECT name FROM users WHERE id = ?", params![1_i64], |stmt| {
            Ok(stmt.column_text(0))
        })
        .expect("query");
    assert_eq!(result, "hello");
}

#[test]
fn test_query_row_without_rows_fails() {
    let conn = users_db();
    let err = conn
        .query_row("SELECT id FROM users", &[], |stmt| Ok(stmt.column_i64(0)))
        .expect_err("no rows");
    assert_eq!(err.message, "query returned no rows");
}

#[test]
fn test_column_values_by_storage_class() {
    let conn = users_db();
    conn.execute(
        "INSERT INTO users (id, name, score, avatar) VALUES (?, ?, ?, ?)",
        params![7_i64, "Bob", 2.5_f64, vec![0xDE_u8, 0xAD], ],
    )
    .expect("insert");
    let row = conn
        .query_row("SELECT id, name, score, avatar FROM users", &[], |stmt| {
            Ok((0..stmt.column_count())
                .map(|i| (stmt.column_name(i), stmt.column_value(i)))
                .collect::<Vec<_>>())
        })
        .expect("query");
    assert_eq!(
        row,
        vec![
            ("id".to_string(), Value::Integer(7)),
            ("name".to_string(), Value::Text("Bob".to_string())),
            ("score".to_string(), Value::Real(2.5)),
            ("avatar".to_string(), Value::Blob(vec![0xDE, 0xAD])),
        ]
    );
}

#[test]
fn test_null_handling() {
    let conn = users_db();
    conn.execute(
        "INSERT INTO users (id, name) VALUES (?, ?)",
        params![1_i64, Value::Null],
    )
    .expect("insert");
    let (value, text) = conn
        .query_row("SELECT name FROM users WHERE id = 1", &[], |stmt| {
            Ok((stmt.column_value(0), stmt.column_text(0)))
        })
        .expect("query");
    assert_eq!(value, Value::Null);
    assert_eq!(text, "");
}

#[test]
fn test_query_map_collects_all_rows() {
    let conn = users_db();
    for id in 1..=3_i64 {
        conn.execute("INSERT INTO users (id) VALUES (?)", params![id])
            .expect("insert");
    }
    let ids = conn
        .query_map("SELECT id FROM users ORDER BY id DESC", &[], |stmt| {
            Ok(stmt.column_i64(0))
        })
        .expect("query");
    assert_eq!(ids, vec![3, 2, 1]);
}

#[test]
fn test_execute_reports_changes() {
    let conn = users_db();
    conn.execute("INSERT INTO users (id) VALUES (1)", &[]).expect("insert");
    conn.execute("INSERT INTO users (id) VALUES (2)", &[]).expect("insert");
    let changed = conn
        .execute("UPDATE users SET name = ?", params!["x"])
        .expect("update");
    assert_eq!(changed, 2);
    assert_eq!(conn.changes(), 2);
}

#[test]
fn test_parameter_count_mismatch_is_rejected() {
    let conn = users_db();
    let mut stmt = conn
        .prepare("INSERT INTO users (id, name) VALUES (?, ?)")
        .expect("prepare");
    assert_eq!(stmt.parameter_count(), 2);
    let err = stmt.bind_values(params![1_i64]).expect_err("too few params");
    assert!(err.message.contains("expected 2 parameters, got 1"));
}

#[test]
fn test_multiple_statements_are_rejected() {
    let conn = users_db();
    let err = conn
        .prepare("SELECT * FROM users; DROP TABLE users")
        .expect_err("second statement");
    assert!(err.message.contains("multiple statements"));
    // Trailing semicolons and whitespace are fine.
    conn.prepare("SELECT * FROM users;  ").expect("single statement");
}

#[test]
fn test_prepare_error_carries_driver_message() {
    let conn = users_db();
    let err = conn.prepare("SELECT * FROM missing").expect_err("no such table");
    assert!(err.message.contains("no such table"));
    assert!(err.to_string().starts_with("sqlite error 1:"));
}

#[test]
fn test_reopen_file_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.sqlite");
    {
        let conn = Connection::open(&path, false).expect("open");
        conn.execute_batch("CREATE TABLE t (val TEXT);").expect("create");
        conn.execute("INSERT INTO t (val) VALUES (?)", params!["kept"])
            .expect("insert");
        conn.close().expect("close");
    }
    let conn = Connection::open(&path, true).expect("reopen read-only");
    let val = conn
        .query_row("SELECT val FROM t", &[], |stmt| Ok(stmt.column_text(0)))
        .expect("query");
    assert_eq!(val, "kept");
    assert!(conn.execute("INSERT INTO t (val) VALUES ('x')", &[]).is_err());
}

#[test]
fn test_value_serializes_to_json() {
    let values = vec![
        Value::Integer(1),
        Value::Real(0.5),
        Value::from("a"),
        Value::Blob(vec![0xAB]),
        Value::Null,
    ];
    let json = serde_json::to_string(&values).expect("serialize");
    assert_eq!(json, r#"[1,0.5,"a","ab",null]"#);
}

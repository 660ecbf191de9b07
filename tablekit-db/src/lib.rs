//! Minimal safe `SQLite` wrapper used by `tablekit`.
//!
//! This crate provides a small, safe Rust API over the `SQLite` C FFI. The raw
//! symbols come from the `SQLite` amalgamation bundled and compiled by
//! `libsqlite3-sys`.
//!
//! Consumer code (schema inspection, query execution, result materialization)
//! uses only the safe types defined here and never touches raw FFI directly.
//! The `ffi` module is the **only** file that contains `unsafe` code or C
//! types.

mod ffi;

mod connection;
pub mod error;
mod statement;
pub mod value;

pub use connection::{Connection, IN_MEMORY};
pub use error::{DbError, DbErrorCode, DbResult};
pub use statement::{Statement, StepResult};
pub use value::Value;

#[cfg(test)]
mod tests;

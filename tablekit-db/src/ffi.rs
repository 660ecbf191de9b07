//! Raw FFI layer over the bundled `SQLite` library from `libsqlite3-sys`.
//!
//! [`RawDb`] and [`RawStmt`] own the `sqlite3*` / `sqlite3_stmt*` pointers and
//! expose typed methods that return [`DbResult`]. This is the **only** file
//! in the crate that contains `unsafe` code or C types.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use libsqlite3_sys as sys;

use super::error::{DbError, DbResult};

// `libsqlite3-sys` blocklists `sqlite3_close_v2` from its generated bindings;
// the symbol is still exported by the bundled library, so declare it here.
extern "C" {
    fn sqlite3_close_v2(db: *mut sys::sqlite3) -> c_int;
}

// ── SQLite constants ────────────────────────────────────────────────────

pub const SQLITE_OK: c_int = 0;
pub const SQLITE_TOOBIG: c_int = 18;
pub const SQLITE_MISUSE: c_int = 21;
pub const SQLITE_RANGE: c_int = 25;
pub const SQLITE_ROW: c_int = 100;
pub const SQLITE_DONE: c_int = 101;

// Column type constants
pub const SQLITE_INTEGER: c_int = 1;
pub const SQLITE_FLOAT: c_int = 2;
pub const SQLITE_TEXT: c_int = 3;
pub const SQLITE_BLOB: c_int = 4;
#[allow(dead_code)]
pub const SQLITE_NULL: c_int = 5;

// Open flags
pub const SQLITE_OPEN_READONLY: c_int = 0x0000_0001;
pub const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
pub const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;
pub const SQLITE_OPEN_FULLMUTEX: c_int = 0x0001_0000;

type Destructor = Option<unsafe extern "C" fn(*mut c_void)>;

/// `SQLITE_TRANSIENT`: `SQLite` copies the bound buffer before returning.
fn transient() -> Destructor {
    // SAFETY: -1 is the documented SQLITE_TRANSIENT sentinel. SQLite compares
    // against it and never calls it.
    Some(unsafe {
        std::mem::transmute::<isize, unsafe extern "C" fn(*mut c_void)>(-1_isize)
    })
}

fn to_cstring(text: &str) -> DbResult<CString> {
    CString::new(text)
        .map_err(|e| DbError::new(SQLITE_MISUSE, format!("nul byte in input: {e}")))
}

fn column_index(idx: usize) -> c_int {
    // Out-of-range indices make SQLite return NULL / 0, never UB.
    c_int::try_from(idx).unwrap_or(c_int::MAX)
}

fn len_c_int(len: usize) -> DbResult<c_int> {
    c_int::try_from(len)
        .map_err(|_| DbError::new(SQLITE_TOOBIG, format!("value of {len} bytes is too large")))
}

fn errmsg(db: *mut sys::sqlite3) -> String {
    if db.is_null() {
        return "unknown error".to_string();
    }
    // SAFETY: `db` is a live handle; the returned string is owned by SQLite
    // and copied before any other call on the handle.
    unsafe {
        let msg = sys::sqlite3_errmsg(db);
        if msg.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(msg).to_string_lossy().into_owned()
        }
    }
}

// ── Connection handle ───────────────────────────────────────────────────

/// Owned `sqlite3*` handle. Closed on drop.
pub struct RawDb {
    db: *mut sys::sqlite3,
}

// SAFETY: the handle is opened with SQLITE_OPEN_FULLMUTEX and `RawDb` is not
// `Sync`, so it is only ever used by one thread at a time.
unsafe impl Send for RawDb {}

impl RawDb {
    /// Opens the database at `path` with the given `SQLITE_OPEN_*` flags.
    pub fn open(path: &str, flags: c_int) -> DbResult<Self> {
        let c_path = to_cstring(path)?;
        let mut db: *mut sys::sqlite3 = ptr::null_mut();
        // SAFETY: all pointers are valid for the duration of the call.
        let rc = unsafe { sys::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        if rc != SQLITE_OK {
            let msg = if db.is_null() {
                format!("sqlite3_open_v2 returned {rc}")
            } else {
                let msg = errmsg(db);
                // SAFETY: a handle is allocated even on failure and must be released.
                unsafe {
                    sqlite3_close_v2(db);
                }
                msg
            };
            return Err(DbError::new(rc, msg));
        }
        Ok(Self { db })
    }

    /// Runs one or more semicolon separated statements without result rows.
    pub fn exec(&self, sql: &str) -> DbResult<()> {
        let c_sql = to_cstring(sql)?;
        let mut err: *mut c_char = ptr::null_mut();
        // SAFETY: no callback is registered; `err` is freed below.
        let rc = unsafe {
            sys::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut err)
        };
        if rc != SQLITE_OK {
            let msg = if err.is_null() {
                errmsg(self.db)
            } else {
                // SAFETY: `err` was allocated by sqlite3_exec.
                unsafe {
                    let msg = CStr::from_ptr(err).to_string_lossy().into_owned();
                    sys::sqlite3_free(err.cast::<c_void>());
                    msg
                }
            };
            return Err(DbError::new(rc, msg));
        }
        Ok(())
    }

    /// Compiles exactly one SQL statement.
    ///
    /// Trailing statements after the first are rejected instead of being
    /// silently ignored.
    pub fn prepare(&self, sql: &str) -> DbResult<RawStmt<'_>> {
        let c_sql = to_cstring(sql)?;
        let mut stmt: *mut sys::sqlite3_stmt = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();
        // SAFETY: `c_sql` outlives the call and `tail` points into it.
        let rc = unsafe {
            sys::sqlite3_prepare_v2(self.db, c_sql.as_ptr(), -1, &mut stmt, &mut tail)
        };
        if rc != SQLITE_OK {
            let err = DbError::new(rc, errmsg(self.db));
            if !stmt.is_null() {
                // SAFETY: finalizing a statement we own.
                unsafe {
                    sys::sqlite3_finalize(stmt);
                }
            }
            return Err(err);
        }
        if stmt.is_null() {
            return Err(DbError::new(SQLITE_MISUSE, "no SQL statement to prepare"));
        }
        let raw = RawStmt {
            stmt,
            db: self.db,
            _conn: PhantomData,
        };
        if !tail.is_null() {
            // SAFETY: `tail` points at the NUL-terminated remainder of `c_sql`.
            let rest = unsafe { CStr::from_ptr(tail) }.to_string_lossy();
            let rest = rest.trim_matches(|c: char| c.is_whitespace() || c == ';');
            if !rest.is_empty() {
                return Err(DbError::new(
                    SQLITE_MISUSE,
                    format!("multiple statements are not allowed: {rest}"),
                ));
            }
        }
        Ok(raw)
    }

    /// Rows changed by the most recent INSERT/UPDATE/DELETE.
    pub fn changes(&self) -> usize {
        // SAFETY: `db` is a live handle.
        let changes = unsafe { sys::sqlite3_changes(self.db) };
        usize::try_from(changes).unwrap_or(0)
    }

    /// Closes the handle, reporting the close result.
    pub fn close(mut self) -> DbResult<()> {
        // SAFETY: the pointer is nulled right after so `Drop` will not close twice.
        let rc = unsafe { sqlite3_close_v2(self.db) };
        self.db = ptr::null_mut();
        if rc != SQLITE_OK {
            return Err(DbError::new(rc, format!("sqlite3_close_v2 returned {rc}")));
        }
        Ok(())
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        if !self.db.is_null() {
            // SAFETY: closing a handle we own exactly once.
            unsafe {
                sqlite3_close_v2(self.db);
            }
            self.db = ptr::null_mut();
        }
    }
}

// ── Statement handle ────────────────────────────────────────────────────

/// Owned `sqlite3_stmt*` handle tied to the connection that prepared it.
/// Finalized on drop.
pub struct RawStmt<'conn> {
    stmt: *mut sys::sqlite3_stmt,
    db: *mut sys::sqlite3,
    _conn: PhantomData<&'conn RawDb>,
}

impl RawStmt<'_> {
    fn check(&self, rc: c_int) -> DbResult<()> {
        if rc == SQLITE_OK {
            Ok(())
        } else {
            Err(DbError::new(rc, errmsg(self.db)))
        }
    }

    fn param_index(idx: usize) -> DbResult<c_int> {
        c_int::try_from(idx)
            .map_err(|_| DbError::new(SQLITE_RANGE, format!("parameter index {idx} out of range")))
    }

    pub fn bind_i64(&self, idx: usize, value: i64) -> DbResult<()> {
        let idx = Self::param_index(idx)?;
        // SAFETY: `stmt` is a live statement.
        self.check(unsafe { sys::sqlite3_bind_int64(self.stmt, idx, value) })
    }

    pub fn bind_f64(&self, idx: usize, value: f64) -> DbResult<()> {
        let idx = Self::param_index(idx)?;
        // SAFETY: `stmt` is a live statement.
        self.check(unsafe { sys::sqlite3_bind_double(self.stmt, idx, value) })
    }

    pub fn bind_text(&self, idx: usize, value: &str) -> DbResult<()> {
        let idx = Self::param_index(idx)?;
        let len = len_c_int(value.len())?;
        // SAFETY: SQLITE_TRANSIENT makes SQLite copy `len` bytes before returning.
        self.check(unsafe {
            sys::sqlite3_bind_text(
                self.stmt,
                idx,
                value.as_ptr().cast::<c_char>(),
                len,
                transient(),
            )
        })
    }

    pub fn bind_blob(&self, idx: usize, value: &[u8]) -> DbResult<()> {
        let idx = Self::param_index(idx)?;
        let len = len_c_int(value.len())?;
        // SAFETY: SQLITE_TRANSIENT makes SQLite copy `len` bytes before returning.
        self.check(unsafe {
            sys::sqlite3_bind_blob(
                self.stmt,
                idx,
                value.as_ptr().cast::<c_void>(),
                len,
                transient(),
            )
        })
    }

    pub fn bind_null(&self, idx: usize) -> DbResult<()> {
        let idx = Self::param_index(idx)?;
        // SAFETY: `stmt` is a live statement.
        self.check(unsafe { sys::sqlite3_bind_null(self.stmt, idx) })
    }

    pub fn parameter_count(&self) -> usize {
        // SAFETY: `stmt` is a live statement.
        let count = unsafe { sys::sqlite3_bind_parameter_count(self.stmt) };
        usize::try_from(count).unwrap_or(0)
    }

    /// Steps the statement. Returns `SQLITE_ROW` or `SQLITE_DONE`.
    pub fn step(&self) -> DbResult<c_int> {
        // SAFETY: `stmt` is a live statement.
        let rc = unsafe { sys::sqlite3_step(self.stmt) };
        match rc {
            SQLITE_ROW | SQLITE_DONE => Ok(rc),
            _ => Err(DbError::new(rc, errmsg(self.db))),
        }
    }

    pub fn column_count(&self) -> usize {
        // SAFETY: `stmt` is a live statement.
        let count = unsafe { sys::sqlite3_column_count(self.stmt) };
        usize::try_from(count).unwrap_or(0)
    }

    pub fn column_name(&self, idx: usize) -> String {
        // SAFETY: the returned string is owned by SQLite and copied immediately.
        unsafe {
            let name = sys::sqlite3_column_name(self.stmt, column_index(idx));
            if name.is_null() {
                String::new()
            } else {
                CStr::from_ptr(name).to_string_lossy().into_owned()
            }
        }
    }

    pub fn column_type(&self, idx: usize) -> c_int {
        // SAFETY: `stmt` is a live statement.
        unsafe { sys::sqlite3_column_type(self.stmt, column_index(idx)) }
    }

    pub fn column_i64(&self, idx: usize) -> i64 {
        // SAFETY: `stmt` is a live statement.
        unsafe { sys::sqlite3_column_int64(self.stmt, column_index(idx)) }
    }

    pub fn column_f64(&self, idx: usize) -> f64 {
        // SAFETY: `stmt` is a live statement.
        unsafe { sys::sqlite3_column_double(self.stmt, column_index(idx)) }
    }

    pub fn column_text(&self, idx: usize) -> String {
        let idx = column_index(idx);
        // SAFETY: text pointer first, then byte count, as SQLite requires; the
        // buffer stays valid until the next step and is copied here.
        unsafe {
            let text = sys::sqlite3_column_text(self.stmt, idx);
            let len = sys::sqlite3_column_bytes(self.stmt, idx);
            let len = usize::try_from(len).unwrap_or(0);
            if text.is_null() || len == 0 {
                return String::new();
            }
            let bytes = std::slice::from_raw_parts(text.cast::<u8>(), len);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }

    pub fn column_blob(&self, idx: usize) -> Vec<u8> {
        let idx = column_index(idx);
        // SAFETY: blob pointer first, then byte count; copied before returning.
        unsafe {
            let blob = sys::sqlite3_column_blob(self.stmt, idx);
            let len = sys::sqlite3_column_bytes(self.stmt, idx);
            let len = usize::try_from(len).unwrap_or(0);
            if blob.is_null() || len == 0 {
                return Vec::new();
            }
            std::slice::from_raw_parts(blob.cast::<u8>(), len).to_vec()
        }
    }
}

impl Drop for RawStmt<'_> {
    fn drop(&mut self) {
        if !self.stmt.is_null() {
            // SAFETY: finalizing a statement we own exactly once.
            unsafe {
                sys::sqlite3_finalize(self.stmt);
            }
            self.stmt = ptr::null_mut();
        }
    }
}

//! Bundled SQLite driver backed by rusqlite.
//!
//! This is the reference implementation of the driver seam and the fixture
//! the integration tests run against. SQLite has no native auto-commit
//! flag or isolation-level API, so manual-commit mode is rendered as an
//! explicit `BEGIN`/`COMMIT`/`ROLLBACK` scope and only the two isolation
//! modes SQLite actually has are reported as supported.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{OpenFlags, params_from_iter};
use rust_decimal::Decimal;

use crate::driver::{
    ArrayValue, Connection, ConnectionSource, DriverError, Row, RowCursor, Statement,
};
use crate::isolation::IsolationLevel;
use crate::value::{SqlParam, SqlValue};

impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        DriverError::with_source(err.to_string(), err)
    }
}

/// Opens connections to one SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
    read_only: bool,
}

impl SqliteSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SqliteSource {
            path: path.as_ref().to_path_buf(),
            read_only: false,
        }
    }

    /// A source whose connections reject mutating operations.
    pub fn read_only(path: impl AsRef<Path>) -> Self {
        SqliteSource {
            path: path.as_ref().to_path_buf(),
            read_only: true,
        }
    }
}

impl ConnectionSource for SqliteSource {
    fn open(&self) -> Result<Box<dyn Connection>, DriverError> {
        let flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        let conn = rusqlite::Connection::open_with_flags(&self.path, flags)?;
        // Concurrent connections to the same file wait instead of failing
        // immediately with SQLITE_BUSY.
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Box::new(SqliteConnection {
            conn: Some(conn),
            read_only: self.read_only,
            in_transaction: Cell::new(false),
        }))
    }
}

pub struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
    read_only: bool,
    in_transaction: Cell<bool>,
}

impl SqliteConnection {
    fn handle(&self) -> Result<&rusqlite::Connection, DriverError> {
        self.conn
            .as_ref()
            .ok_or_else(|| DriverError::new("sqlite connection is closed"))
    }
}

impl Connection for SqliteConnection {
    fn prepare<'c>(
        &'c self,
        sql: &str,
        return_generated_keys: bool,
    ) -> Result<Box<dyn Statement + 'c>, DriverError> {
        let conn = self.handle()?;
        let stmt = conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement {
            conn,
            stmt,
            params: Vec::new(),
            want_keys: return_generated_keys,
            last_changes: 0,
            rowid_before: conn.last_insert_rowid(),
        }))
    }

    fn commit(&self) -> Result<(), DriverError> {
        if self.in_transaction.get() {
            self.handle()?.execute_batch("COMMIT")?;
            self.in_transaction.set(false);
        }
        Ok(())
    }

    fn rollback(&self) -> Result<(), DriverError> {
        if self.in_transaction.get() {
            self.handle()?.execute_batch("ROLLBACK")?;
            self.in_transaction.set(false);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if let Some(conn) = self.conn.take() {
            // An open transaction scope rolls back when the session ends.
            conn.close().map_err(|(_, err)| DriverError::from(err))?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn set_auto_commit(&self, auto_commit: bool) -> Result<(), DriverError> {
        if !auto_commit && !self.in_transaction.get() {
            self.handle()?.execute_batch("BEGIN")?;
            self.in_transaction.set(true);
        } else if auto_commit && self.in_transaction.get() {
            self.handle()?.execute_batch("COMMIT")?;
            self.in_transaction.set(false);
        }
        Ok(())
    }

    fn supports_isolation_level(&self, level: IsolationLevel) -> bool {
        matches!(
            level,
            IsolationLevel::Default | IsolationLevel::Serializable | IsolationLevel::ReadUncommitted
        )
    }

    fn set_isolation_level(&self, level: IsolationLevel) -> Result<(), DriverError> {
        match level {
            // Serializable is SQLite's normal mode.
            IsolationLevel::Default | IsolationLevel::Serializable => Ok(()),
            IsolationLevel::ReadUncommitted => {
                self.handle()?.execute_batch("PRAGMA read_uncommitted = 1")?;
                Ok(())
            }
            other => Err(DriverError::new(format!(
                "isolation level {other} is not supported by sqlite"
            ))),
        }
    }

    fn create_array(
        &self,
        _element_type: &str,
        _values: &[SqlParam],
    ) -> Result<ArrayValue, DriverError> {
        Err(DriverError::new(
            "sqlite does not support array parameters",
        ))
    }
}

struct SqliteStatement<'c> {
    conn: &'c rusqlite::Connection,
    stmt: rusqlite::Statement<'c>,
    params: Vec<Value>,
    want_keys: bool,
    last_changes: u64,
    rowid_before: i64,
}

impl SqliteStatement<'_> {
    fn put(&mut self, idx: usize, value: Value) -> Result<(), DriverError> {
        if idx == 0 {
            return Err(DriverError::new("parameter indices are 1-based"));
        }
        if self.params.len() < idx {
            self.params.resize(idx, Value::Null);
        }
        self.params[idx - 1] = value;
        Ok(())
    }
}

impl Statement for SqliteStatement<'_> {
    fn bind_bool(&mut self, idx: usize, value: bool) -> Result<(), DriverError> {
        self.put(idx, Value::Integer(i64::from(value)))
    }

    fn bind_i8(&mut self, idx: usize, value: i8) -> Result<(), DriverError> {
        self.put(idx, Value::Integer(i64::from(value)))
    }

    fn bind_f64(&mut self, idx: usize, value: f64) -> Result<(), DriverError> {
        self.put(idx, Value::Real(value))
    }

    fn bind_f32(&mut self, idx: usize, value: f32) -> Result<(), DriverError> {
        self.put(idx, Value::Real(f64::from(value)))
    }

    fn bind_i32(&mut self, idx: usize, value: i32) -> Result<(), DriverError> {
        self.put(idx, Value::Integer(i64::from(value)))
    }

    fn bind_i64(&mut self, idx: usize, value: i64) -> Result<(), DriverError> {
        self.put(idx, Value::Integer(value))
    }

    fn bind_i16(&mut self, idx: usize, value: i16) -> Result<(), DriverError> {
        self.put(idx, Value::Integer(i64::from(value)))
    }

    fn bind_text(&mut self, idx: usize, value: &str) -> Result<(), DriverError> {
        self.put(idx, Value::Text(value.to_string()))
    }

    fn bind_timestamp(&mut self, idx: usize, value: NaiveDateTime) -> Result<(), DriverError> {
        self.put(idx, Value::Text(value.format("%F %T%.f").to_string()))
    }

    fn bind_decimal(&mut self, idx: usize, value: Decimal) -> Result<(), DriverError> {
        self.put(idx, Value::Text(value.to_string()))
    }

    fn bind_array(&mut self, _idx: usize, _value: ArrayValue) -> Result<(), DriverError> {
        Err(DriverError::new(
            "sqlite does not support array parameters",
        ))
    }

    fn bind_null(&mut self, idx: usize) -> Result<(), DriverError> {
        self.put(idx, Value::Null)
    }

    fn bind_other(&mut self, idx: usize, value: &serde_json::Value) -> Result<(), DriverError> {
        self.put(idx, Value::Text(value.to_string()))
    }

    fn query(&mut self) -> Result<Box<dyn RowCursor + '_>, DriverError> {
        let columns: Arc<[String]> = self
            .stmt
            .column_names()
            .iter()
            .map(|name| (*name).to_string())
            .collect::<Vec<_>>()
            .into();
        let rows = self.stmt.query(params_from_iter(self.params.clone()))?;
        Ok(Box::new(SqliteRowCursor { rows, columns }))
    }

    fn execute(&mut self) -> Result<u64, DriverError> {
        self.rowid_before = self.conn.last_insert_rowid();
        let changes = self.stmt.execute(params_from_iter(self.params.clone()))?;
        self.last_changes = changes as u64;
        Ok(self.last_changes)
    }

    fn generated_keys(&mut self) -> Result<Option<Row>, DriverError> {
        // last_insert_rowid is connection-global: an unchanged value means
        // this statement inserted nothing, even if it affected rows.
        let rowid = self.conn.last_insert_rowid();
        if !self.want_keys || self.last_changes == 0 || rowid == self.rowid_before {
            return Ok(None);
        }
        let columns: Arc<[String]> = vec!["rowid".to_string()].into();
        Ok(Some(Row::new(columns, vec![SqlValue::Int(rowid)])))
    }
}

struct SqliteRowCursor<'s> {
    rows: rusqlite::Rows<'s>,
    columns: Arc<[String]>,
}

impl RowCursor for SqliteRowCursor<'_> {
    fn next(&mut self) -> Result<Option<Row>, DriverError> {
        match self.rows.next()? {
            Some(row) => {
                let mut values = Vec::with_capacity(self.columns.len());
                for idx in 0..self.columns.len() {
                    values.push(read_value(row, idx)?);
                }
                Ok(Some(Row::new(self.columns.clone(), values)))
            }
            None => Ok(None),
        }
    }
}

fn read_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<SqlValue, DriverError> {
    let value = match row.get_ref(idx)? {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Int(i),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    };
    Ok(value)
}

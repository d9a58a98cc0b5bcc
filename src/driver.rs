//! The seam between this crate and a concrete database driver.
//!
//! Everything above this module works exclusively in terms of these traits,
//! so a backend only has to translate its native statement and row types
//! into [`Row`]/[`crate::value::SqlValue`] and its native error into
//! [`DriverError`].

use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::isolation::IsolationLevel;
use crate::value::{SqlParam, SqlValue};

/// A failure reported by the underlying database driver, normalized to one
/// shape: the original message plus the native error as source.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        DriverError {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        DriverError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Supplies connections on demand; typically backed by a pool or factory.
pub trait ConnectionSource {
    fn open(&self) -> Result<Box<dyn Connection>, DriverError>;
}

/// A live database session.
///
/// `close` is the only structurally mutating call; everything else takes
/// `&self` so that a prepared statement (which borrows the connection) can
/// coexist with further capability queries during binding.
pub trait Connection {
    /// Prepare a parameterized statement. When `return_generated_keys` is
    /// set, [`Statement::generated_keys`] is valid after `execute`.
    fn prepare<'c>(
        &'c self,
        sql: &str,
        return_generated_keys: bool,
    ) -> Result<Box<dyn Statement + 'c>, DriverError>;

    fn commit(&self) -> Result<(), DriverError>;

    fn rollback(&self) -> Result<(), DriverError>;

    /// Close the session. Must be idempotent.
    fn close(&mut self) -> Result<(), DriverError>;

    fn is_closed(&self) -> bool;

    fn is_read_only(&self) -> bool;

    /// Toggle implicit per-statement commit. Turning it off opens an
    /// explicit transaction scope on drivers without a native flag.
    fn set_auto_commit(&self, auto_commit: bool) -> Result<(), DriverError>;

    fn supports_isolation_level(&self, level: IsolationLevel) -> bool;

    fn set_isolation_level(&self, level: IsolationLevel) -> Result<(), DriverError>;

    /// Resolve an array parameter into the driver's canonical bindable
    /// form. Drivers without array support fail here, before any binding
    /// happens.
    fn create_array(
        &self,
        element_type: &str,
        values: &[SqlParam],
    ) -> Result<ArrayValue, DriverError>;
}

/// A driver-validated array value, ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub element_type: String,
    pub values: Vec<SqlParam>,
}

/// A prepared, parameterized statement.
///
/// Binding indices are 1-based and assigned without gaps, in the order the
/// parameters were supplied.
pub trait Statement {
    fn bind_bool(&mut self, idx: usize, value: bool) -> Result<(), DriverError>;
    fn bind_i8(&mut self, idx: usize, value: i8) -> Result<(), DriverError>;
    fn bind_f64(&mut self, idx: usize, value: f64) -> Result<(), DriverError>;
    fn bind_f32(&mut self, idx: usize, value: f32) -> Result<(), DriverError>;
    fn bind_i32(&mut self, idx: usize, value: i32) -> Result<(), DriverError>;
    fn bind_i64(&mut self, idx: usize, value: i64) -> Result<(), DriverError>;
    fn bind_i16(&mut self, idx: usize, value: i16) -> Result<(), DriverError>;
    fn bind_text(&mut self, idx: usize, value: &str) -> Result<(), DriverError>;
    fn bind_timestamp(&mut self, idx: usize, value: NaiveDateTime) -> Result<(), DriverError>;
    fn bind_decimal(&mut self, idx: usize, value: Decimal) -> Result<(), DriverError>;
    fn bind_array(&mut self, idx: usize, value: ArrayValue) -> Result<(), DriverError>;
    fn bind_null(&mut self, idx: usize) -> Result<(), DriverError>;
    fn bind_other(&mut self, idx: usize, value: &serde_json::Value) -> Result<(), DriverError>;

    /// Run the statement and stream its result rows.
    fn query(&mut self) -> Result<Box<dyn RowCursor + '_>, DriverError>;

    /// Run the statement and return the affected row count.
    fn execute(&mut self) -> Result<u64, DriverError>;

    /// The generated-key row of the last `execute`, if the statement was
    /// prepared with `return_generated_keys` and the database produced one.
    fn generated_keys(&mut self) -> Result<Option<Row>, DriverError>;
}

/// Forward-only iteration over a result set.
pub trait RowCursor {
    fn next(&mut self) -> Result<Option<Row>, DriverError>;
}

/// One materialized result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Row { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Value at a 0-based column index.
    pub fn get(&self, idx: usize) -> Option<&SqlValue> {
        self.values.get(idx)
    }

    /// Value of the first column with the given name.
    pub fn get_named(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|col| col == name)
            .and_then(|idx| self.values.get(idx))
    }
}

//! Instrumented in-memory driver for observing lifecycle behavior: every
//! open, bind, execute, and close is appended to a shared event log.
#![allow(dead_code)]

use std::cell::Cell;
use std::sync::{Arc, Mutex};

use easy_sql::driver::{
    ArrayValue, Connection, ConnectionSource, DriverError, Row, RowCursor, Statement,
};
use easy_sql::{IsolationLevel, SqlParam, SqlValue};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn record(log: &EventLog, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn count_of(log: &EventLog, event: &str) -> usize {
    events(log).iter().filter(|e| e.as_str() == event).count()
}

pub fn position_of(log: &EventLog, event: &str) -> Option<usize> {
    events(log).iter().position(|e| e.as_str() == event)
}

pub fn row(columns: &[&str], values: Vec<SqlValue>) -> Row {
    let columns: Arc<[String]> = columns
        .iter()
        .map(|name| (*name).to_string())
        .collect::<Vec<_>>()
        .into();
    Row::new(columns, values)
}

#[derive(Clone, Default)]
pub struct MockConfig {
    pub fail_open: bool,
    pub fail_prepare: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    pub fail_close: bool,
    pub read_only: bool,
    pub supported_levels: Vec<IsolationLevel>,
    pub rows: Vec<Row>,
    pub affected: u64,
    pub generated_key: Option<i64>,
}

pub struct MockSource {
    log: EventLog,
    config: MockConfig,
}

impl MockSource {
    pub fn new(log: EventLog, config: MockConfig) -> Self {
        MockSource { log, config }
    }
}

impl ConnectionSource for MockSource {
    fn open(&self) -> Result<Box<dyn Connection>, DriverError> {
        if self.config.fail_open {
            record(&self.log, "open_failed");
            return Err(DriverError::new("mock open failure"));
        }
        record(&self.log, "open");
        Ok(Box::new(MockConnection::new(
            self.log.clone(),
            self.config.clone(),
        )))
    }
}

pub struct MockConnection {
    log: EventLog,
    config: MockConfig,
    closed: Cell<bool>,
}

impl MockConnection {
    pub fn new(log: EventLog, config: MockConfig) -> Self {
        MockConnection {
            log,
            config,
            closed: Cell::new(false),
        }
    }

    pub fn already_closed(log: EventLog) -> Self {
        let conn = MockConnection::new(log, MockConfig::default());
        conn.closed.set(true);
        conn
    }
}

impl Connection for MockConnection {
    fn prepare<'c>(
        &'c self,
        _sql: &str,
        return_generated_keys: bool,
    ) -> Result<Box<dyn Statement + 'c>, DriverError> {
        if self.closed.get() {
            return Err(DriverError::new("mock connection is closed"));
        }
        if self.config.fail_prepare {
            record(&self.log, "prepare_failed");
            return Err(DriverError::new("mock prepare failure"));
        }
        record(&self.log, "prepare");
        Ok(Box::new(MockStatement {
            log: self.log.clone(),
            config: self.config.clone(),
            want_keys: return_generated_keys,
            executed: false,
        }))
    }

    fn commit(&self) -> Result<(), DriverError> {
        record(&self.log, "commit");
        if self.config.fail_commit {
            return Err(DriverError::new("mock commit failure"));
        }
        Ok(())
    }

    fn rollback(&self) -> Result<(), DriverError> {
        record(&self.log, "rollback");
        if self.config.fail_rollback {
            return Err(DriverError::new("mock rollback failure"));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if !self.closed.get() {
            self.closed.set(true);
            record(&self.log, "close_connection");
            if self.config.fail_close {
                return Err(DriverError::new("mock close failure"));
            }
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    fn set_auto_commit(&self, auto_commit: bool) -> Result<(), DriverError> {
        record(&self.log, format!("set_auto_commit {auto_commit}"));
        Ok(())
    }

    fn supports_isolation_level(&self, level: IsolationLevel) -> bool {
        self.config.supported_levels.contains(&level)
    }

    fn set_isolation_level(&self, level: IsolationLevel) -> Result<(), DriverError> {
        record(&self.log, format!("set_isolation {level}"));
        Ok(())
    }

    fn create_array(
        &self,
        element_type: &str,
        values: &[SqlParam],
    ) -> Result<ArrayValue, DriverError> {
        record(
            &self.log,
            format!("create_array {element_type} x{}", values.len()),
        );
        Ok(ArrayValue {
            element_type: element_type.to_string(),
            values: values.to_vec(),
        })
    }
}

pub struct MockStatement {
    log: EventLog,
    config: MockConfig,
    want_keys: bool,
    executed: bool,
}

impl Statement for MockStatement {
    fn bind_bool(&mut self, idx: usize, value: bool) -> Result<(), DriverError> {
        record(&self.log, format!("bind_bool {idx} {value}"));
        Ok(())
    }

    fn bind_i8(&mut self, idx: usize, value: i8) -> Result<(), DriverError> {
        record(&self.log, format!("bind_i8 {idx} {value}"));
        Ok(())
    }

    fn bind_f64(&mut self, idx: usize, value: f64) -> Result<(), DriverError> {
        record(&self.log, format!("bind_f64 {idx} {value}"));
        Ok(())
    }

    fn bind_f32(&mut self, idx: usize, value: f32) -> Result<(), DriverError> {
        record(&self.log, format!("bind_f32 {idx} {value}"));
        Ok(())
    }

    fn bind_i32(&mut self, idx: usize, value: i32) -> Result<(), DriverError> {
        record(&self.log, format!("bind_i32 {idx} {value}"));
        Ok(())
    }

    fn bind_i64(&mut self, idx: usize, value: i64) -> Result<(), DriverError> {
        record(&self.log, format!("bind_i64 {idx} {value}"));
        Ok(())
    }

    fn bind_i16(&mut self, idx: usize, value: i16) -> Result<(), DriverError> {
        record(&self.log, format!("bind_i16 {idx} {value}"));
        Ok(())
    }

    fn bind_text(&mut self, idx: usize, value: &str) -> Result<(), DriverError> {
        record(&self.log, format!("bind_text {idx} {value}"));
        Ok(())
    }

    fn bind_timestamp(
        &mut self,
        idx: usize,
        value: chrono::NaiveDateTime,
    ) -> Result<(), DriverError> {
        record(&self.log, format!("bind_timestamp {idx} {}", value.format("%F %T")));
        Ok(())
    }

    fn bind_decimal(
        &mut self,
        idx: usize,
        value: rust_decimal::Decimal,
    ) -> Result<(), DriverError> {
        record(&self.log, format!("bind_decimal {idx} {value}"));
        Ok(())
    }

    fn bind_array(&mut self, idx: usize, value: ArrayValue) -> Result<(), DriverError> {
        record(&self.log, format!("bind_array {idx} {}", value.element_type));
        Ok(())
    }

    fn bind_null(&mut self, idx: usize) -> Result<(), DriverError> {
        record(&self.log, format!("bind_null {idx}"));
        Ok(())
    }

    fn bind_other(&mut self, idx: usize, value: &serde_json::Value) -> Result<(), DriverError> {
        record(&self.log, format!("bind_other {idx} {value}"));
        Ok(())
    }

    fn query(&mut self) -> Result<Box<dyn RowCursor + '_>, DriverError> {
        record(&self.log, "query");
        Ok(Box::new(MockRowCursor {
            log: self.log.clone(),
            rows: self.config.rows.clone().into_iter(),
        }))
    }

    fn execute(&mut self) -> Result<u64, DriverError> {
        record(&self.log, "execute");
        self.executed = true;
        Ok(self.config.affected)
    }

    fn generated_keys(&mut self) -> Result<Option<Row>, DriverError> {
        record(&self.log, "generated_keys");
        if !self.want_keys || !self.executed {
            return Ok(None);
        }
        Ok(self
            .config
            .generated_key
            .map(|key| row(&["id"], vec![SqlValue::Int(key)])))
    }
}

impl Drop for MockStatement {
    fn drop(&mut self) {
        record(&self.log, "close_statement");
    }
}

pub struct MockRowCursor {
    log: EventLog,
    rows: std::vec::IntoIter<Row>,
}

impl RowCursor for MockRowCursor {
    fn next(&mut self) -> Result<Option<Row>, DriverError> {
        record(&self.log, "cursor_next");
        Ok(self.rows.next())
    }
}

impl Drop for MockRowCursor {
    fn drop(&mut self) {
        record(&self.log, "close_cursor");
    }
}

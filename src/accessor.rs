//! The public operation surface.
//!
//! [`EasySql`] turns one SQL string plus a parameter list into a scalar, a
//! mapped object, a list, an associative row set, an insert with generated
//! keys, or an update count. Each operation is exactly one pass through the
//! guaranteed-cleanup executor.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::binder::bind_params;
use crate::driver::{Connection, ConnectionSource, Row, RowCursor};
use crate::error::EasySqlError;
use crate::executor::exec;
use crate::manager::{ConnectionManager, ExternalConnectionManager, PerCallConnectionManager};
use crate::value::{FromSqlValue, SqlParam, SqlValue};

/// Convenience wrapper around a connection manager.
///
/// The manager decides connection lifetime; `EasySql` only decides what one
/// operation does with the connection it is handed.
pub struct EasySql<M> {
    manager: M,
}

impl EasySql<PerCallConnectionManager> {
    /// An accessor that opens a fresh connection per operation from the
    /// given source.
    pub fn from_source(source: Arc<dyn ConnectionSource>) -> Self {
        EasySql::new(PerCallConnectionManager::new(source))
    }
}

impl EasySql<ExternalConnectionManager> {
    /// An accessor over a caller-owned connection. The caller keeps
    /// responsibility for closing it.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalState` when the connection is already closed.
    pub fn from_connection(connection: Box<dyn Connection>) -> Result<Self, EasySqlError> {
        Ok(EasySql::new(ExternalConnectionManager::new(connection)?))
    }
}

impl<M: ConnectionManager> EasySql<M> {
    pub fn new(manager: M) -> Self {
        EasySql { manager }
    }

    /// Run a query and hand the whole result cursor to `mapper`.
    ///
    /// This is the generalized form the other query operations are built
    /// on; use it when none of them fits.
    ///
    /// # Errors
    ///
    /// Driver failures from preparation, binding, execution, or row
    /// iteration, plus whatever the mapper returns.
    pub fn query_result<T, F>(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        mapper: F,
    ) -> Result<Option<T>, EasySqlError>
    where
        F: FnOnce(&mut dyn RowCursor) -> Result<Option<T>, EasySqlError>,
    {
        exec(&mut self.manager, |conn| {
            let mut stmt = conn.prepare(sql, false)?;
            bind_params(conn, stmt.as_mut(), params)?;
            let mut cursor = stmt.query()?;
            mapper(cursor.as_mut())
        })
    }

    /// Read column 1 of the first row, cast to `T`.
    ///
    /// Returns `None` when the query matches no rows.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` when the value does not fit `T`.
    pub fn query_scalar<T: FromSqlValue>(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<T>, EasySqlError> {
        self.query_result(sql, params, |cursor| match cursor.next()? {
            Some(row) => {
                let value = row.get(0).cloned().unwrap_or(SqlValue::Null);
                Ok(Some(T::from_sql_value(value)?))
            }
            None => Ok(None),
        })
    }

    /// Map the first row, if any, through `mapper`. The row index passed to
    /// the mapper is always 0.
    pub fn query_object<T, F>(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        mapper: F,
    ) -> Result<Option<T>, EasySqlError>
    where
        F: FnOnce(&Row, usize) -> Result<T, EasySqlError>,
    {
        self.query_result(sql, params, |cursor| match cursor.next()? {
            Some(row) => Ok(Some(mapper(&row, 0)?)),
            None => Ok(None),
        })
    }

    /// Every row as a column-name-ordered map. Duplicate column names keep
    /// the first occurrence.
    pub fn query_assoc(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<BTreeMap<String, SqlValue>>, EasySqlError> {
        self.query_result(sql, params, |cursor| {
            let mut result = Vec::new();
            while let Some(row) = cursor.next()? {
                let mut record = BTreeMap::new();
                for (name, value) in row.columns().iter().zip(row.values()) {
                    record.entry(name.clone()).or_insert_with(|| value.clone());
                }
                result.push(record);
            }
            Ok(Some(result))
        })
        .map(Option::unwrap_or_default)
    }

    /// Map every row through `mapper`, preserving row order. The row index
    /// starts at 0 and increases by one per row.
    pub fn query_list<T, F>(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        mut mapper: F,
    ) -> Result<Vec<T>, EasySqlError>
    where
        F: FnMut(&Row, usize) -> Result<T, EasySqlError>,
    {
        self.query_result(sql, params, |cursor| {
            let mut result = Vec::new();
            let mut row_num = 0;
            while let Some(row) = cursor.next()? {
                result.push(mapper(&row, row_num)?);
                row_num += 1;
            }
            Ok(Some(result))
        })
        .map(Option::unwrap_or_default)
    }

    /// Run an insert and map the generated-key row, if the database
    /// produced one.
    ///
    /// # Errors
    ///
    /// `IllegalState` when the connection is read-only; the check runs
    /// before anything executes.
    pub fn create<T, F>(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        key_mapper: F,
    ) -> Result<Option<T>, EasySqlError>
    where
        F: FnOnce(&Row) -> Result<T, EasySqlError>,
    {
        exec(&mut self.manager, |conn| {
            reject_read_only(conn, "create")?;
            let mut stmt = conn.prepare(sql, true)?;
            bind_params(conn, stmt.as_mut(), params)?;
            stmt.execute()?;
            match stmt.generated_keys()? {
                Some(row) => Ok(Some(key_mapper(&row)?)),
                None => Ok(None),
            }
        })
    }

    /// Run an insert and cast column 1 of the generated-key row to `K`.
    /// For single-column keys; composite keys go through [`Self::create`].
    pub fn create_key<K: FromSqlValue>(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<K>, EasySqlError> {
        self.create(sql, params, |row| {
            let value = row.get(0).cloned().unwrap_or(SqlValue::Null);
            K::from_sql_value(value)
        })
    }

    /// Run an update or delete and return the affected row count.
    ///
    /// # Errors
    ///
    /// `IllegalState` when the connection is read-only; the check runs
    /// before anything executes.
    pub fn update(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, EasySqlError> {
        exec(&mut self.manager, |conn| {
            reject_read_only(conn, "update")?;
            let mut stmt = conn.prepare(sql, false)?;
            bind_params(conn, stmt.as_mut(), params)?;
            Ok(stmt.execute()?)
        })
    }
}

fn reject_read_only(conn: &dyn Connection, operation: &str) -> Result<(), EasySqlError> {
    if conn.is_read_only() {
        return Err(EasySqlError::IllegalState(format!(
            "connection is read-only, cannot run a {operation} operation"
        )));
    }
    Ok(())
}

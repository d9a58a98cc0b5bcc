//! Convenience layer over SQL drivers: parameterized statements, row
//! mapping, and transactions, with guaranteed resource cleanup.

pub mod accessor;
pub mod binder;
pub mod driver;
pub mod error;
pub mod executor;
pub mod isolation;
pub mod manager;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod transaction;
pub mod value;

pub use accessor::EasySql;
pub use driver::{ArrayValue, Connection, ConnectionSource, DriverError, Row, RowCursor, Statement};
pub use error::EasySqlError;
pub use isolation::IsolationLevel;
pub use manager::{
    ConnectionManager, ExternalConnectionManager, PerCallConnectionManager,
    TransactionalConnectionManager,
};
pub use transaction::Transaction;
pub use value::{ArrayParam, FromSqlValue, SqlParam, SqlValue};

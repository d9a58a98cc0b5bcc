use thiserror::Error;

use crate::driver::DriverError;
use crate::isolation::IsolationLevel;

/// Unified error type for every operation in this crate.
#[derive(Debug, Error)]
pub enum EasySqlError {
    /// Any failure reported by the underlying database driver.
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("isolation level {0} is not supported by this driver")]
    UnsupportedIsolationLevel(IsolationLevel),

    /// A scalar or key cast that does not fit the requested Rust type.
    #[error("cannot read {found} column as {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
}

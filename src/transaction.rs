//! Transaction orchestration.
//!
//! A [`Transaction`] binds an accessor to one transactional connection
//! manager for the lifetime of one transaction: the connection opens
//! lazily on the first operation inside [`Transaction::run`] and survives
//! until [`Transaction::commit`] or a failing body rolls it back.

use std::sync::Arc;

use tracing::warn;

use crate::accessor::EasySql;
use crate::driver::ConnectionSource;
use crate::error::EasySqlError;
use crate::isolation::IsolationLevel;
use crate::manager::TransactionalConnectionManager;

/// One transaction. Use a fresh instance per transaction; once it has
/// committed or rolled back, every further call fails with `IllegalState`.
pub struct Transaction {
    manager: TransactionalConnectionManager,
    completed: bool,
}

impl Transaction {
    /// A transaction with the driver's default isolation level.
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Transaction {
            manager: TransactionalConnectionManager::new(source),
            completed: false,
        }
    }

    /// A transaction with an explicit isolation level, verified against the
    /// driver when the connection opens.
    pub fn with_isolation(source: Arc<dyn ConnectionSource>, isolation: IsolationLevel) -> Self {
        Transaction {
            manager: TransactionalConnectionManager::with_isolation(source, isolation),
            completed: false,
        }
    }

    /// Run `body` with an accessor bound to this transaction's connection.
    ///
    /// On success, returns `self` so `commit` can be chained:
    /// `tx.run(body)?.commit()?`. When the body fails, the transaction is
    /// rolled back best-effort and the body's error propagates unchanged;
    /// the transaction is unusable afterwards.
    pub fn run<F>(&mut self, body: F) -> Result<&mut Self, EasySqlError>
    where
        F: FnOnce(&mut EasySql<&mut TransactionalConnectionManager>) -> Result<(), EasySqlError>,
    {
        if self.completed {
            return Err(EasySqlError::IllegalState(
                "transaction has already completed".to_string(),
            ));
        }

        let mut accessor = EasySql::new(&mut self.manager);
        if let Err(err) = body(&mut accessor) {
            self.completed = true;
            if let Err(rollback_err) = self.manager.rollback() {
                warn!(error = %rollback_err, "rollback after failed transaction body failed");
            }
            return Err(err);
        }

        Ok(self)
    }

    /// Commit and physically close the transaction's connection.
    ///
    /// # Errors
    ///
    /// `Driver` when the driver rejects the commit; `IllegalState` when the
    /// transaction has already completed.
    pub fn commit(&mut self) -> Result<(), EasySqlError> {
        if self.completed {
            return Err(EasySqlError::IllegalState(
                "transaction has already completed".to_string(),
            ));
        }
        self.completed = true;
        self.manager.commit()
    }
}

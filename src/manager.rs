//! Connection lifetime policies.
//!
//! All three managers implement one capability, [`ConnectionManager`]; the
//! executor never knows which policy it is running against. A manager holds
//! at most one live connection at a time and never owns statements or
//! cursors.

use std::sync::Arc;

use tracing::warn;

use crate::driver::{Connection, ConnectionSource};
use crate::error::EasySqlError;
use crate::isolation::IsolationLevel;

/// Supplies a connection for one operation and takes it back afterwards.
pub trait ConnectionManager {
    /// Hand out the connection this manager currently stands for.
    fn acquire(&mut self) -> Result<&dyn Connection, EasySqlError>;

    /// Give the connection back. What this does depends on the lifetime
    /// policy; it is always safe to call when nothing is held.
    fn release(&mut self) -> Result<(), EasySqlError>;
}

impl<M: ConnectionManager + ?Sized> ConnectionManager for &mut M {
    fn acquire(&mut self) -> Result<&dyn Connection, EasySqlError> {
        (**self).acquire()
    }

    fn release(&mut self) -> Result<(), EasySqlError> {
        (**self).release()
    }
}

/// Wraps a caller-owned connection; the caller keeps responsibility for
/// closing it.
pub struct ExternalConnectionManager {
    connection: Box<dyn Connection>,
}

impl ExternalConnectionManager {
    /// # Errors
    ///
    /// Fails with `IllegalState` when the supplied connection is already
    /// closed.
    pub fn new(connection: Box<dyn Connection>) -> Result<Self, EasySqlError> {
        if connection.is_closed() {
            return Err(EasySqlError::IllegalState(
                "the external connection is already closed".to_string(),
            ));
        }
        Ok(ExternalConnectionManager { connection })
    }

    /// Hand the connection back to the caller.
    pub fn into_inner(self) -> Box<dyn Connection> {
        self.connection
    }
}

impl ConnectionManager for ExternalConnectionManager {
    fn acquire(&mut self) -> Result<&dyn Connection, EasySqlError> {
        Ok(&*self.connection)
    }

    /// No-op: the connection's lifetime belongs to the caller.
    fn release(&mut self) -> Result<(), EasySqlError> {
        Ok(())
    }
}

/// Opens a fresh connection for every operation and closes it on release.
///
/// The slot is owned by the manager instance rather than hidden in
/// thread-local storage; `&mut self` already guarantees that one in-flight
/// operation maps to exactly one connection.
pub struct PerCallConnectionManager {
    source: Arc<dyn ConnectionSource>,
    current: Option<Box<dyn Connection>>,
}

impl PerCallConnectionManager {
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        PerCallConnectionManager {
            source,
            current: None,
        }
    }
}

impl ConnectionManager for PerCallConnectionManager {
    fn acquire(&mut self) -> Result<&dyn Connection, EasySqlError> {
        // A stale slot means the previous operation never released; close
        // it instead of leaking the connection.
        if let Some(mut stale) = self.current.take() {
            if let Err(close_err) = stale.close() {
                warn!(error = %close_err, "closing stale per-call connection failed");
            }
        }
        let conn = self.source.open()?;
        Ok(&**self.current.insert(conn))
    }

    fn release(&mut self) -> Result<(), EasySqlError> {
        match self.current.take() {
            Some(mut conn) => {
                conn.close()?;
                Ok(())
            }
            // Releasing an empty slot is a no-op.
            None => Ok(()),
        }
    }
}

/// Keeps one connection alive across operations until commit or rollback.
///
/// Not meant to be shared: one transaction per instance.
pub struct TransactionalConnectionManager {
    source: Arc<dyn ConnectionSource>,
    isolation: IsolationLevel,
    current: Option<Box<dyn Connection>>,
}

impl TransactionalConnectionManager {
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self::with_isolation(source, IsolationLevel::Default)
    }

    pub fn with_isolation(source: Arc<dyn ConnectionSource>, isolation: IsolationLevel) -> Self {
        TransactionalConnectionManager {
            source,
            isolation,
            current: None,
        }
    }

    /// Open a connection configured for manual commit and the requested
    /// isolation level. A connection that cannot be configured is closed
    /// before the error propagates, so no half-configured session leaks out.
    fn open_configured(&self) -> Result<Box<dyn Connection>, EasySqlError> {
        let mut conn = self.source.open()?;

        let configured = (|| {
            conn.set_auto_commit(false)?;
            if self.isolation != IsolationLevel::Default {
                if !conn.supports_isolation_level(self.isolation) {
                    return Err(EasySqlError::UnsupportedIsolationLevel(self.isolation));
                }
                conn.set_isolation_level(self.isolation)?;
            }
            Ok(())
        })();

        match configured {
            Ok(()) => Ok(conn),
            Err(err) => {
                if let Err(close_err) = conn.close() {
                    warn!(error = %close_err, "closing unconfigured connection failed");
                }
                Err(err)
            }
        }
    }

    /// Commit the held connection, then physically close it and clear the
    /// slot. Calling this with nothing held is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates the driver's commit failure; a close failure after a
    /// successful commit is logged and suppressed.
    pub fn commit(&mut self) -> Result<(), EasySqlError> {
        match self.current.take() {
            Some(mut conn) => {
                conn.commit()?;
                if let Err(close_err) = conn.close() {
                    warn!(error = %close_err, "closing connection after commit failed");
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Roll back the held connection, then physically close it and clear
    /// the slot. Calling this with nothing held is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates the driver's rollback failure; the close afterwards is
    /// best-effort.
    pub fn rollback(&mut self) -> Result<(), EasySqlError> {
        match self.current.take() {
            Some(mut conn) => {
                let rolled_back = conn.rollback();
                if let Err(close_err) = conn.close() {
                    warn!(error = %close_err, "closing connection after rollback failed");
                }
                rolled_back?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl ConnectionManager for TransactionalConnectionManager {
    /// Idempotent: the first call opens and configures the connection,
    /// every further call returns the same one.
    fn acquire(&mut self) -> Result<&dyn Connection, EasySqlError> {
        if self.current.is_none() {
            let conn = self.open_configured()?;
            self.current = Some(conn);
        }
        self.current.as_deref().ok_or_else(|| {
            EasySqlError::IllegalState("transactional connection slot is empty".to_string())
        })
    }

    /// No-op: the connection must outlive a single operation.
    fn release(&mut self) -> Result<(), EasySqlError> {
        Ok(())
    }
}

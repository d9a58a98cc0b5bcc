//! Guaranteed-cleanup execution wrapper.
//!
//! Every accessor operation funnels through [`exec`]: acquire a connection
//! from the manager, run the action, release the connection on every exit
//! path. Statement and cursor handles opened inside the action are closed
//! by their `Drop` impls before the action's scope unwinds, so the cleanup
//! order is always result set, then statement, then connection.

use tracing::warn;

use crate::driver::Connection;
use crate::error::EasySqlError;
use crate::manager::ConnectionManager;

/// Calls `release` when dropped, so the connection goes back even when the
/// action fails or panics. A release failure must never mask the primary
/// outcome, so it is logged and swallowed.
struct ReleaseGuard<'a, M: ConnectionManager + ?Sized>(&'a mut M);

impl<M: ConnectionManager + ?Sized> Drop for ReleaseGuard<'_, M> {
    fn drop(&mut self) {
        if let Err(err) = self.0.release() {
            warn!(error = %err, "releasing connection failed");
        }
    }
}

/// Run one database action against a connection obtained from `manager`.
///
/// # Errors
///
/// Propagates acquisition failures and whatever the action returns; driver
/// failures arrive wrapped as [`EasySqlError::Driver`].
pub fn exec<M, T, F>(manager: &mut M, action: F) -> Result<T, EasySqlError>
where
    M: ConnectionManager + ?Sized,
    F: FnOnce(&dyn Connection) -> Result<T, EasySqlError>,
{
    let guard = ReleaseGuard(manager);
    let conn = guard.0.acquire()?;
    action(conn)
}

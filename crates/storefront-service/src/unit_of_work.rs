//! Commit and rollback helpers shared by the purchase and wallet paths.

use std::time::Duration;

use storefront_store::{StoreError, UnitOfWork};

/// Commit `uow` on its own task and wait for the outcome.
///
/// Once this is called the commit runs to completion even if the caller's
/// future is dropped, so a client disconnect cannot cut it short.
pub(crate) async fn commit_detached(uow: Box<dyn UnitOfWork>) -> Result<(), StoreError> {
    tokio::spawn(async move { uow.commit().await })
        .await
        .map_err(|e| StoreError::Database(format!("commit task failed: {e}")))?
}

/// Roll back `uow`, logging instead of returning a rollback failure.
///
/// The rollback gets at most `limit`; if it does not finish, the unit of work
/// is dropped, which also discards its writes.
pub(crate) async fn abandon(uow: Box<dyn UnitOfWork>, limit: Duration, reason: &str) {
    match tokio::time::timeout(limit, uow.rollback()).await {
        Ok(Ok(())) => {
            tracing::debug!(reason = %reason, "Unit of work rolled back");
        }
        Ok(Err(e)) => {
            tracing::warn!(reason = %reason, error = %e, "Rollback failed");
        }
        Err(_) => {
            tracing::warn!(reason = %reason, timeout = ?limit, "Rollback timed out");
        }
    }
}

pub mod absence_repo;
pub mod availability_repo;
pub mod member_repo;
pub mod schedule_repo;

use sqlx::{Sqlite, Transaction};
use tracing::warn;

use crate::error::{Result, RosterError};

/// Commits `tx` if `outcome` succeeded, otherwise rolls it back and returns the original error.
pub(crate) async fn finish<T>(tx: Transaction<'_, Sqlite>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(RosterError::TransactionFailed)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}

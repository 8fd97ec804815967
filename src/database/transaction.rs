use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rand::Rng;
use sqlx::{Postgres, Transaction};

use crate::database::pool;
use crate::error::AppError;

/// Bounded retry budget for transactions that abort on serialization
/// failures or deadlocks. Exhaustion surfaces as a Conflict to the caller.
pub const MAX_ATTEMPTS: u32 = 4;
const BASE_BACKOFF_MS: u64 = 25;

pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'a>>;

#[derive(Debug)]
pub struct DatabaseTransaction;

impl DatabaseTransaction {
    /// Run a closure inside a transaction
    pub async fn run<T, F>(f: F) -> Result<T, AppError>
    where
        F: for<'a> FnOnce(&'a mut Transaction<'_, Postgres>) -> TxFuture<'a, T>,
        T: Send,
    {
        let mut tx = pool().begin().await.map_err(AppError::from)?;

        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await.map_err(AppError::from)?;
                Ok(value)
            }
            Err(err) => {
                log::warn!("Transaction failed with error: {}, rolling back", err);
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!(
                        "Rollback failed after error (orig: {}, rollback: {})",
                        err,
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}

/// Exponential backoff with jitter for transaction retries.
pub async fn backoff(attempt: u32) {
    let base = BASE_BACKOFF_MS * 2u64.pow(attempt.saturating_sub(1));
    let jitter = rand::rng().random_range(0..=BASE_BACKOFF_MS);
    tokio::time::sleep(Duration::from_millis(base + jitter)).await;
}

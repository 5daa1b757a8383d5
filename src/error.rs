//! Engine Error Types

use thiserror::Error;

/// Persistence-layer errors shared by all stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Errors surfaced by the processor and sweeper
///
/// An "already processed" withdrawal is NOT an error - it is a benign
/// [`ProcessOutcome`](crate::withdrawal::ProcessOutcome). These variants
/// cover genuine faults only; the batch runner isolates them per item.
#[derive(Debug, Error)]
pub enum PayoutError {
    #[error("withdrawal not found: {0}")]
    WithdrawalNotFound(String),

    #[error("wallet not found: {0}")]
    WalletNotFound(u64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

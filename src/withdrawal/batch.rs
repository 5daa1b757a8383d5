//! Batch Runner
//!
//! Processes every PENDING withdrawal sequentially. Sequential by design:
//! concurrent transfers against the same cook wallet would need per-wallet
//! locking to protect the balance invariant.

use std::sync::Arc;

use tracing::{error, info};

use super::processor::WithdrawalProcessor;
use crate::error::PayoutError;

/// Aggregate result of one batch run; `processed == succeeded + failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchStats {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct BatchRunner {
    processor: Arc<WithdrawalProcessor>,
}

impl BatchRunner {
    pub fn new(processor: Arc<WithdrawalProcessor>) -> Self {
        Self { processor }
    }

    /// Process all pending withdrawals once, in creation order.
    ///
    /// One withdrawal's failure never aborts the rest - each item is
    /// isolated and only counted.
    pub async fn process_all_pending(&self) -> Result<BatchStats, PayoutError> {
        let pending = self.processor.store().find_pending().await?;

        if pending.is_empty() {
            info!("No pending withdrawals");
            return Ok(BatchStats::default());
        }

        info!(count = pending.len(), "Processing pending withdrawals");

        let mut stats = BatchStats::default();
        for withdrawal in &pending {
            stats.processed += 1;

            match self.processor.process_withdrawal(withdrawal.id).await {
                Ok(outcome) if outcome.success => stats.succeeded += 1,
                Ok(outcome) => {
                    info!(
                        withdrawal_id = %withdrawal.id,
                        status = %outcome.status,
                        message = %outcome.message,
                        "Withdrawal did not complete"
                    );
                    stats.failed += 1;
                }
                Err(e) => {
                    error!(
                        withdrawal_id = %withdrawal.id,
                        error = %e,
                        "Withdrawal processing error"
                    );
                    stats.failed += 1;
                }
            }
        }

        info!(
            processed = stats.processed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Batch run finished"
        );

        Ok(stats)
    }
}

//! Verification Sweeper
//!
//! Resolves withdrawals parked in PENDING_VERIFICATION by re-querying the
//! provider. A parked withdrawal either completes, fails (with reversal),
//! or stays parked for a later sweep - the last case is a legitimate
//! outcome, not an error.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::processor::WithdrawalProcessor;
use super::state::WithdrawalStatus;
use super::types::{ProcessOutcome, WithdrawalRequest};
use crate::error::PayoutError;
use crate::provider::{TransferProvider, VerifyStatus};

/// Sweeper policy
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Indeterminate sweeps allowed before the withdrawal is handed to an
    /// admin for manual reconciliation and excluded from further sweeps.
    /// It is never force-failed: a forced reversal could double-pay a cook
    /// whose transfer actually settled.
    pub max_verify_attempts: u32,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            max_verify_attempts: 12,
        }
    }
}

/// Aggregate result of one sweep run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepStats {
    pub swept: usize,
    pub completed: usize,
    pub failed: usize,
    pub unresolved: usize,
}

pub struct VerificationSweeper {
    processor: Arc<WithdrawalProcessor>,
    provider: Arc<dyn TransferProvider>,
    config: SweeperConfig,
}

impl VerificationSweeper {
    pub fn new(
        processor: Arc<WithdrawalProcessor>,
        provider: Arc<dyn TransferProvider>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            processor,
            provider,
            config,
        }
    }

    pub fn with_defaults(
        processor: Arc<WithdrawalProcessor>,
        provider: Arc<dyn TransferProvider>,
    ) -> Self {
        Self::new(processor, provider, SweeperConfig::default())
    }

    /// Re-check one parked withdrawal against the provider.
    ///
    /// No-op for anything that is not PENDING_VERIFICATION (resolved by a
    /// previous sweep or a concurrent processor run) or that has no
    /// provider transfer id to query.
    pub async fn verify_pending_transfer(
        &self,
        withdrawal: &WithdrawalRequest,
    ) -> Result<ProcessOutcome, PayoutError> {
        let record = self
            .processor
            .store()
            .get(withdrawal.id)
            .await?
            .ok_or_else(|| PayoutError::WithdrawalNotFound(withdrawal.id.to_string()))?;

        if record.status != WithdrawalStatus::PendingVerification {
            debug!(
                withdrawal_id = %record.id,
                status = %record.status,
                "Not pending verification, skipping sweep"
            );
            return Ok(ProcessOutcome::already_processed(record.status));
        }

        let Some(transfer_id) = record.provider_transfer_id.clone() else {
            // Timed out before the provider assigned an id; there is
            // nothing to query, only an admin can reconcile by reference.
            warn!(
                withdrawal_id = %record.id,
                "Parked withdrawal has no provider transfer id"
            );
            return self.note_indeterminate(&record).await;
        };

        info!(
            withdrawal_id = %record.id,
            transfer_id = %transfer_id,
            attempt = record.verify_attempts + 1,
            "Verifying parked transfer"
        );

        let reply = match self.provider.verify_transfer(&transfer_id).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    withdrawal_id = %record.id,
                    error = %e,
                    "Verification transport fault, leaving parked"
                );
                return Ok(ProcessOutcome::unchanged(record.status));
            }
        };

        match reply.verify_status() {
            VerifyStatus::Successful => {
                self.processor
                    .complete(
                        &record,
                        WithdrawalStatus::PendingVerification,
                        &transfer_id,
                        reply.raw,
                    )
                    .await
            }
            VerifyStatus::Failed => {
                let reason = match &reply.outcome {
                    crate::provider::TransferOutcome::Failure { error } => error.clone(),
                    _ => "Transfer reported FAILED on verification".to_string(),
                };
                self.processor
                    .fail(
                        &record,
                        WithdrawalStatus::PendingVerification,
                        &reason,
                        reply.raw,
                    )
                    .await
            }
            VerifyStatus::Indeterminate => self.note_indeterminate(&record).await,
        }
    }

    /// Count an indeterminate sweep; escalate to an admin exactly when the
    /// cap is crossed.
    async fn note_indeterminate(
        &self,
        record: &WithdrawalRequest,
    ) -> Result<ProcessOutcome, PayoutError> {
        let attempts = self
            .processor
            .store()
            .increment_verify_attempts(record.id)
            .await?;

        if attempts == self.config.max_verify_attempts {
            warn!(
                withdrawal_id = %record.id,
                attempts,
                "Verification cap reached, escalating to admin"
            );
            // Status stays PENDING_VERIFICATION; the cap filter excludes it
            // from future sweeps.
            self.processor
                .notifier()
                .notify_admin_manual_action(
                    record,
                    "Transfer unresolved after repeated verification sweeps",
                )
                .await;
        }

        Ok(ProcessOutcome::unchanged(record.status))
    }

    /// Sweep every parked withdrawal under the attempt cap once
    pub async fn sweep_all(&self) -> Result<SweepStats, PayoutError> {
        let parked = self
            .processor
            .store()
            .find_pending_verification(self.config.max_verify_attempts)
            .await?;

        if parked.is_empty() {
            debug!("No withdrawals pending verification");
            return Ok(SweepStats::default());
        }

        info!(count = parked.len(), "Sweeping parked withdrawals");

        let mut stats = SweepStats::default();
        for withdrawal in &parked {
            stats.swept += 1;

            match self.verify_pending_transfer(withdrawal).await {
                Ok(outcome) => match outcome.status {
                    WithdrawalStatus::Completed => stats.completed += 1,
                    WithdrawalStatus::Failed => stats.failed += 1,
                    _ => stats.unresolved += 1,
                },
                Err(e) => {
                    error!(
                        withdrawal_id = %withdrawal.id,
                        error = %e,
                        "Sweep error"
                    );
                    stats.unresolved += 1;
                }
            }
        }

        info!(
            swept = stats.swept,
            completed = stats.completed,
            failed = stats.failed,
            unresolved = stats.unresolved,
            "Sweep finished"
        );

        Ok(stats)
    }
}

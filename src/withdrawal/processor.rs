//! Withdrawal Processor
//!
//! Drives exactly one withdrawal from PENDING to a terminal or parked
//! state: one provider call, then reconciliation of the wallet ledger,
//! the manual queue and notifications.
//!
//! # Safety Invariants
//!
//! 1. **Claim-before-call**: the PENDING -> PROCESSING CAS must win before
//!    the provider is contacted. A lost CAS means someone else owns the
//!    request; return the benign "already processed" outcome with zero
//!    side effects.
//! 2. **Never reverse on timeout**: an unknown outcome keeps funds
//!    reserved until the verification sweeper resolves it.
//! 3. **Exactly-one reversal**: the FAILED CAS gates the wallet credit and
//!    the manual task, so retries can never double-restore funds.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::state::WithdrawalStatus;
use super::store::WithdrawalStore;
use super::types::{ProcessOutcome, WithdrawalId, WithdrawalRequest, payout_reference};
use crate::error::PayoutError;
use crate::manual::{ManualPayoutQueue, ManualPayoutTask};
use crate::notify::NotificationDispatcher;
use crate::provider::{TransferOutcome, TransferProvider};
use crate::wallet::WalletLedger;

const DEFAULT_FAILURE_REASON: &str = "Transfer failed at provider";

pub struct WithdrawalProcessor {
    store: Arc<dyn WithdrawalStore>,
    ledger: Arc<dyn WalletLedger>,
    provider: Arc<dyn TransferProvider>,
    manual_queue: Arc<dyn ManualPayoutQueue>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl WithdrawalProcessor {
    pub fn new(
        store: Arc<dyn WithdrawalStore>,
        ledger: Arc<dyn WalletLedger>,
        provider: Arc<dyn TransferProvider>,
        manual_queue: Arc<dyn ManualPayoutQueue>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            ledger,
            provider,
            manual_queue,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<dyn WithdrawalStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationDispatcher> {
        &self.notifier
    }

    /// Process one withdrawal end to end
    ///
    /// Safe to invoke any number of times for the same request: only the
    /// caller that wins the PENDING -> PROCESSING claim performs side
    /// effects.
    pub async fn process_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<ProcessOutcome, PayoutError> {
        let mut record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| PayoutError::WithdrawalNotFound(id.to_string()))?;

        if record.status != WithdrawalStatus::Pending {
            debug!(
                withdrawal_id = %id,
                status = %record.status,
                "Withdrawal already processed, skipping"
            );
            return Ok(ProcessOutcome::already_processed(record.status));
        }

        // Claim the request. Losing here means a concurrent caller owns it.
        if !self
            .store
            .update_status_if(id, WithdrawalStatus::Pending, WithdrawalStatus::Processing)
            .await?
        {
            let status = match self.store.get(id).await? {
                Some(r) => r.status,
                None => {
                    error!(
                        withdrawal_id = %id,
                        "Withdrawal not found after CAS failure (data corruption?)"
                    );
                    return Err(PayoutError::WithdrawalNotFound(id.to_string()));
                }
            };
            return Ok(ProcessOutcome::already_processed(status));
        }

        // The provider requires a reference at initiation; generate it now
        // so a timeout still leaves us something to reconcile against.
        if record.provider_reference.is_none() {
            record.provider_reference = Some(payout_reference(record.wallet_id));
        }
        record.status = WithdrawalStatus::Processing;

        info!(
            withdrawal_id = %id,
            cook_id = record.cook_id,
            amount = record.amount,
            provider = %record.provider,
            reference = record.provider_reference.as_deref().unwrap_or(""),
            "Initiating payout transfer"
        );

        let reply = match self.provider.initiate_transfer(&record).await {
            Ok(reply) => reply,
            Err(e) => {
                // No reply was obtained; nothing may have happened
                // provider-side, nothing happened on ours. Release the
                // claim so a later run retries safely.
                warn!(
                    withdrawal_id = %id,
                    error = %e,
                    "Provider transport fault, releasing claim for retry"
                );
                if !self
                    .store
                    .update_status_if(id, WithdrawalStatus::Processing, WithdrawalStatus::Pending)
                    .await?
                {
                    error!(
                        withdrawal_id = %id,
                        "Could not release claim after transport fault"
                    );
                }
                return Ok(ProcessOutcome::retryable(format!(
                    "Provider unreachable: {}",
                    e
                )));
            }
        };

        match reply.outcome.clone() {
            TransferOutcome::Success { transfer_id, .. } => {
                self.complete(&record, WithdrawalStatus::Processing, &transfer_id, reply.raw)
                    .await
            }
            TransferOutcome::Timeout { transfer_id } => {
                self.park(&record, transfer_id.as_deref(), reply.raw).await
            }
            TransferOutcome::Failure { error } => {
                self.fail(&record, WithdrawalStatus::Processing, &error, reply.raw)
                    .await
            }
        }
    }

    /// Transition to COMPLETED: record provider identifiers, notify the
    /// cook. Balances are untouched - the amount was reserved at request
    /// time and the confirmed transfer consumes that reservation.
    pub(crate) async fn complete(
        &self,
        record: &WithdrawalRequest,
        expected: WithdrawalStatus,
        transfer_id: &str,
        raw: Option<serde_json::Value>,
    ) -> Result<ProcessOutcome, PayoutError> {
        let reference = record
            .provider_reference
            .clone()
            .unwrap_or_else(|| payout_reference(record.wallet_id));

        if !self
            .store
            .mark_completed(record.id, expected, transfer_id, &reference, raw.as_ref())
            .await?
        {
            return self.lost_resolution_race(record.id).await;
        }

        info!(
            withdrawal_id = %record.id,
            transfer_id,
            amount = record.amount,
            "Payout transfer completed"
        );

        self.notifier
            .notify_cook_withdrawal_result(record, true)
            .await;

        Ok(ProcessOutcome::completed())
    }

    /// Park in PENDING_VERIFICATION after a timeout. Funds stay reserved;
    /// no notification goes out until the sweeper resolves the outcome.
    async fn park(
        &self,
        record: &WithdrawalRequest,
        transfer_id: Option<&str>,
        raw: Option<serde_json::Value>,
    ) -> Result<ProcessOutcome, PayoutError> {
        let reference = record
            .provider_reference
            .clone()
            .unwrap_or_else(|| payout_reference(record.wallet_id));

        if !self
            .store
            .mark_pending_verification(record.id, transfer_id, &reference, raw.as_ref())
            .await?
        {
            return self.lost_resolution_race(record.id).await;
        }

        info!(
            withdrawal_id = %record.id,
            transfer_id = transfer_id.unwrap_or("<none>"),
            "Transfer timed out, parked for verification"
        );

        Ok(ProcessOutcome::parked())
    }

    /// Transition to FAILED: restore the reservation with exactly one
    /// reversal ledger entry, queue exactly one manual payout task, notify
    /// cook and admin.
    pub(crate) async fn fail(
        &self,
        record: &WithdrawalRequest,
        expected: WithdrawalStatus,
        reason: &str,
        raw: Option<serde_json::Value>,
    ) -> Result<ProcessOutcome, PayoutError> {
        let reason = if reason.trim().is_empty() {
            DEFAULT_FAILURE_REASON
        } else {
            reason
        };

        // This CAS wins exactly once, gating the reversal and the task
        if !self
            .store
            .mark_failed(record.id, expected, reason, raw.as_ref())
            .await?
        {
            return self.lost_resolution_race(record.id).await;
        }

        let description = format!("Withdrawal reversal of {}", record.amount);
        match self
            .ledger
            .credit_withdrawable(record.wallet_id, record.amount, &description)
            .await
        {
            Ok(_) => {
                info!(
                    withdrawal_id = %record.id,
                    wallet_id = record.wallet_id,
                    amount = record.amount,
                    "Reservation restored to withdrawable balance"
                );
            }
            Err(e) => {
                // The withdrawal is FAILED but the cook is still short.
                // Surface loudly; the manual task below carries the amount
                // so operators can reconcile by hand.
                error!(
                    withdrawal_id = %record.id,
                    wallet_id = record.wallet_id,
                    amount = record.amount,
                    error = %e,
                    "Balance reversal failed after transfer failure"
                );
            }
        }

        self.manual_queue
            .push(ManualPayoutTask::from_failed_withdrawal(record, reason))
            .await?;

        info!(
            withdrawal_id = %record.id,
            reason,
            "Payout transfer failed, manual task queued"
        );

        self.notifier
            .notify_cook_withdrawal_result(record, false)
            .await;
        self.notifier
            .notify_admin_manual_action(record, reason)
            .await;

        Ok(ProcessOutcome::failed(reason))
    }

    /// A concurrent caller resolved the withdrawal between our claim and
    /// our resolution write. Report its status without side effects.
    async fn lost_resolution_race(
        &self,
        id: WithdrawalId,
    ) -> Result<ProcessOutcome, PayoutError> {
        let status = self
            .store
            .get(id)
            .await?
            .map(|r| r.status)
            .ok_or_else(|| PayoutError::WithdrawalNotFound(id.to_string()))?;
        debug!(withdrawal_id = %id, status = %status, "Lost resolution race");
        Ok(ProcessOutcome::already_processed(status))
    }
}

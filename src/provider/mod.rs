//! Transfer Provider Boundary
//!
//! The engine talks to the mobile-money transfer API through the
//! [`TransferProvider`] trait. A timeout is a *reply value*
//! ([`TransferOutcome::Timeout`]), never an error: the transfer may still
//! settle provider-side and the caller must park the withdrawal instead of
//! reversing it. [`ProviderError`] is reserved for transport faults where
//! no reply was obtained at all.

pub mod flutterwave;
pub mod mock;

pub use flutterwave::{FlutterwaveClient, FlutterwaveConfig, transfer_bank_code};
pub use mock::MockProvider;

use async_trait::async_trait;
use thiserror::Error;

use crate::withdrawal::WithdrawalRequest;

/// Transport-level provider faults (no reply obtained)
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// What the provider said about one transfer attempt
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// Provider accepted the transfer
    Success {
        transfer_id: String,
        provider_status: String,
    },
    /// Provider explicitly rejected the transfer (safe to reverse)
    Failure { error: String },
    /// Outcome unknown - request timed out in flight.
    /// A transfer id may be present if the timeout happened after creation.
    Timeout { transfer_id: Option<String> },
}

/// Normalized status of a verification query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    Successful,
    Failed,
    /// Provider reported a non-terminal or unknown status; sweep again later
    Indeterminate,
}

/// One provider reply, with the raw payload kept for the audit trail
#[derive(Debug, Clone)]
pub struct TransferReply {
    pub outcome: TransferOutcome,
    pub raw: Option<serde_json::Value>,
}

impl TransferReply {
    pub fn success(transfer_id: impl Into<String>, provider_status: impl Into<String>) -> Self {
        Self {
            outcome: TransferOutcome::Success {
                transfer_id: transfer_id.into(),
                provider_status: provider_status.into(),
            },
            raw: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            outcome: TransferOutcome::Failure {
                error: error.into(),
            },
            raw: None,
        }
    }

    pub fn timeout() -> Self {
        Self {
            outcome: TransferOutcome::Timeout { transfer_id: None },
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Normalize this reply for the verification sweeper.
    ///
    /// `SUCCESSFUL` and `FAILED` are the provider's terminal statuses;
    /// everything else (including a timeout on the verify call itself)
    /// stays indeterminate.
    pub fn verify_status(&self) -> VerifyStatus {
        match &self.outcome {
            TransferOutcome::Success {
                provider_status, ..
            } => match provider_status.as_str() {
                "SUCCESSFUL" => VerifyStatus::Successful,
                "FAILED" => VerifyStatus::Failed,
                _ => VerifyStatus::Indeterminate,
            },
            TransferOutcome::Failure { .. } => VerifyStatus::Failed,
            TransferOutcome::Timeout { .. } => VerifyStatus::Indeterminate,
        }
    }
}

/// Transfer provider client boundary
///
/// `initiate_transfer` must be called at most once per withdrawal attempt -
/// the processor's CAS on the withdrawal status guards this.
#[async_trait]
pub trait TransferProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Start a transfer for the given withdrawal
    async fn initiate_transfer(
        &self,
        withdrawal: &WithdrawalRequest,
    ) -> Result<TransferReply, ProviderError>;

    /// Query the status of a previously initiated transfer
    async fn verify_transfer(&self, transfer_id: &str) -> Result<TransferReply, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_status_normalization() {
        assert_eq!(
            TransferReply::success("1", "SUCCESSFUL").verify_status(),
            VerifyStatus::Successful
        );
        assert_eq!(
            TransferReply::success("1", "FAILED").verify_status(),
            VerifyStatus::Failed
        );
        assert_eq!(
            TransferReply::success("1", "NEW").verify_status(),
            VerifyStatus::Indeterminate
        );
        assert_eq!(
            TransferReply::failure("boom").verify_status(),
            VerifyStatus::Failed
        );
        assert_eq!(
            TransferReply::timeout().verify_status(),
            VerifyStatus::Indeterminate
        );
    }
}

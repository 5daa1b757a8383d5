//! Withdrawal Core Types
//!
//! Type definitions shared by the processor, sweeper and stores.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::WithdrawalStatus;

/// Withdrawal ID type - ULID-based unique identifier
///
/// Using ULID provides:
/// - Monotonic, sortable IDs
/// - No coordination needed (no machine_id)
/// - 128-bit with good entropy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WithdrawalId(ulid::Ulid);

impl WithdrawalId {
    /// Generate a new unique WithdrawalId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get the inner ULID value
    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for WithdrawalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WithdrawalId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Mobile-money provider the cook receives the payout on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobileMoneyProvider {
    MtnMomo,
    OrangeMoney,
}

impl MobileMoneyProvider {
    /// Wire name, as stored in PostgreSQL and carried on payout tasks
    pub fn as_str(&self) -> &'static str {
        match self {
            MobileMoneyProvider::MtnMomo => "mtn_momo",
            MobileMoneyProvider::OrangeMoney => "orange_money",
        }
    }

    /// Payment method name on a manual payout task.
    ///
    /// The internal enum name is passed through unchanged for Orange; MTN
    /// is spelled out for the operators' tooling.
    pub fn payment_method(&self) -> &'static str {
        match self {
            MobileMoneyProvider::MtnMomo => "mtn_mobile_money",
            MobileMoneyProvider::OrangeMoney => "orange_money",
        }
    }
}

impl fmt::Display for MobileMoneyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MobileMoneyProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mtn_momo" => Ok(MobileMoneyProvider::MtnMomo),
            "orange_money" => Ok(MobileMoneyProvider::OrangeMoney),
            other => Err(format!("unknown mobile money provider: {}", other)),
        }
    }
}

/// A cook's request to move reserved wallet funds to a mobile-money account
///
/// `amount` is fixed at creation (minor currency unit). Only `status`, the
/// provider fields and the timestamp/reason fields change as the request
/// moves through the state machine.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub wallet_id: u64,
    pub tenant_id: u64,
    pub cook_id: u64,
    pub amount: u64,
    pub provider: MobileMoneyProvider,
    pub mobile_money_number: String,
    pub status: WithdrawalStatus,
    pub provider_transfer_id: Option<String>,
    pub provider_reference: Option<String>,
    pub provider_response: Option<serde_json::Value>,
    pub failure_reason: Option<String>,
    /// Indeterminate verification sweeps seen so far
    pub verify_attempts: u32,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    /// Create a fresh PENDING request (funds already reserved upstream)
    pub fn new(
        wallet_id: u64,
        tenant_id: u64,
        cook_id: u64,
        amount: u64,
        provider: MobileMoneyProvider,
        mobile_money_number: impl Into<String>,
    ) -> Self {
        Self {
            id: WithdrawalId::new(),
            wallet_id,
            tenant_id,
            cook_id,
            amount,
            provider,
            mobile_money_number: mobile_money_number.into(),
            status: WithdrawalStatus::Pending,
            provider_transfer_id: None,
            provider_reference: None,
            provider_response: None,
            failure_reason: None,
            verify_attempts: 0,
            requested_at: Utc::now(),
            processed_at: None,
            completed_at: None,
            failed_at: None,
        }
    }
}

/// Generate a payout reference for the provider call
///
/// Format: `DMC-WD-{walletId}-{ulid}`. The ULID keeps references unique
/// across retries of different requests on the same wallet.
pub fn payout_reference(wallet_id: u64) -> String {
    format!("DMC-WD-{}-{}", wallet_id, ulid::Ulid::new())
}

/// Outcome of one processor or sweeper pass over a single withdrawal
///
/// "Already processed" is a benign short-circuit, never an error.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub success: bool,
    pub status: WithdrawalStatus,
    pub message: String,
}

impl ProcessOutcome {
    pub fn completed() -> Self {
        Self {
            success: true,
            status: WithdrawalStatus::Completed,
            message: "Transfer completed".to_string(),
        }
    }

    pub fn parked() -> Self {
        Self {
            success: false,
            status: WithdrawalStatus::PendingVerification,
            message: "Transfer timed out, parked for verification".to_string(),
        }
    }

    pub fn failed(reason: &str) -> Self {
        Self {
            success: false,
            status: WithdrawalStatus::Failed,
            message: format!("Transfer failed: {}", reason),
        }
    }

    pub fn already_processed(status: WithdrawalStatus) -> Self {
        Self {
            success: false,
            status,
            message: "This withdrawal has already been processed".to_string(),
        }
    }

    /// Provider transport fault before any reply existed; request stays
    /// PENDING so a later run can retry safely.
    pub fn retryable(message: String) -> Self {
        Self {
            success: false,
            status: WithdrawalStatus::Pending,
            message,
        }
    }

    /// No-op result for a sweep over a request that is not sweepable
    pub fn unchanged(status: WithdrawalStatus) -> Self {
        Self {
            success: false,
            status,
            message: "No state change".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdrawal_id_roundtrip() {
        let id = WithdrawalId::new();
        let parsed: WithdrawalId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_provider_wire_names() {
        assert_eq!(MobileMoneyProvider::MtnMomo.as_str(), "mtn_momo");
        assert_eq!(MobileMoneyProvider::OrangeMoney.as_str(), "orange_money");

        let p: MobileMoneyProvider = "mtn_momo".parse().unwrap();
        assert_eq!(p, MobileMoneyProvider::MtnMomo);
        assert!("airtel".parse::<MobileMoneyProvider>().is_err());
    }

    #[test]
    fn test_payment_method_mapping() {
        assert_eq!(
            MobileMoneyProvider::MtnMomo.payment_method(),
            "mtn_mobile_money"
        );
        assert_eq!(
            MobileMoneyProvider::OrangeMoney.payment_method(),
            "orange_money"
        );
    }

    #[test]
    fn test_payout_reference_format() {
        let r = payout_reference(42);
        assert!(r.starts_with("DMC-WD-42-"));
        assert_ne!(payout_reference(42), payout_reference(42));
    }

    #[test]
    fn test_new_request_is_pending() {
        let w = WithdrawalRequest::new(1, 2, 3, 20_000, MobileMoneyProvider::MtnMomo, "677000111");
        assert_eq!(w.status, WithdrawalStatus::Pending);
        assert_eq!(w.amount, 20_000);
        assert!(w.provider_transfer_id.is_none());
        assert_eq!(w.verify_attempts, 0);
    }
}

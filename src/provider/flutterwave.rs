//! Flutterwave Transfer Client
//!
//! Thin JSON client over the Flutterwave v3 transfers API. Credentials and
//! endpoints live in an immutable [`FlutterwaveConfig`] injected at
//! construction. The bank-code table is colocated here because it is
//! specific to this provider's API contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ProviderError, TransferProvider, TransferReply};
use crate::withdrawal::{MobileMoneyProvider, WithdrawalRequest};

/// Flutterwave's bank code for a mobile-money network
///
/// Anything unmapped falls back to the MTN code.
pub fn transfer_bank_code(provider: MobileMoneyProvider) -> &'static str {
    match provider {
        MobileMoneyProvider::MtnMomo => "MPS",
        MobileMoneyProvider::OrangeMoney => "FMM",
    }
}

/// Immutable client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlutterwaveConfig {
    pub base_url: String,
    pub secret_key: String,
    pub currency: String,
    /// Per-request timeout in seconds; a hit maps to `TransferOutcome::Timeout`
    pub timeout_secs: u64,
}

impl Default for FlutterwaveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.flutterwave.com/v3".to_string(),
            secret_key: String::new(),
            currency: "XAF".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Transfer creation request body
#[derive(Serialize)]
struct CreateTransferBody<'a> {
    account_bank: &'static str,
    account_number: &'a str,
    amount: u64,
    currency: &'a str,
    reference: &'a str,
    narration: String,
}

/// Envelope shared by the create and verify endpoints
#[derive(Deserialize, Debug)]
struct FwEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<FwTransferData>,
}

#[derive(Deserialize, Debug)]
struct FwTransferData {
    id: i64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    reference: Option<String>,
}

pub struct FlutterwaveClient {
    config: FlutterwaveConfig,
    client: reqwest::Client,
}

impl FlutterwaveClient {
    pub fn new(config: FlutterwaveConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Map an envelope into a reply, keeping the raw payload for audit
    fn reply_from_envelope(envelope: FwEnvelope, raw: serde_json::Value) -> TransferReply {
        if envelope.status == "success"
            && let Some(data) = &envelope.data
        {
            let provider_status = data.status.clone().unwrap_or_else(|| "NEW".to_string());
            return TransferReply::success(data.id.to_string(), provider_status).with_raw(raw);
        }

        let error = envelope
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Transfer rejected by provider".to_string());
        TransferReply::failure(error).with_raw(raw)
    }

    async fn parse_response(
        &self,
        response: reqwest::Response,
    ) -> Result<TransferReply, ProviderError> {
        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let envelope: FwEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(Self::reply_from_envelope(envelope, raw))
    }
}

#[async_trait]
impl TransferProvider for FlutterwaveClient {
    fn name(&self) -> &'static str {
        "flutterwave"
    }

    async fn initiate_transfer(
        &self,
        withdrawal: &WithdrawalRequest,
    ) -> Result<TransferReply, ProviderError> {
        let reference = withdrawal
            .provider_reference
            .as_deref()
            .unwrap_or_default();

        let body = CreateTransferBody {
            account_bank: transfer_bank_code(withdrawal.provider),
            account_number: &withdrawal.mobile_money_number,
            amount: withdrawal.amount,
            currency: &self.config.currency,
            reference,
            narration: format!("Cook payout {}", withdrawal.id),
        };

        debug!(
            withdrawal_id = %withdrawal.id,
            bank_code = body.account_bank,
            amount = withdrawal.amount,
            "Initiating Flutterwave transfer"
        );

        let result = self
            .client
            .post(format!("{}/transfers", self.config.base_url))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) => self.parse_response(response).await,
            Err(e) if e.is_timeout() => {
                warn!(
                    withdrawal_id = %withdrawal.id,
                    "Flutterwave transfer request timed out"
                );
                Ok(TransferReply::timeout())
            }
            Err(e) => Err(ProviderError::Transport(e.to_string())),
        }
    }

    async fn verify_transfer(&self, transfer_id: &str) -> Result<TransferReply, ProviderError> {
        let result = self
            .client
            .get(format!(
                "{}/transfers/{}",
                self.config.base_url, transfer_id
            ))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await;

        match result {
            Ok(response) => self.parse_response(response).await,
            Err(e) if e.is_timeout() => Ok(TransferReply::timeout()),
            Err(e) => Err(ProviderError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{TransferOutcome, VerifyStatus};

    #[test]
    fn test_bank_code_table() {
        assert_eq!(transfer_bank_code(MobileMoneyProvider::MtnMomo), "MPS");
        assert_eq!(transfer_bank_code(MobileMoneyProvider::OrangeMoney), "FMM");
    }

    #[test]
    fn test_success_envelope() {
        let raw = serde_json::json!({
            "status": "success",
            "message": "Transfer Queued Successfully",
            "data": { "id": 123456, "status": "SUCCESSFUL", "reference": "DMC-WD-1-X" }
        });
        let envelope: FwEnvelope = serde_json::from_value(raw.clone()).unwrap();
        let reply = FlutterwaveClient::reply_from_envelope(envelope, raw);

        match &reply.outcome {
            TransferOutcome::Success {
                transfer_id,
                provider_status,
            } => {
                assert_eq!(transfer_id, "123456");
                assert_eq!(provider_status, "SUCCESSFUL");
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(reply.verify_status(), VerifyStatus::Successful);
        assert!(reply.raw.is_some());
    }

    #[test]
    fn test_error_envelope() {
        let raw = serde_json::json!({
            "status": "error",
            "message": "Invalid recipient",
            "data": null
        });
        let envelope: FwEnvelope = serde_json::from_value(raw.clone()).unwrap();
        let reply = FlutterwaveClient::reply_from_envelope(envelope, raw);

        match &reply.outcome {
            TransferOutcome::Failure { error } => assert_eq!(error, "Invalid recipient"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_error_envelope_without_message_gets_default() {
        let raw = serde_json::json!({ "status": "error", "message": "" });
        let envelope: FwEnvelope = serde_json::from_value(raw.clone()).unwrap();
        let reply = FlutterwaveClient::reply_from_envelope(envelope, raw);

        match &reply.outcome {
            TransferOutcome::Failure { error } => {
                assert_eq!(error, "Transfer rejected by provider")
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_queued_transfer_is_indeterminate_for_verification() {
        let raw = serde_json::json!({
            "status": "success",
            "data": { "id": 9, "status": "NEW" }
        });
        let envelope: FwEnvelope = serde_json::from_value(raw.clone()).unwrap();
        let reply = FlutterwaveClient::reply_from_envelope(envelope, raw);
        assert_eq!(reply.verify_status(), VerifyStatus::Indeterminate);
    }
}

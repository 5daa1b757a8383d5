//! PostgreSQL Withdrawal Store
//!
//! Every CAS transition is a single `UPDATE ... WHERE status = $expected`
//! statement, so the idempotency guard is atomic at the row level.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::state::WithdrawalStatus;
use super::store::WithdrawalStore;
use super::types::{WithdrawalId, WithdrawalRequest};
use crate::error::StoreError;

pub struct PgWithdrawalStore {
    pool: PgPool,
}

impl PgWithdrawalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<WithdrawalRequest, StoreError> {
        let id: String = row.try_get("withdrawal_id")?;
        let id = id
            .parse::<WithdrawalId>()
            .map_err(|e| StoreError::Corrupt(format!("bad withdrawal_id {}: {}", id, e)))?;

        let status_id: i16 = row.try_get("status")?;
        let status = WithdrawalStatus::from_id(status_id)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status id {}", status_id)))?;

        let provider: String = row.try_get("provider")?;
        let provider = provider
            .parse()
            .map_err(|e: String| StoreError::Corrupt(e))?;

        Ok(WithdrawalRequest {
            id,
            wallet_id: row.try_get::<i64, _>("wallet_id")? as u64,
            tenant_id: row.try_get::<i64, _>("tenant_id")? as u64,
            cook_id: row.try_get::<i64, _>("cook_id")? as u64,
            amount: row.try_get::<i64, _>("amount")? as u64,
            provider,
            mobile_money_number: row.try_get("mobile_money_number")?,
            status,
            provider_transfer_id: row.try_get("provider_transfer_id")?,
            provider_reference: row.try_get("provider_reference")?,
            provider_response: row.try_get("provider_response")?,
            failure_reason: row.try_get("failure_reason")?,
            verify_attempts: row.try_get::<i32, _>("verify_attempts")? as u32,
            requested_at: row.try_get("requested_at")?,
            processed_at: row.try_get("processed_at")?,
            completed_at: row.try_get("completed_at")?,
            failed_at: row.try_get("failed_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = "withdrawal_id, wallet_id, tenant_id, cook_id, amount, provider, \
     mobile_money_number, status, provider_transfer_id, provider_reference, \
     provider_response, failure_reason, verify_attempts, requested_at, \
     processed_at, completed_at, failed_at";

#[async_trait]
impl WithdrawalStore for PgWithdrawalStore {
    async fn insert(&self, withdrawal: &WithdrawalRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO withdrawal_requests_tb
                (withdrawal_id, wallet_id, tenant_id, cook_id, amount, provider,
                 mobile_money_number, status, verify_attempts, requested_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9)
            "#,
        )
        .bind(withdrawal.id.to_string())
        .bind(withdrawal.wallet_id as i64)
        .bind(withdrawal.tenant_id as i64)
        .bind(withdrawal.cook_id as i64)
        .bind(withdrawal.amount as i64)
        .bind(withdrawal.provider.as_str())
        .bind(&withdrawal.mobile_money_number)
        .bind(withdrawal.status.id())
        .bind(withdrawal.requested_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM withdrawal_requests_tb WHERE withdrawal_id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_pending(&self) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM withdrawal_requests_tb WHERE status = $1 ORDER BY withdrawal_id",
            SELECT_COLUMNS
        ))
        .bind(WithdrawalStatus::Pending.id())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn find_pending_verification(
        &self,
        max_attempts: u32,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM withdrawal_requests_tb \
             WHERE status = $1 AND verify_attempts < $2 ORDER BY withdrawal_id",
            SELECT_COLUMNS
        ))
        .bind(WithdrawalStatus::PendingVerification.id())
        .bind(max_attempts as i32)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn update_status_if(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE withdrawal_requests_tb SET status = $1, updated_at = NOW() \
             WHERE withdrawal_id = $2 AND status = $3",
        )
        .bind(next.id())
        .bind(id.to_string())
        .bind(expected.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_completed(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        transfer_id: &str,
        reference: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawal_requests_tb
            SET status = $1,
                provider_transfer_id = $2,
                provider_reference = COALESCE(provider_reference, $3),
                provider_response = $4,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE withdrawal_id = $5 AND status = $6
            "#,
        )
        .bind(WithdrawalStatus::Completed.id())
        .bind(transfer_id)
        .bind(reference)
        .bind(payload)
        .bind(id.to_string())
        .bind(expected.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_pending_verification(
        &self,
        id: WithdrawalId,
        transfer_id: Option<&str>,
        reference: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawal_requests_tb
            SET status = $1,
                provider_transfer_id = COALESCE($2, provider_transfer_id),
                provider_reference = COALESCE(provider_reference, $3),
                provider_response = $4,
                processed_at = NOW(),
                updated_at = NOW()
            WHERE withdrawal_id = $5 AND status = $6
            "#,
        )
        .bind(WithdrawalStatus::PendingVerification.id())
        .bind(transfer_id)
        .bind(reference)
        .bind(payload)
        .bind(id.to_string())
        .bind(WithdrawalStatus::Processing.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        reason: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawal_requests_tb
            SET status = $1,
                failure_reason = $2,
                provider_response = COALESCE($3, provider_response),
                failed_at = NOW(),
                updated_at = NOW()
            WHERE withdrawal_id = $4 AND status = $5
            "#,
        )
        .bind(WithdrawalStatus::Failed.id())
        .bind(reason)
        .bind(payload)
        .bind(id.to_string())
        .bind(expected.id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_verify_attempts(&self, id: WithdrawalId) -> Result<u32, StoreError> {
        let attempts = sqlx::query_scalar::<_, i32>(
            "UPDATE withdrawal_requests_tb \
             SET verify_attempts = verify_attempts + 1, updated_at = NOW() \
             WHERE withdrawal_id = $1 \
             RETURNING verify_attempts",
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(attempts as u32)
    }
}

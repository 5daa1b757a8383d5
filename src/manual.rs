//! Manual Payout Queue
//!
//! Fallback work items for human operators when automated transfer fails
//! permanently. The processor creates exactly one task per failed
//! withdrawal; timeouts never produce a task (they park in
//! PENDING_VERIFICATION instead).

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::StoreError;
use crate::withdrawal::WithdrawalRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualTaskStatus {
    Pending,
    InProgress,
    Done,
}

impl ManualTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManualTaskStatus::Pending => "pending",
            ManualTaskStatus::InProgress => "in_progress",
            ManualTaskStatus::Done => "done",
        }
    }
}

/// Human-actionable payout work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPayoutTask {
    pub withdrawal_id: String,
    pub cook_id: u64,
    pub tenant_id: u64,
    pub amount: u64,
    pub payment_method: String,
    pub mobile_money_number: String,
    pub status: ManualTaskStatus,
    pub failure_reason: String,
    pub created_at: DateTime<Utc>,
}

impl ManualPayoutTask {
    /// Build a task from a permanently-failed withdrawal
    pub fn from_failed_withdrawal(withdrawal: &WithdrawalRequest, reason: &str) -> Self {
        Self {
            withdrawal_id: withdrawal.id.to_string(),
            cook_id: withdrawal.cook_id,
            tenant_id: withdrawal.tenant_id,
            amount: withdrawal.amount,
            payment_method: withdrawal.provider.payment_method().to_string(),
            mobile_money_number: withdrawal.mobile_money_number.clone(),
            status: ManualTaskStatus::Pending,
            failure_reason: reason.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Queue boundary - push-only from the engine's perspective
#[async_trait]
pub trait ManualPayoutQueue: Send + Sync {
    async fn push(&self, task: ManualPayoutTask) -> Result<(), StoreError>;
}

/// In-memory queue for tests and mock-mode runs
#[derive(Default)]
pub struct MemManualQueue {
    tasks: Mutex<Vec<ManualPayoutTask>>,
}

impl MemManualQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<ManualPayoutTask> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ManualPayoutQueue for MemManualQueue {
    async fn push(&self, task: ManualPayoutTask) -> Result<(), StoreError> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}

/// PostgreSQL-backed queue
pub struct PgManualQueue {
    pool: PgPool,
}

impl PgManualQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ManualPayoutQueue for PgManualQueue {
    async fn push(&self, task: ManualPayoutTask) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO manual_payout_tasks_tb
                (withdrawal_id, cook_id, tenant_id, amount, payment_method,
                 mobile_money_number, status, failure_reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (withdrawal_id) DO NOTHING
            "#,
        )
        .bind(&task.withdrawal_id)
        .bind(task.cook_id as i64)
        .bind(task.tenant_id as i64)
        .bind(task.amount as i64)
        .bind(&task.payment_method)
        .bind(&task.mobile_money_number)
        .bind(task.status.as_str())
        .bind(&task.failure_reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::withdrawal::MobileMoneyProvider;

    #[test]
    fn test_task_from_failed_withdrawal() {
        let w = WithdrawalRequest::new(1, 2, 3, 20_000, MobileMoneyProvider::MtnMomo, "677000111");
        let task = ManualPayoutTask::from_failed_withdrawal(&w, "Invalid recipient");

        assert_eq!(task.amount, 20_000);
        assert_eq!(task.payment_method, "mtn_mobile_money");
        assert_eq!(task.mobile_money_number, "677000111");
        assert_eq!(task.status, ManualTaskStatus::Pending);
        assert_eq!(task.failure_reason, "Invalid recipient");
    }

    #[tokio::test]
    async fn test_mem_queue_push() {
        let q = MemManualQueue::new();
        let w = WithdrawalRequest::new(1, 2, 3, 500, MobileMoneyProvider::OrangeMoney, "699");
        q.push(ManualPayoutTask::from_failed_withdrawal(&w, "x"))
            .await
            .unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q.tasks()[0].payment_method, "orange_money");
    }
}

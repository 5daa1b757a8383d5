//! Withdrawal Store Boundary
//!
//! All status transitions go through CAS-style operations: the store applies
//! a mutation only if the record is still in the expected status, and
//! reports whether the transition won. That check is the engine's sole
//! duplicate-invocation guard, so every implementation must make it atomic.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::state::WithdrawalStatus;
use super::types::{WithdrawalId, WithdrawalRequest};
use crate::error::StoreError;

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn insert(&self, withdrawal: &WithdrawalRequest) -> Result<(), StoreError>;

    async fn get(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>, StoreError>;

    /// All PENDING withdrawals in creation order (deterministic batches)
    async fn find_pending(&self) -> Result<Vec<WithdrawalRequest>, StoreError>;

    /// PENDING_VERIFICATION withdrawals still under the sweep-attempt cap,
    /// in creation order
    async fn find_pending_verification(
        &self,
        max_attempts: u32,
    ) -> Result<Vec<WithdrawalRequest>, StoreError>;

    /// Atomic status CAS; returns whether the transition was applied
    async fn update_status_if(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
    ) -> Result<bool, StoreError>;

    /// CAS `expected -> COMPLETED`, recording provider identifiers and
    /// `completed_at`
    async fn mark_completed(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        transfer_id: &str,
        reference: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError>;

    /// CAS `PROCESSING -> PENDING_VERIFICATION`, keeping whatever partial
    /// provider identifiers exist and recording `processed_at`
    async fn mark_pending_verification(
        &self,
        id: WithdrawalId,
        transfer_id: Option<&str>,
        reference: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError>;

    /// CAS `expected -> FAILED`, recording the reason and `failed_at`
    async fn mark_failed(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        reason: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError>;

    /// Bump the indeterminate-sweep counter; returns the new count
    async fn increment_verify_attempts(&self, id: WithdrawalId) -> Result<u32, StoreError>;
}

/// In-memory store for tests and mock-mode runs
///
/// Keyed by the ULID string, so iteration order is creation order.
#[derive(Default)]
pub struct MemWithdrawalStore {
    records: Mutex<BTreeMap<String, WithdrawalRequest>>,
}

impl MemWithdrawalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutate<F>(&self, id: WithdrawalId, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut WithdrawalRequest) -> bool,
    {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id.to_string()) {
            Some(record) => Ok(f(record)),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl WithdrawalStore for MemWithdrawalStore {
    async fn insert(&self, withdrawal: &WithdrawalRequest) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap()
            .insert(withdrawal.id.to_string(), withdrawal.clone());
        Ok(())
    }

    async fn get(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>, StoreError> {
        Ok(self.records.lock().unwrap().get(&id.to_string()).cloned())
    }

    async fn find_pending(&self) -> Result<Vec<WithdrawalRequest>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .cloned()
            .collect())
    }

    async fn find_pending_verification(
        &self,
        max_attempts: u32,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|w| {
                w.status == WithdrawalStatus::PendingVerification
                    && w.verify_attempts < max_attempts
            })
            .cloned()
            .collect())
    }

    async fn update_status_if(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
    ) -> Result<bool, StoreError> {
        self.mutate(id, |w| {
            if w.status != expected {
                return false;
            }
            w.status = next;
            true
        })
    }

    async fn mark_completed(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        transfer_id: &str,
        reference: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError> {
        self.mutate(id, |w| {
            if w.status != expected {
                return false;
            }
            w.status = WithdrawalStatus::Completed;
            w.provider_transfer_id = Some(transfer_id.to_string());
            if w.provider_reference.is_none() {
                w.provider_reference = Some(reference.to_string());
            }
            w.provider_response = payload.cloned();
            w.completed_at = Some(Utc::now());
            true
        })
    }

    async fn mark_pending_verification(
        &self,
        id: WithdrawalId,
        transfer_id: Option<&str>,
        reference: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError> {
        self.mutate(id, |w| {
            if w.status != WithdrawalStatus::Processing {
                return false;
            }
            w.status = WithdrawalStatus::PendingVerification;
            if let Some(tid) = transfer_id {
                w.provider_transfer_id = Some(tid.to_string());
            }
            if w.provider_reference.is_none() {
                w.provider_reference = Some(reference.to_string());
            }
            w.provider_response = payload.cloned();
            w.processed_at = Some(Utc::now());
            true
        })
    }

    async fn mark_failed(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
        reason: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, StoreError> {
        self.mutate(id, |w| {
            if w.status != expected {
                return false;
            }
            w.status = WithdrawalStatus::Failed;
            w.failure_reason = Some(reason.to_string());
            if payload.is_some() {
                w.provider_response = payload.cloned();
            }
            w.failed_at = Some(Utc::now());
            true
        })
    }

    async fn increment_verify_attempts(&self, id: WithdrawalId) -> Result<u32, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id.to_string())
            .ok_or_else(|| StoreError::Corrupt(format!("withdrawal {} not found", id)))?;
        record.verify_attempts += 1;
        Ok(record.verify_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::withdrawal::MobileMoneyProvider;

    fn request() -> WithdrawalRequest {
        WithdrawalRequest::new(1, 2, 3, 20_000, MobileMoneyProvider::MtnMomo, "677000111")
    }

    #[tokio::test]
    async fn test_cas_wins_once() {
        let store = MemWithdrawalStore::new();
        let w = request();
        store.insert(&w).await.unwrap();

        assert!(
            store
                .update_status_if(w.id, WithdrawalStatus::Pending, WithdrawalStatus::Processing)
                .await
                .unwrap()
        );
        // Second claim loses
        assert!(
            !store
                .update_status_if(w.id, WithdrawalStatus::Pending, WithdrawalStatus::Processing)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_find_pending_is_creation_ordered() {
        let store = MemWithdrawalStore::new();
        let a = request();
        let b = request();
        // Insert out of order; ULID keys restore creation order
        store.insert(&b).await.unwrap();
        store.insert(&a).await.unwrap();

        let pending = store.find_pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, a.id);
        assert_eq!(pending[1].id, b.id);
    }

    #[tokio::test]
    async fn test_mark_completed_keeps_existing_reference() {
        let store = MemWithdrawalStore::new();
        let mut w = request();
        w.status = WithdrawalStatus::Processing;
        w.provider_reference = Some("DMC-WD-1-EXISTING".to_string());
        store.insert(&w).await.unwrap();

        assert!(
            store
                .mark_completed(w.id, WithdrawalStatus::Processing, "123", "DMC-WD-1-NEW", None)
                .await
                .unwrap()
        );
        let got = store.get(w.id).await.unwrap().unwrap();
        assert_eq!(got.provider_reference.as_deref(), Some("DMC-WD-1-EXISTING"));
        assert_eq!(got.provider_transfer_id.as_deref(), Some("123"));
        assert!(got.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_verification_cap_filter() {
        let store = MemWithdrawalStore::new();
        let mut w = request();
        w.status = WithdrawalStatus::PendingVerification;
        w.provider_transfer_id = Some("99".to_string());
        store.insert(&w).await.unwrap();

        assert_eq!(store.find_pending_verification(3).await.unwrap().len(), 1);
        for _ in 0..3 {
            store.increment_verify_attempts(w.id).await.unwrap();
        }
        assert!(store.find_pending_verification(3).await.unwrap().is_empty());
    }
}

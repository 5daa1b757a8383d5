//! Cook Wallet Ledger
//!
//! Balances are enforced to satisfy `total == withdrawable + unwithdrawable`
//! at every mutation, and every balance change is paired with exactly one
//! append-only [`WalletTransaction`] explaining it.
//!
//! The payout engine only ever *credits* a wallet (reversing a reservation
//! after a definite transfer failure). Debiting happens upstream, at
//! withdrawal-request creation time.

pub mod db;

pub use db::PgWalletLedger;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Running balances for one cook at one tenant (minor currency unit)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookWallet {
    pub wallet_id: u64,
    pub cook_id: u64,
    pub tenant_id: u64,
    pub total_balance: u64,
    pub withdrawable_balance: u64,
    pub unwithdrawable_balance: u64,
    pub currency: String,
}

impl CookWallet {
    /// Credit the withdrawable pool, keeping the balance invariant
    pub fn credit_withdrawable(&mut self, amount: u64) {
        self.withdrawable_balance += amount;
        self.total_balance += amount;
        debug_assert_eq!(
            self.total_balance,
            self.withdrawable_balance + self.unwithdrawable_balance
        );
    }

    /// Balance invariant check, used by tests and store sanity checks
    pub fn is_consistent(&self) -> bool {
        self.total_balance == self.withdrawable_balance + self.unwithdrawable_balance
    }
}

/// Ledger entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Withdrawal,
    /// Reversal marker for a restored reservation
    Refund,
    OrderPayment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Refund => "refund",
            TransactionType::OrderPayment => "order_payment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "refund" => Ok(TransactionType::Refund),
            "order_payment" => Ok(TransactionType::OrderPayment),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// Immutable ledger entry - never updated or deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub wallet_id: u64,
    pub tenant_id: u64,
    pub order_id: Option<u64>,
    pub tx_type: TransactionType,
    pub amount: u64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Wallet ledger boundary consumed by the payout engine
#[async_trait]
pub trait WalletLedger: Send + Sync {
    async fn get_wallet(&self, wallet_id: u64) -> Result<Option<CookWallet>, StoreError>;

    /// Restore a reserved amount to the withdrawable pool, appending one
    /// refund-type transaction describing the reversal
    async fn credit_withdrawable(
        &self,
        wallet_id: u64,
        amount: u64,
        description: &str,
    ) -> Result<WalletTransaction, StoreError>;
}

/// In-memory ledger for tests and mock-mode runs
#[derive(Default)]
pub struct MemWalletLedger {
    wallets: Mutex<HashMap<u64, CookWallet>>,
    transactions: Mutex<Vec<WalletTransaction>>,
}

impl MemWalletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_wallet(&self, wallet: CookWallet) {
        self.wallets.lock().unwrap().insert(wallet.wallet_id, wallet);
    }

    /// All ledger entries recorded for a wallet, in append order
    pub fn transactions_for(&self, wallet_id: u64) -> Vec<WalletTransaction> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WalletLedger for MemWalletLedger {
    async fn get_wallet(&self, wallet_id: u64) -> Result<Option<CookWallet>, StoreError> {
        Ok(self.wallets.lock().unwrap().get(&wallet_id).cloned())
    }

    async fn credit_withdrawable(
        &self,
        wallet_id: u64,
        amount: u64,
        description: &str,
    ) -> Result<WalletTransaction, StoreError> {
        let mut wallets = self.wallets.lock().unwrap();
        let wallet = wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| StoreError::Corrupt(format!("wallet {} not found", wallet_id)))?;
        wallet.credit_withdrawable(amount);

        let tx = WalletTransaction {
            wallet_id,
            tenant_id: wallet.tenant_id,
            order_id: None,
            tx_type: TransactionType::Refund,
            amount,
            description: description.to_string(),
            created_at: Utc::now(),
        };
        self.transactions.lock().unwrap().push(tx.clone());
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(withdrawable: u64, unwithdrawable: u64) -> CookWallet {
        CookWallet {
            wallet_id: 1,
            cook_id: 10,
            tenant_id: 5,
            total_balance: withdrawable + unwithdrawable,
            withdrawable_balance: withdrawable,
            unwithdrawable_balance: unwithdrawable,
            currency: "XAF".to_string(),
        }
    }

    #[test]
    fn test_credit_keeps_invariant() {
        let mut w = wallet(0, 5_000);
        w.credit_withdrawable(20_000);
        assert_eq!(w.withdrawable_balance, 20_000);
        assert_eq!(w.total_balance, 25_000);
        assert!(w.is_consistent());
    }

    #[tokio::test]
    async fn test_mem_ledger_appends_one_refund_entry() {
        let ledger = MemWalletLedger::new();
        ledger.insert_wallet(wallet(0, 0));

        let tx = ledger
            .credit_withdrawable(1, 20_000, "Withdrawal reversal of 20000")
            .await
            .unwrap();
        assert_eq!(tx.tx_type, TransactionType::Refund);
        assert_eq!(tx.amount, 20_000);

        let entries = ledger.transactions_for(1);
        assert_eq!(entries.len(), 1);

        let w = ledger.get_wallet(1).await.unwrap().unwrap();
        assert_eq!(w.withdrawable_balance, 20_000);
        assert!(w.is_consistent());
    }

    #[tokio::test]
    async fn test_credit_unknown_wallet_is_error() {
        let ledger = MemWalletLedger::new();
        assert!(ledger.credit_withdrawable(99, 100, "x").await.is_err());
    }
}

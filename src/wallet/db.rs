//! PostgreSQL Wallet Ledger
//!
//! Balance mutation and ledger append happen in one transaction so the
//! "every balance change has exactly one explaining entry" invariant holds
//! even across crashes.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};

use super::{CookWallet, TransactionType, WalletLedger, WalletTransaction};
use crate::error::StoreError;

pub struct PgWalletLedger {
    pool: PgPool,
}

impl PgWalletLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_wallet(row: &sqlx::postgres::PgRow) -> Result<CookWallet, StoreError> {
        Ok(CookWallet {
            wallet_id: row.try_get::<i64, _>("wallet_id")? as u64,
            cook_id: row.try_get::<i64, _>("cook_id")? as u64,
            tenant_id: row.try_get::<i64, _>("tenant_id")? as u64,
            total_balance: row.try_get::<i64, _>("total_balance")? as u64,
            withdrawable_balance: row.try_get::<i64, _>("withdrawable_balance")? as u64,
            unwithdrawable_balance: row.try_get::<i64, _>("unwithdrawable_balance")? as u64,
            currency: row.try_get("currency")?,
        })
    }
}

#[async_trait]
impl WalletLedger for PgWalletLedger {
    async fn get_wallet(&self, wallet_id: u64) -> Result<Option<CookWallet>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT wallet_id, cook_id, tenant_id, total_balance,
                   withdrawable_balance, unwithdrawable_balance, currency
            FROM cook_wallets_tb
            WHERE wallet_id = $1
            "#,
        )
        .bind(wallet_id as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_wallet(&row)?)),
            None => Ok(None),
        }
    }

    async fn credit_withdrawable(
        &self,
        wallet_id: u64,
        amount: u64,
        description: &str,
    ) -> Result<WalletTransaction, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE cook_wallets_tb
            SET withdrawable_balance = withdrawable_balance + $1,
                total_balance = total_balance + $1,
                updated_at = NOW()
            WHERE wallet_id = $2
            RETURNING tenant_id
            "#,
        )
        .bind(amount as i64)
        .bind(wallet_id as i64)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Corrupt(format!("wallet {} not found", wallet_id)))?;

        let tenant_id = row.try_get::<i64, _>("tenant_id")? as u64;

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions_tb
                (wallet_id, tenant_id, order_id, tx_type, amount, description, created_at)
            VALUES ($1, $2, NULL, $3, $4, $5, NOW())
            "#,
        )
        .bind(wallet_id as i64)
        .bind(tenant_id as i64)
        .bind(TransactionType::Refund.as_str())
        .bind(amount as i64)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(WalletTransaction {
            wallet_id,
            tenant_id,
            order_id: None,
            tx_type: TransactionType::Refund,
            amount,
            description: description.to_string(),
            created_at: Utc::now(),
        })
    }
}

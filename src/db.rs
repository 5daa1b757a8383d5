//! Database connection management and schema bootstrap

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

const CREATE_WITHDRAWALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS withdrawal_requests_tb (
    withdrawal_id        TEXT PRIMARY KEY,
    wallet_id            BIGINT NOT NULL,
    tenant_id            BIGINT NOT NULL,
    cook_id              BIGINT NOT NULL,
    amount               BIGINT NOT NULL CHECK (amount > 0),
    provider             TEXT NOT NULL,
    mobile_money_number  TEXT NOT NULL,
    status               SMALLINT NOT NULL DEFAULT 0,
    provider_transfer_id TEXT,
    provider_reference   TEXT,
    provider_response    JSONB,
    failure_reason       TEXT,
    verify_attempts      INTEGER NOT NULL DEFAULT 0,
    requested_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    processed_at         TIMESTAMPTZ,
    completed_at         TIMESTAMPTZ,
    failed_at            TIMESTAMPTZ,
    updated_at           TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_WITHDRAWALS_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_withdrawal_requests_status
    ON withdrawal_requests_tb (status, withdrawal_id)
"#;

const CREATE_WALLETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cook_wallets_tb (
    wallet_id              BIGINT PRIMARY KEY,
    cook_id                BIGINT NOT NULL,
    tenant_id              BIGINT NOT NULL,
    total_balance          BIGINT NOT NULL DEFAULT 0 CHECK (total_balance >= 0),
    withdrawable_balance   BIGINT NOT NULL DEFAULT 0 CHECK (withdrawable_balance >= 0),
    unwithdrawable_balance BIGINT NOT NULL DEFAULT 0 CHECK (unwithdrawable_balance >= 0),
    currency               TEXT NOT NULL DEFAULT 'XAF',
    updated_at             TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (total_balance = withdrawable_balance + unwithdrawable_balance)
)
"#;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS wallet_transactions_tb (
    id          BIGSERIAL PRIMARY KEY,
    wallet_id   BIGINT NOT NULL,
    tenant_id   BIGINT NOT NULL,
    order_id    BIGINT,
    tx_type     TEXT NOT NULL,
    amount      BIGINT NOT NULL,
    description TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_MANUAL_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS manual_payout_tasks_tb (
    withdrawal_id       TEXT PRIMARY KEY,
    cook_id             BIGINT NOT NULL,
    tenant_id           BIGINT NOT NULL,
    amount              BIGINT NOT NULL,
    payment_method      TEXT NOT NULL,
    mobile_money_number TEXT NOT NULL,
    status              TEXT NOT NULL DEFAULT 'pending',
    failure_reason      TEXT NOT NULL,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Create all engine tables if they do not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Ensuring payout engine schema...");

    for statement in [
        CREATE_WITHDRAWALS_TABLE,
        CREATE_WITHDRAWALS_STATUS_INDEX,
        CREATE_WALLETS_TABLE,
        CREATE_TRANSACTIONS_TABLE,
        CREATE_MANUAL_TASKS_TABLE,
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Schema ready");
    Ok(())
}

//! Payout Engine - Cook Withdrawal Reconciliation
//!
//! Drives cook payout withdrawals out of in-platform wallets to a
//! mobile-money provider, to a terminal state, with idempotency
//! guarantees, timeout parking and balance reversal on failure.
//!
//! # Modules
//!
//! - [`withdrawal`] - the state machine: processor, batch runner, sweeper
//! - [`wallet`] - cook wallet ledger boundary (balances + transactions)
//! - [`provider`] - transfer provider boundary (Flutterwave client)
//! - [`manual`] - manual payout fallback queue
//! - [`notify`] - cook/admin notification dispatch
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`config`] / [`logging`] - YAML configuration and tracing setup

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod manual;
pub mod notify;
pub mod provider;
pub mod wallet;
pub mod withdrawal;

// Convenient re-exports at crate root
pub use error::{PayoutError, StoreError};
pub use manual::{ManualPayoutQueue, ManualPayoutTask, MemManualQueue, PgManualQueue};
pub use notify::{LogNotifier, NotificationDispatcher};
pub use provider::{
    FlutterwaveClient, FlutterwaveConfig, ProviderError, TransferOutcome, TransferProvider,
    TransferReply, VerifyStatus,
};
pub use wallet::{CookWallet, MemWalletLedger, PgWalletLedger, WalletLedger, WalletTransaction};
pub use withdrawal::{
    BatchRunner, BatchStats, MemWithdrawalStore, MobileMoneyProvider, PgWithdrawalStore,
    ProcessOutcome, SweepStats, SweeperConfig, VerificationSweeper, WithdrawalId,
    WithdrawalProcessor, WithdrawalRequest, WithdrawalStatus, WithdrawalStore,
};

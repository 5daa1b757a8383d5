//! Cook Payout Withdrawal State Machine
//!
//! Drives withdrawal requests against the mobile-money transfer provider
//! and reconciles the wallet ledger, manual queue and notifications.
//!
//! # State Machine
//!
//! ```text
//! PENDING → PROCESSING → COMPLETED
//!               ↓
//!         PENDING_VERIFICATION → COMPLETED
//!               ↓ (sweep FAILED)      ↑ (sweep SUCCESSFUL)
//!             FAILED ←────────────────┘
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Claim-Before-Call**: status CAS wins before the provider is called
//! 2. **Timeout Is Not Failure**: unknown outcomes park, never reverse
//! 3. **Exactly-One Reversal**: the FAILED CAS gates credit + manual task
//! 4. **Sequential Batches**: one wallet is never mutated by two in-flight
//!    transfers

pub mod batch;
pub mod db;
pub mod processor;
pub mod state;
pub mod store;
pub mod sweeper;
pub mod types;


// Re-exports for convenience
pub use batch::{BatchRunner, BatchStats};
pub use db::PgWithdrawalStore;
pub use processor::WithdrawalProcessor;
pub use state::WithdrawalStatus;
pub use store::{MemWithdrawalStore, WithdrawalStore};
pub use sweeper::{SweepStats, SweeperConfig, VerificationSweeper};
pub use types::{
    MobileMoneyProvider, ProcessOutcome, WithdrawalId, WithdrawalRequest, payout_reference,
};

//! Independent lifecycle tests against the public crate API
//!
//! Exercises the full scheduler-shaped flow: a batch run over several
//! cooks' withdrawals followed by verification sweeps, asserting the
//! wallet invariant and exactly-once side effects along the way.

use std::sync::Arc;

use payout_engine::{
    BatchRunner, CookWallet, MemManualQueue, MemWalletLedger, MemWithdrawalStore,
    MobileMoneyProvider, SweeperConfig, TransferReply, VerificationSweeper, WalletLedger,
    WithdrawalProcessor, WithdrawalRequest, WithdrawalStatus, WithdrawalStore,
    provider::{MockProvider, TransferOutcome},
    wallet::TransactionType,
};

struct World {
    store: Arc<MemWithdrawalStore>,
    ledger: Arc<MemWalletLedger>,
    provider: Arc<MockProvider>,
    queue: Arc<MemManualQueue>,
    processor: Arc<WithdrawalProcessor>,
}

fn world() -> World {
    let store = Arc::new(MemWithdrawalStore::new());
    let ledger = Arc::new(MemWalletLedger::new());
    let provider = Arc::new(MockProvider::new());
    let queue = Arc::new(MemManualQueue::new());
    let notifier = Arc::new(payout_engine::LogNotifier::new());

    let processor = Arc::new(WithdrawalProcessor::new(
        store.clone(),
        ledger.clone(),
        provider.clone(),
        queue.clone(),
        notifier,
    ));

    World {
        store,
        ledger,
        provider,
        queue,
        processor,
    }
}

/// Wallet as it looks after request creation: the withdrawal amount has
/// already left the withdrawable pool, only unwithdrawable funds remain.
fn reserved_wallet(wallet_id: u64) -> CookWallet {
    CookWallet {
        wallet_id,
        cook_id: wallet_id * 10,
        tenant_id: 1,
        total_balance: 1_000,
        withdrawable_balance: 0,
        unwithdrawable_balance: 1_000,
        currency: "XAF".to_string(),
    }
}

async fn insert_withdrawal(world: &World, wallet_id: u64, amount: u64) -> WithdrawalRequest {
    let w = WithdrawalRequest::new(
        wallet_id,
        1,
        wallet_id * 10,
        amount,
        MobileMoneyProvider::OrangeMoney,
        "699111222",
    );
    world.store.insert(&w).await.unwrap();
    w
}

#[tokio::test]
async fn batch_then_sweep_resolves_every_withdrawal() {
    let world = world();

    for wallet_id in 1..=3 {
        world.ledger.insert_wallet(reserved_wallet(wallet_id));
    }
    let w1 = insert_withdrawal(&world, 1, 20_000).await;
    let w2 = insert_withdrawal(&world, 2, 15_000).await;
    let w3 = insert_withdrawal(&world, 3, 8_000).await;

    // w1 succeeds, w2 fails outright, w3 times out
    world
        .provider
        .queue_initiate(Ok(TransferReply::success("101", "SUCCESSFUL")));
    world
        .provider
        .queue_initiate(Ok(TransferReply::failure("Account blocked")));
    world.provider.queue_initiate(Ok(TransferReply {
        outcome: TransferOutcome::Timeout {
            transfer_id: Some("103".to_string()),
        },
        raw: None,
    }));

    let stats = BatchRunner::new(world.processor.clone())
        .process_all_pending()
        .await
        .unwrap();
    assert_eq!((stats.processed, stats.succeeded, stats.failed), (3, 1, 2));

    assert_eq!(
        world.store.get(w1.id).await.unwrap().unwrap().status,
        WithdrawalStatus::Completed
    );
    assert_eq!(
        world.store.get(w2.id).await.unwrap().unwrap().status,
        WithdrawalStatus::Failed
    );
    assert_eq!(
        world.store.get(w3.id).await.unwrap().unwrap().status,
        WithdrawalStatus::PendingVerification
    );

    // Only the failed wallet got a reversal, and exactly one
    assert!(world.ledger.transactions_for(1).is_empty());
    let w2_txs = world.ledger.transactions_for(2);
    assert_eq!(w2_txs.len(), 1);
    assert_eq!(w2_txs[0].tx_type, TransactionType::Refund);
    assert_eq!(w2_txs[0].amount, 15_000);
    assert!(world.ledger.transactions_for(3).is_empty());
    assert_eq!(world.queue.len(), 1);

    // The parked withdrawal later verifies as settled
    world
        .provider
        .queue_verify(Ok(TransferReply::success("103", "SUCCESSFUL")));

    let sweeper = VerificationSweeper::with_defaults(
        world.processor.clone(),
        world.provider.clone(),
    );
    let sweep = sweeper.sweep_all().await.unwrap();
    assert_eq!((sweep.swept, sweep.completed), (1, 1));

    assert_eq!(
        world.store.get(w3.id).await.unwrap().unwrap().status,
        WithdrawalStatus::Completed
    );
    // Wallet 3 never saw a balance change
    assert!(world.ledger.transactions_for(3).is_empty());

    // Every wallet still satisfies total == withdrawable + unwithdrawable
    for wallet_id in 1..=3 {
        let w = world.ledger.get_wallet(wallet_id).await.unwrap().unwrap();
        assert!(w.is_consistent(), "wallet {} inconsistent", wallet_id);
    }

    // A second batch run is a no-op
    let stats = BatchRunner::new(world.processor.clone())
        .process_all_pending()
        .await
        .unwrap();
    assert_eq!(stats.processed, 0);
    assert_eq!(world.provider.initiate_count(), 3);
}

#[tokio::test]
async fn sweep_failure_path_matches_direct_failure() {
    let world = world();
    world.ledger.insert_wallet(reserved_wallet(5));
    let w = insert_withdrawal(&world, 5, 9_000).await;

    world.provider.queue_initiate(Ok(TransferReply {
        outcome: TransferOutcome::Timeout {
            transfer_id: Some("501".to_string()),
        },
        raw: None,
    }));
    world.processor.process_withdrawal(w.id).await.unwrap();

    world
        .provider
        .queue_verify(Ok(TransferReply::success("501", "FAILED")));

    let sweeper = VerificationSweeper::new(
        world.processor.clone(),
        world.provider.clone(),
        SweeperConfig {
            max_verify_attempts: 3,
        },
    );
    sweeper.sweep_all().await.unwrap();

    let record = world.store.get(w.id).await.unwrap().unwrap();
    assert_eq!(record.status, WithdrawalStatus::Failed);

    let wallet = world.ledger.get_wallet(5).await.unwrap().unwrap();
    assert_eq!(wallet.withdrawable_balance, 9_000);
    assert!(wallet.is_consistent());
    assert_eq!(world.ledger.transactions_for(5).len(), 1);
    assert_eq!(world.queue.len(), 1);
    assert_eq!(world.queue.tasks()[0].payment_method, "orange_money");

    // Re-sweeping a resolved withdrawal is a no-op
    let stats = sweeper.sweep_all().await.unwrap();
    assert_eq!(stats.swept, 0);
    assert_eq!(world.ledger.transactions_for(5).len(), 1);
}

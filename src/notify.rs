//! Notification Dispatch Boundary
//!
//! The engine never answers an end user synchronously; outcomes reach
//! cooks and admins only through this dispatcher. Delivery is best-effort:
//! a send failure is logged and never blocks a state transition.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::withdrawal::WithdrawalRequest;

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Tell the cook how their withdrawal ended
    async fn notify_cook_withdrawal_result(&self, withdrawal: &WithdrawalRequest, succeeded: bool);

    /// Ask an admin to act (manual payout, stuck verification)
    async fn notify_admin_manual_action(&self, withdrawal: &WithdrawalRequest, reason: &str);
}

/// Dispatcher that writes notifications to the structured log.
///
/// Used where no mail/push bridge is deployed; the marketplace tails these
/// entries into its own notification channels.
#[derive(Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn notify_cook_withdrawal_result(&self, withdrawal: &WithdrawalRequest, succeeded: bool) {
        info!(
            withdrawal_id = %withdrawal.id,
            cook_id = withdrawal.cook_id,
            amount = withdrawal.amount,
            succeeded,
            "Cook withdrawal notification"
        );
    }

    async fn notify_admin_manual_action(&self, withdrawal: &WithdrawalRequest, reason: &str) {
        info!(
            withdrawal_id = %withdrawal.id,
            cook_id = withdrawal.cook_id,
            amount = withdrawal.amount,
            reason,
            "Admin manual action needed"
        );
    }
}

/// Recording dispatcher for tests
#[derive(Default)]
pub struct MockNotifier {
    cook_events: Mutex<Vec<(String, bool)>>,
    admin_events: Mutex<Vec<(String, String)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cook_events(&self) -> Vec<(String, bool)> {
        self.cook_events.lock().unwrap().clone()
    }

    pub fn admin_events(&self) -> Vec<(String, String)> {
        self.admin_events.lock().unwrap().clone()
    }

    pub fn cook_count(&self) -> usize {
        self.cook_events.lock().unwrap().len()
    }

    pub fn admin_count(&self) -> usize {
        self.admin_events.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationDispatcher for MockNotifier {
    async fn notify_cook_withdrawal_result(&self, withdrawal: &WithdrawalRequest, succeeded: bool) {
        self.cook_events
            .lock()
            .unwrap()
            .push((withdrawal.id.to_string(), succeeded));
    }

    async fn notify_admin_manual_action(&self, withdrawal: &WithdrawalRequest, reason: &str) {
        self.admin_events
            .lock()
            .unwrap()
            .push((withdrawal.id.to_string(), reason.to_string()));
    }
}

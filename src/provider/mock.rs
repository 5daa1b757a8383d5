//! Scripted provider for tests and mock-mode runs
//!
//! Replies are queued ahead of time; call counts are observable so tests
//! can assert the provider was (or was not) contacted.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{ProviderError, TransferProvider, TransferReply};
use crate::withdrawal::WithdrawalRequest;

#[derive(Default)]
pub struct MockProvider {
    initiate_replies: Mutex<VecDeque<Result<TransferReply, ProviderError>>>,
    verify_replies: Mutex<VecDeque<Result<TransferReply, ProviderError>>>,
    initiate_count: AtomicUsize,
    verify_count: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_initiate(&self, reply: Result<TransferReply, ProviderError>) {
        self.initiate_replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_verify(&self, reply: Result<TransferReply, ProviderError>) {
        self.verify_replies.lock().unwrap().push_back(reply);
    }

    pub fn initiate_count(&self) -> usize {
        self.initiate_count.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn initiate_transfer(
        &self,
        _withdrawal: &WithdrawalRequest,
    ) -> Result<TransferReply, ProviderError> {
        self.initiate_count.fetch_add(1, Ordering::SeqCst);
        self.initiate_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TransferReply::success("1", "SUCCESSFUL")))
    }

    async fn verify_transfer(&self, _transfer_id: &str) -> Result<TransferReply, ProviderError> {
        self.verify_count.fetch_add(1, Ordering::SeqCst);
        self.verify_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TransferReply::success("1", "SUCCESSFUL")))
    }
}

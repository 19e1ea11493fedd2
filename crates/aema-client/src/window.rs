//! Confirmation window override

use std::sync::Arc;

use async_trait::async_trait;

use aema_core::{
    AccountInfo, Address, AemaResult, AppId, Application, CompileResponse, NodeStatus,
    PendingTransactionInfo, Round, SuggestedParams, TxId,
};

use crate::LedgerClient;

/// Wraps a client so the provided helpers wait `rounds` rounds for
/// confirmation instead of the client's own window
pub struct ConfirmationWindow<C: ?Sized> {
    rounds: u64,
    inner: Arc<C>,
}

impl<C: LedgerClient + ?Sized> ConfirmationWindow<C> {
    pub fn new(inner: Arc<C>, rounds: u64) -> Self {
        ConfirmationWindow { rounds, inner }
    }

    pub fn inner(&self) -> &Arc<C> {
        &self.inner
    }
}

#[async_trait]
impl<C: LedgerClient + ?Sized> LedgerClient for ConfirmationWindow<C> {
    async fn suggested_params(&self) -> AemaResult<SuggestedParams> {
        self.inner.suggested_params().await
    }

    async fn health_check(&self) -> AemaResult<()> {
        self.inner.health_check().await
    }

    async fn status(&self) -> AemaResult<NodeStatus> {
        self.inner.status().await
    }

    async fn status_after_block(&self, round: Round) -> AemaResult<NodeStatus> {
        self.inner.status_after_block(round).await
    }

    async fn account_information(&self, address: &Address) -> AemaResult<AccountInfo> {
        self.inner.account_information(address).await
    }

    async fn application_by_id(&self, id: AppId) -> AemaResult<Application> {
        self.inner.application_by_id(id).await
    }

    async fn submit_raw_transaction(&self, raw: &[u8]) -> AemaResult<TxId> {
        self.inner.submit_raw_transaction(raw).await
    }

    async fn pending_transaction_info(&self, tx_id: &TxId) -> AemaResult<PendingTransactionInfo> {
        self.inner.pending_transaction_info(tx_id).await
    }

    async fn compile_program(&self, source: &[u8]) -> AemaResult<CompileResponse> {
        self.inner.compile_program(source).await
    }

    fn confirmation_rounds(&self) -> u64 {
        self.rounds
    }
}

//! Ledger client capability set
//!
//! Implementors provide the primitive node calls. Transaction-level helpers
//! (execute, create, delete, store, delete globals) are provided on top of
//! them and rarely need overriding.

use async_trait::async_trait;
use bytes::Bytes;

use aema_core::{
    generate_schemas, AccountInfo, Address, AemaError, AemaResult, AppId, Application,
    CompileResponse, NodeStatus, PendingTransactionInfo, Round, SuggestedParams, TealKeyValue,
    TealValue, TxId, MAX_ARGS, MAX_KV_ARGS,
};
use aema_crypto::Account;
use aema_program::Mode;
use aema_wire::{OnCompletion, Transaction, TransactionBuilder};

use crate::wait_for_confirmation;

/// Rounds to wait for a confirmation before giving up
pub const DEFAULT_CONFIRMATION_ROUNDS: u64 = 10;

/// Access to a ledger node
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn suggested_params(&self) -> AemaResult<SuggestedParams>;

    async fn health_check(&self) -> AemaResult<()>;

    async fn status(&self) -> AemaResult<NodeStatus>;

    /// Resolves once the node has seen a round after `round`
    async fn status_after_block(&self, round: Round) -> AemaResult<NodeStatus>;

    async fn account_information(&self, address: &Address) -> AemaResult<AccountInfo>;

    async fn application_by_id(&self, id: AppId) -> AemaResult<Application>;

    async fn submit_raw_transaction(&self, raw: &[u8]) -> AemaResult<TxId>;

    async fn pending_transaction_info(&self, tx_id: &TxId) -> AemaResult<PendingTransactionInfo>;

    async fn compile_program(&self, source: &[u8]) -> AemaResult<CompileResponse>;

    /// Rounds the provided helpers wait for confirmation
    fn confirmation_rounds(&self) -> u64 {
        DEFAULT_CONFIRMATION_ROUNDS
    }

    /// Sign, submit and wait for confirmation
    async fn execute_transaction(
        &self,
        account: &Account,
        txn: Transaction,
    ) -> AemaResult<PendingTransactionInfo> {
        let signed = txn.sign(account)?;
        let tx_id = self.submit_raw_transaction(&signed.encode()).await?;
        tracing::debug!(%tx_id, "transaction submitted");
        wait_for_confirmation(self, &tx_id, self.confirmation_rounds()).await
    }

    /// Delete an application created by `account`
    async fn delete_application(&self, account: &Account, id: AppId) -> AemaResult<()> {
        let info = self.account_information(&account.address()).await?;
        if !info.created_apps.iter().any(|app| app.id == id) {
            return Err(AemaError::ApplicationNotFound(id));
        }

        let params = self.suggested_params().await?;
        let txn = TransactionBuilder::app_call(
            account.address(),
            &params,
            id,
            OnCompletion::DeleteApplication,
        )
        .build()?;
        self.execute_transaction(account, txn).await?;
        Ok(())
    }

    /// Deploy compiled programs with the oracle schema. Returns the new id
    /// and the round it was created in.
    async fn create_application(
        &self,
        account: &Account,
        approval: &[u8],
        clear: &[u8],
    ) -> AemaResult<(AppId, Round)> {
        let params = self.suggested_params().await?;
        let (local, global) = generate_schemas();
        let txn = TransactionBuilder::app_create(
            account.address(),
            &params,
            Bytes::copy_from_slice(approval),
            Bytes::copy_from_slice(clear),
            global,
            local,
        )
        .build()?;

        let info = self.execute_transaction(account, txn).await?;
        let id = info
            .application_index
            .filter(|id| !id.is_zero())
            .ok_or_else(|| AemaError::Client("confirmed create without application index".into()))?;
        Ok((id, info.confirmed_round))
    }

    /// Write up to `MAX_KV_ARGS` pairs in one call
    async fn store_globals(
        &self,
        account: &Account,
        id: AppId,
        pairs: &[TealKeyValue],
    ) -> AemaResult<()> {
        if pairs.len() > MAX_KV_ARGS {
            return Err(AemaError::TooManyArguments {
                count: pairs.len() * 2,
                max: MAX_ARGS,
            });
        }

        let mut args = Vec::with_capacity(pairs.len() * 2);
        for pair in pairs {
            let TealValue::Bytes(value) = &pair.value else {
                return Err(AemaError::InvalidWireFormat(
                    "numeric global values are not supported".into(),
                ));
            };
            args.push(Bytes::copy_from_slice(&pair.key));
            args.push(Bytes::copy_from_slice(value));
        }

        self.app_call(account, id, Mode::Put, args).await
    }

    /// Remove up to `MAX_ARGS` keys in one call
    async fn delete_globals(&self, account: &Account, id: AppId, keys: &[Vec<u8>]) -> AemaResult<()> {
        if keys.len() > MAX_ARGS {
            return Err(AemaError::TooManyArguments {
                count: keys.len(),
                max: MAX_ARGS,
            });
        }

        let args = keys.iter().map(|k| Bytes::copy_from_slice(k)).collect();
        self.app_call(account, id, Mode::Delete, args).await
    }

    /// One plain call in the given mode
    async fn app_call(
        &self,
        account: &Account,
        id: AppId,
        mode: Mode,
        args: Vec<Bytes>,
    ) -> AemaResult<()> {
        let params = self.suggested_params().await?;
        let txn = TransactionBuilder::app_call(account.address(), &params, id, OnCompletion::NoOp)
            .note(mode.as_note())
            .args(args)
            .build()?;
        self.execute_transaction(account, txn).await?;
        Ok(())
    }
}

//! Chunked mutation protocol
//!
//! Writes are split into calls that fit the program's argument ceiling:
//! up to `MAX_KV_ARGS` pairs per put call, up to `MAX_ARGS` keys per delete
//! call. Chunks are sent in order and each waits for confirmation before
//! the next one. A failed chunk stops the write; earlier chunks stay applied.

use std::future::Future;
use std::time::Duration;

use aema_client::LedgerClient;
use aema_core::{
    AemaError, AemaResult, AppId, Storage, TealKeyValue, MAX_ARGS, MAX_KEY_LEN, MAX_KEY_VALUE_LEN,
    MAX_KV_ARGS,
};
use aema_crypto::Account;

use crate::CancelToken;

/// Split entries into put chunks, keys in ascending order
pub fn chunk_pairs(entries: &Storage) -> Vec<Vec<TealKeyValue>> {
    let pairs: Vec<TealKeyValue> = entries
        .iter()
        .map(|(k, v)| TealKeyValue::bytes(k.clone(), v.clone()))
        .collect();
    pairs.chunks(MAX_KV_ARGS).map(<[_]>::to_vec).collect()
}

/// Split keys into delete chunks, order preserved
pub fn chunk_keys(keys: &[Vec<u8>]) -> Vec<&[Vec<u8>]> {
    keys.chunks(MAX_ARGS).collect()
}

/// Reject entries the ledger would refuse, before anything is sent
pub fn validate_entries(entries: &Storage) -> AemaResult<()> {
    for (key, value) in entries {
        validate_key(key)?;
        if key.len() + value.len() > MAX_KEY_VALUE_LEN {
            return Err(AemaError::EntryTooLarge(format!(
                "key plus value is {} bytes > {MAX_KEY_VALUE_LEN}",
                key.len() + value.len()
            )));
        }
    }
    Ok(())
}

pub fn validate_key(key: &[u8]) -> AemaResult<()> {
    if key.len() > MAX_KEY_LEN {
        return Err(AemaError::EntryTooLarge(format!(
            "key is {} bytes > {MAX_KEY_LEN}",
            key.len()
        )));
    }
    Ok(())
}

/// Sends chunked writes to one application
pub struct MutationBatcher<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    account: &'a Account,
    /// Budget per chunk, submission and confirmation included
    timeout: Duration,
    on_confirmed: Option<&'a (dyn Fn() + Send + Sync)>,
}

impl<'a, C: LedgerClient + ?Sized> MutationBatcher<'a, C> {
    pub fn new(client: &'a C, account: &'a Account, timeout: Duration) -> Self {
        MutationBatcher {
            client,
            account,
            timeout,
            on_confirmed: None,
        }
    }

    /// Run `f` after every confirmed chunk, including those of a write that
    /// later fails
    pub fn on_confirmed(mut self, f: &'a (dyn Fn() + Send + Sync)) -> Self {
        self.on_confirmed = Some(f);
        self
    }

    fn confirmed(&self) {
        if let Some(f) = self.on_confirmed {
            f();
        }
    }

    /// Write all entries. Returns the number of calls sent.
    pub async fn put_entries(
        &self,
        app: AppId,
        entries: &Storage,
        cancel: &CancelToken,
    ) -> AemaResult<usize> {
        validate_entries(entries)?;
        let chunks = chunk_pairs(entries);
        let total = chunks.len();

        for (i, chunk) in chunks.iter().enumerate() {
            self.run_chunk(cancel, self.client.store_globals(self.account, app, chunk))
                .await
                .map_err(|e| {
                    tracing::warn!(%app, chunk = i, total, error = %e, "put chunk failed");
                    e
                })?;
            self.confirmed();
            tracing::debug!(%app, chunk = i, total, pairs = chunk.len(), "put chunk confirmed");
        }
        Ok(total)
    }

    /// Remove all keys. Returns the number of calls sent.
    pub async fn delete_entries(
        &self,
        app: AppId,
        keys: &[Vec<u8>],
        cancel: &CancelToken,
    ) -> AemaResult<usize> {
        for key in keys {
            validate_key(key)?;
        }
        let chunks = chunk_keys(keys);
        let total = chunks.len();

        for (i, chunk) in chunks.iter().enumerate() {
            self.run_chunk(cancel, self.client.delete_globals(self.account, app, chunk))
                .await
                .map_err(|e| {
                    tracing::warn!(%app, chunk = i, total, error = %e, "delete chunk failed");
                    e
                })?;
            self.confirmed();
            tracing::debug!(%app, chunk = i, total, keys = chunk.len(), "delete chunk confirmed");
        }
        Ok(total)
    }

    async fn run_chunk<F>(&self, cancel: &CancelToken, call: F) -> AemaResult<()>
    where
        F: Future<Output = AemaResult<()>>,
    {
        if cancel.is_cancelled() {
            return Err(AemaError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AemaError::Cancelled),
            result = tokio::time::timeout(self.timeout, call) => {
                result.map_err(|_| AemaError::Timeout)?
            }
        }
    }
}

//! Buffer facade
//!
//! The public entry point. Construction probes the ledger; `manage` spawns
//! the reconciler. Reads and writes are only legal once the reconciler has
//! inspected the account at least once: using them earlier is a programming
//! error and panics.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use aema_client::{ConfirmationWindow, LedgerClient};
use aema_core::{Address, AemaError, AemaResult, AppId, ReconcileEvent, Storage};
use aema_crypto::Account;

use crate::reconciler::{Reconciler, Shared};
use crate::{BufferConfig, BufferStats, CancelSource, CancelToken, MutationBatcher};

const NOT_READY: &str =
    "AlgorandBuffer used before manage() completed its first pass; check is_ready() or await wait_for_target()";

/// Self-healing key-value buffer on a single oracle application
pub struct AlgorandBuffer<C: LedgerClient + ?Sized + 'static> {
    client: Arc<ConfirmationWindow<C>>,
    account: Account,
    config: BufferConfig,
    shared: Arc<Shared>,
    /// Handed to the reconciler by `manage`
    events_tx: Mutex<Option<mpsc::Sender<ReconcileEvent>>>,
    events_rx: Mutex<Option<mpsc::Receiver<ReconcileEvent>>>,
    shutdown: CancelSource,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: LedgerClient + ?Sized + 'static> AlgorandBuffer<C> {
    /// Create with default configuration. See [`AlgorandBuffer::with_config`].
    pub async fn create(client: Arc<C>, private_key: &str) -> AemaResult<(Self, Option<AemaError>)> {
        Self::with_config(client, private_key, BufferConfig::default()).await
    }

    /// Create a buffer for the account behind `private_key` (a fresh account
    /// if the key is blank).
    ///
    /// Fails only if the key or the configuration is invalid. A failed health
    /// or status probe still yields a usable buffer, with the probe error
    /// alongside.
    pub async fn with_config(
        client: Arc<C>,
        private_key: &str,
        config: BufferConfig,
    ) -> AemaResult<(Self, Option<AemaError>)> {
        config.validate()?;
        let account = if private_key.trim().is_empty() {
            Account::generate()
        } else {
            Account::from_private_key_64(private_key)?
        };
        Ok(Self::with_account(client, account, config).await)
    }

    pub async fn with_account(
        client: Arc<C>,
        account: Account,
        config: BufferConfig,
    ) -> (Self, Option<AemaError>) {
        let client = Arc::new(ConfirmationWindow::new(client, config.confirmation_rounds));
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));

        let buffer = AlgorandBuffer {
            client,
            account,
            config,
            shared: Arc::new(Shared::new()),
            events_tx: Mutex::new(Some(events_tx)),
            events_rx: Mutex::new(Some(events_rx)),
            shutdown: CancelSource::new(),
            task: Mutex::new(None),
        };

        let probe = buffer.probe().await.err();
        if let Some(e) = &probe {
            tracing::warn!(error = %e, address = %buffer.address(), "ledger probe failed");
        }
        (buffer, probe)
    }

    async fn probe(&self) -> AemaResult<()> {
        let timeout = self.config.timeout;
        tokio::time::timeout(timeout, self.client.health_check())
            .await
            .map_err(|_| AemaError::Timeout)
            .and_then(|r| r)
            .map_err(|e| AemaError::HealthCheckFailed(e.to_string()))?;
        tokio::time::timeout(timeout, self.client.status())
            .await
            .map_err(|_| AemaError::Timeout)
            .and_then(|r| r)
            .map_err(|e| AemaError::StatusCheckFailed(e.to_string()))?;
        Ok(())
    }

    /// Spawn the reconciler. Must run inside a tokio runtime.
    pub fn manage(&self) -> AemaResult<()> {
        let Some(events) = self.events_tx.lock().take() else {
            return Err(AemaError::AlreadyManaged);
        };
        let reconciler = Reconciler::new(
            Arc::clone(&self.client),
            self.account.clone(),
            Arc::clone(&self.shared),
            events,
            &self.config,
        );
        let handle = tokio::spawn(reconciler.run(self.shutdown.token()));
        *self.task.lock() = Some(handle);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn address(&self) -> Address {
        self.account.address()
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// The single valid application, if the account is settled
    pub fn target(&self) -> Option<AppId> {
        self.shared.target()
    }

    /// Wait until the account holds exactly one valid application
    pub async fn wait_for_target(&self) -> AppId {
        let mut rx = self.shared.watch_target();
        loop {
            if let Some(id) = *rx.borrow_and_update() {
                return id;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Take the event stream. Only the first call gets it.
    pub fn subscribe_events(&self) -> Option<mpsc::Receiver<ReconcileEvent>> {
        self.events_rx.lock().take()
    }

    pub fn stats(&self) -> BufferStats {
        self.shared.stats()
    }

    /// Global storage of the oracle application.
    ///
    /// # Panics
    ///
    /// If the reconciler has not completed its first pass.
    pub async fn get_storage(&self) -> AemaResult<Storage> {
        self.ensure_ready();
        let id = self.shared.target().ok_or(AemaError::NoTargetResource)?;
        let app = tokio::time::timeout(self.config.timeout, self.client.application_by_id(id))
            .await
            .map_err(|_| AemaError::Timeout)??;
        Ok(app.storage())
    }

    /// Write entries in chunks of up to eight pairs.
    ///
    /// Chunks already confirmed stay applied if a later chunk fails.
    ///
    /// # Panics
    ///
    /// If the reconciler has not completed its first pass.
    pub async fn put_elements<I, K, V>(&self, entries: I) -> AemaResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.put_elements_until(entries, &CancelToken::never()).await
    }

    /// [`AlgorandBuffer::put_elements`] that stops at the chunk in flight
    /// when `cancel` fires
    pub async fn put_elements_until<I, K, V>(&self, entries: I, cancel: &CancelToken) -> AemaResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.ensure_ready();
        let entries: Storage = entries
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_vec(), v.as_ref().to_vec()))
            .collect();

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AemaError::Cancelled),
            guard = self.shared.mutation_lock.lock() => guard,
        };
        let id = self.shared.target().ok_or(AemaError::NoTargetResource)?;
        let shared = &*self.shared;
        let record = move || shared.record(|s| s.chunks_sent += 1);
        self.batcher()
            .on_confirmed(&record)
            .put_entries(id, &entries, cancel)
            .await?;
        Ok(())
    }

    /// Remove keys in chunks of up to sixteen.
    ///
    /// # Panics
    ///
    /// If the reconciler has not completed its first pass.
    pub async fn delete_elements<I, K>(&self, keys: I) -> AemaResult<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        self.delete_elements_until(keys, &CancelToken::never()).await
    }

    pub async fn delete_elements_until<I, K>(&self, keys: I, cancel: &CancelToken) -> AemaResult<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        self.ensure_ready();
        let keys: Vec<Vec<u8>> = keys.into_iter().map(|k| k.as_ref().to_vec()).collect();

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AemaError::Cancelled),
            guard = self.shared.mutation_lock.lock() => guard,
        };
        let id = self.shared.target().ok_or(AemaError::NoTargetResource)?;
        let shared = &*self.shared;
        let record = move || shared.record(|s| s.chunks_sent += 1);
        self.batcher()
            .on_confirmed(&record)
            .delete_entries(id, &keys, cancel)
            .await?;
        Ok(())
    }

    /// Stop the reconciler after its current pass
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Stop the reconciler and wait for it to exit
    pub async fn join(&self) {
        self.shutdown();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "reconciler task failed");
            }
        }
    }

    fn batcher(&self) -> MutationBatcher<'_, ConfirmationWindow<C>> {
        MutationBatcher::new(&*self.client, &self.account, self.config.timeout)
    }

    fn ensure_ready(&self) {
        if !self.shared.is_ready() {
            panic!("{NOT_READY}");
        }
    }
}

impl<C: LedgerClient + ?Sized + 'static> Drop for AlgorandBuffer<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

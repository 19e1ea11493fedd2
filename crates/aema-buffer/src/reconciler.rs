//! Reconciliation loop
//!
//! Drives the account toward exactly one application with the oracle
//! schema. Each pass fetches the account, plans one kind of step and
//! executes it:
//! 1. Delete every application with a foreign schema
//! 2. Otherwise delete valid duplicates, keeping the earliest created
//! 3. Otherwise create the oracle if none exists
//! 4. Otherwise nothing
//!
//! A failing remote call ends the pass; the next pass retries. Failures are
//! logged and never reach the event channel.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch, Mutex};

use aema_client::{LedgerClient, ProgramArtifact};
use aema_core::{
    fulfills_schema, AemaError, AemaResult, AppId, Application, DeleteCause, ReconcileEvent,
};
use aema_crypto::Account;

use crate::{BufferConfig, BufferStats, CancelToken};

/// What a pass will do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    /// Foreign-schema applications to remove
    DeleteInvalid(Vec<AppId>),
    /// Valid duplicates to remove, newest first
    DeleteDuplicates { keep: AppId, delete: Vec<AppId> },
    Create,
    /// Exactly one valid application and nothing else
    Settled(AppId),
}

impl Plan {
    pub fn is_settled(&self) -> bool {
        matches!(self, Plan::Settled(_))
    }
}

/// Decide the next step for an account's applications
pub fn plan(apps: &[Application]) -> Plan {
    let (mut valid, invalid): (Vec<&Application>, Vec<&Application>) =
        apps.iter().filter(|app| !app.id.is_zero()).partition(|app| fulfills_schema(app));

    if !invalid.is_empty() {
        return Plan::DeleteInvalid(invalid.iter().map(|app| app.id).collect());
    }

    match valid.as_slice() {
        [] => Plan::Create,
        [only] => Plan::Settled(only.id),
        _ => {
            valid.sort_by_key(|app| (app.created_at_round, app.id));
            Plan::DeleteDuplicates {
                keep: valid[0].id,
                delete: valid[1..].iter().rev().map(|app| app.id).collect(),
            }
        }
    }
}

/// State the reconciler owns and the facade reads
#[derive(Debug)]
pub(crate) struct Shared {
    ready: AtomicBool,
    target: watch::Sender<Option<AppId>>,
    /// Held across every mutating ledger step
    pub(crate) mutation_lock: Mutex<()>,
    stats: RwLock<BufferStats>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (target, _) = watch::channel(None);
        Shared {
            ready: AtomicBool::new(false),
            target,
            mutation_lock: Mutex::new(()),
            stats: RwLock::new(BufferStats::default()),
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn mark_ready(&self) {
        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::info!("buffer ready");
        }
    }

    pub(crate) fn target(&self) -> Option<AppId> {
        *self.target.borrow()
    }

    pub(crate) fn watch_target(&self) -> watch::Receiver<Option<AppId>> {
        self.target.subscribe()
    }

    fn set_target(&self, target: Option<AppId>) {
        self.target.send_if_modified(|current| {
            if *current == target {
                return false;
            }
            tracing::debug!(from = ?*current, to = ?target, "target changed");
            *current = target;
            true
        });
    }

    pub(crate) fn stats(&self) -> BufferStats {
        self.stats.read().clone()
    }

    pub(crate) fn record(&self, f: impl FnOnce(&mut BufferStats)) {
        f(&mut self.stats.write());
    }
}

/// Background loop keeping the account at one valid oracle
pub(crate) struct Reconciler<C: LedgerClient + ?Sized> {
    client: Arc<C>,
    account: Account,
    shared: Arc<Shared>,
    events: mpsc::Sender<ReconcileEvent>,
    programs: Option<ProgramArtifact>,
    interval: Duration,
    timeout: Duration,
}

impl<C: LedgerClient + ?Sized> Reconciler<C> {
    pub(crate) fn new(
        client: Arc<C>,
        account: Account,
        shared: Arc<Shared>,
        events: mpsc::Sender<ReconcileEvent>,
        config: &BufferConfig,
    ) -> Self {
        Reconciler {
            client,
            account,
            shared,
            events,
            programs: None,
            interval: config.pass_interval(),
            timeout: config.timeout,
        }
    }

    /// Run passes until cancelled. An in-flight pass is finished first.
    pub(crate) async fn run(mut self, cancel: CancelToken) {
        tracing::info!(address = %self.account.address(), "reconciler started");

        while !cancel.is_cancelled() {
            let result = self.pass().await;
            self.shared.record(|s| {
                s.passes += 1;
                if result.is_err() {
                    s.failed_passes += 1;
                }
            });
            match result {
                Ok(plan) => tracing::debug!(?plan, "pass complete"),
                Err(e) => tracing::warn!(error = %e, "reconciliation pass failed"),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!("reconciler stopped");
    }

    /// One reconciliation pass. Returns the plan it carried out.
    pub(crate) async fn pass(&mut self) -> AemaResult<Plan> {
        let address = self.account.address();
        let info = self.call(self.client.account_information(&address)).await;
        self.shared.mark_ready();
        let info = info?;

        let plan = plan(&info.created_apps);
        if !plan.is_settled() {
            self.shared.set_target(None);
        }

        match &plan {
            Plan::Settled(id) => self.shared.set_target(Some(*id)),
            Plan::DeleteInvalid(ids) => {
                for id in ids {
                    self.delete(*id, DeleteCause::SchemaMismatch).await?;
                }
            }
            Plan::DeleteDuplicates { keep, delete } => {
                for id in delete {
                    self.delete(*id, DeleteCause::Duplicate).await?;
                }
                self.shared.set_target(Some(*keep));
            }
            Plan::Create => self.create().await?,
        }
        Ok(plan)
    }

    async fn delete(&self, id: AppId, cause: DeleteCause) -> AemaResult<()> {
        {
            let _guard = self.shared.mutation_lock.lock().await;
            self.call(self.client.delete_application(&self.account, id))
                .await?;
        }
        tracing::info!(%id, ?cause, "deleted application");
        self.shared.record(|s| s.apps_deleted += 1);
        self.emit(ReconcileEvent::Deleted { app: id, cause });
        Ok(())
    }

    async fn create(&mut self) -> AemaResult<()> {
        if self.programs.is_none() {
            let compiled = self.call(ProgramArtifact::compile(&*self.client)).await?;
            self.programs = Some(compiled);
        }
        let Some(programs) = self.programs.as_ref() else {
            return Err(AemaError::Compile("oracle programs unavailable".into()));
        };

        let (id, round) = {
            let _guard = self.shared.mutation_lock.lock().await;
            self.call(
                self.client
                    .create_application(&self.account, &programs.approval, &programs.clear),
            )
            .await?
        };
        tracing::info!(%id, %round, "created application");
        self.shared.set_target(Some(id));
        self.shared.record(|s| s.apps_created += 1);
        self.emit(ReconcileEvent::Created { app: id, round });
        Ok(())
    }

    fn emit(&self, event: ReconcileEvent) {
        match self.events.try_send(event) {
            Ok(()) => self.shared.record(|s| s.events_emitted += 1),
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.shared.record(|s| s.events_dropped += 1);
                tracing::warn!(?event, "event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.shared.record(|s| s.events_dropped += 1);
                tracing::debug!(?event, "event receiver closed");
            }
        }
    }

    async fn call<T, F>(&self, call: F) -> AemaResult<T>
    where
        F: Future<Output = AemaResult<T>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AemaError::Timeout)?
    }
}

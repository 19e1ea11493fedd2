//! In-memory ledger
//!
//! `MockLedger` implements [`LedgerClient`] with real transaction decoding,
//! signature checks and the oracle approval logic. Every accepted
//! transaction closes one round and is confirmed in it.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;

use aema_client::LedgerClient;
use aema_core::{
    AccountInfo, Address, AemaError, AemaResult, AppId, Application, ApplicationParams,
    CompileResponse, NodeStatus, PendingTransactionInfo, Round, StateSchema, Storage,
    SuggestedParams, TxId,
};
use aema_program::{evaluate, AppCallContext, GlobalState, StateDelta};
use aema_wire::{SignedTransaction, Transaction, TransactionKind};

use crate::{FaultPlan, LedgerOp};

/// Genesis id reported in suggested params
pub const GENESIS_ID: &str = "mocknet-v1";

/// Rounds a transaction stays valid after its first valid round
const VALIDITY_WINDOW: u64 = 1000;

const MIN_FEE: u64 = 1000;

/// Balance reported for every account
const FUNDED_AMOUNT: u64 = 100_000_000;

struct MockApp {
    creator: Address,
    created_at_round: Round,
    approval: Vec<u8>,
    clear: Vec<u8>,
    local_schema: StateSchema,
    state: GlobalState,
}

impl MockApp {
    fn to_application(&self, id: AppId) -> Application {
        Application {
            id,
            created_at_round: self.created_at_round,
            params: ApplicationParams {
                creator: self.creator,
                approval_program: self.approval.clone(),
                clear_state_program: self.clear.clone(),
                global_state_schema: self.state.schema(),
                local_state_schema: self.local_schema,
                global_state: self.state.to_key_values(),
            },
        }
    }
}

struct LedgerState {
    round: Round,
    next_app_id: u64,
    apps: BTreeMap<AppId, MockApp>,
    pending: HashMap<TxId, PendingTransactionInfo>,
    log: Vec<Transaction>,
}

impl LedgerState {
    fn new() -> Self {
        LedgerState {
            round: Round::new(1),
            next_app_id: 1,
            apps: BTreeMap::new(),
            pending: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// Register an application under the next free id
    fn insert_app(&mut self, app: MockApp) -> AppId {
        let id = AppId::new(self.next_app_id);
        self.next_app_id += 1;
        self.apps.insert(id, app);
        id
    }

    /// Run a signed transaction against the ledger. Returns the confirmed status.
    fn apply(&mut self, txn: &Transaction) -> AemaResult<PendingTransactionInfo> {
        let round = self.round.next();
        let mut info = PendingTransactionInfo {
            confirmed_round: round,
            ..Default::default()
        };

        match txn.kind() {
            TransactionKind::Create => {
                let ctx = AppCallContext::from_transaction(txn, txn.sender);
                evaluate(&ctx).map_err(AemaError::ProgramRejected)?;
                let id = self.insert_app(MockApp {
                    creator: txn.sender,
                    created_at_round: round,
                    approval: txn.approval_program.to_vec(),
                    clear: txn.clear_program.to_vec(),
                    local_schema: txn.local_schema,
                    state: GlobalState::new(txn.global_schema),
                });
                info.application_index = Some(id);
            }
            TransactionKind::Delete => {
                let app = self.app(txn.app_id)?;
                let ctx = AppCallContext::from_transaction(txn, app.creator);
                evaluate(&ctx).map_err(AemaError::ProgramRejected)?;
                self.apps.remove(&txn.app_id);
            }
            TransactionKind::Call => {
                let app = self.app(txn.app_id)?;
                let ctx = AppCallContext::from_transaction(txn, app.creator);
                let deltas = evaluate(&ctx).map_err(AemaError::ProgramRejected)?;
                if let Some(app) = self.apps.get_mut(&txn.app_id) {
                    app.state
                        .apply(&deltas)
                        .map_err(AemaError::ProgramRejected)?;
                }
            }
            TransactionKind::Other => {
                return Err(AemaError::TransactionRejected(format!(
                    "completion {:?} not supported",
                    txn.on_completion
                )));
            }
        }

        self.round = round;
        Ok(info)
    }

    fn app(&self, id: AppId) -> AemaResult<&MockApp> {
        self.apps
            .get(&id)
            .ok_or_else(|| AemaError::TransactionRejected(format!("application {id} does not exist")))
    }
}

/// In-memory ledger node
pub struct MockLedger {
    state: Mutex<LedgerState>,
    faults: Mutex<FaultPlan>,
    latency: Mutex<Duration>,
    genesis_hash: [u8; 32],
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        MockLedger {
            state: Mutex::new(LedgerState::new()),
            faults: Mutex::new(FaultPlan::new()),
            latency: Mutex::new(Duration::ZERO),
            genesis_hash: [7u8; 32],
        }
    }

    /// Make an operation fail (or succeed again)
    pub fn set_error(&self, op: LedgerOp, fail: bool) {
        self.faults.lock().set(op, fail);
    }

    /// Let `successes` more attempts of an operation through, then fail it
    pub fn fail_after(&self, op: LedgerOp, successes: usize) {
        self.faults.lock().fail_after(op, successes);
    }

    pub fn clear_errors(&self) {
        self.faults.lock().clear();
    }

    /// How often an operation was attempted, failed attempts included
    pub fn attempts(&self, op: LedgerOp) -> usize {
        self.faults.lock().attempts(op)
    }

    /// Delay every submission
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn round(&self) -> Round {
        self.state.lock().round
    }

    /// Every accepted transaction, in submission order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().log.clone()
    }

    /// Number of logged transactions of a kind
    pub fn count(&self, kind: TransactionKind) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|txn| txn.kind() == kind)
            .count()
    }

    /// Number of logged plain application calls
    pub fn app_calls(&self) -> usize {
        self.count(TransactionKind::Call)
    }

    /// Ids of the applications `creator` currently holds
    pub fn apps_of(&self, creator: &Address) -> Vec<AppId> {
        self.state
            .lock()
            .apps
            .iter()
            .filter(|(_, app)| app.creator == *creator)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Byte-slice storage of an application
    pub fn global_state(&self, id: AppId) -> Option<Storage> {
        self.state.lock().apps.get(&id).map(|app| app.state.storage())
    }

    /// Deploy `count` applications with the given global schema directly,
    /// one round each.
    pub fn create_dummy_apps(
        &self,
        creator: &Address,
        count: usize,
        ints: u64,
        bytes: u64,
    ) -> Vec<AppId> {
        (0..count)
            .map(|_| self.seed_application(creator, StateSchema::new(ints, bytes)))
            .collect()
    }

    /// Deploy one application directly, bypassing submission
    pub fn seed_application(&self, creator: &Address, global: StateSchema) -> AppId {
        let mut state = self.state.lock();
        let round = state.round.next();
        let id = state.insert_app(MockApp {
            creator: *creator,
            created_at_round: round,
            approval: b"seeded".to_vec(),
            clear: b"seeded".to_vec(),
            local_schema: StateSchema::default(),
            state: GlobalState::new(global),
        });
        state.round = round;
        tracing::trace!(%id, %round, "seeded application");
        id
    }

    /// Write entries into an application's storage directly
    pub fn seed_globals(&self, id: AppId, entries: &[(&str, &str)]) -> AemaResult<()> {
        let deltas: Vec<StateDelta> = entries
            .iter()
            .map(|(k, v)| StateDelta::Put {
                key: k.as_bytes().to_vec(),
                value: v.as_bytes().to_vec(),
            })
            .collect();

        let mut state = self.state.lock();
        let app = state
            .apps
            .get_mut(&id)
            .ok_or(AemaError::ApplicationNotFound(id))?;
        app.state.apply(&deltas).map_err(AemaError::ProgramRejected)
    }

    fn check(&self, op: LedgerOp) -> AemaResult<()> {
        if self.faults.lock().attempt(op) {
            return Err(AemaError::Client(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn status_now(&self) -> NodeStatus {
        NodeStatus {
            last_round: self.state.lock().round,
            ..Default::default()
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn suggested_params(&self) -> AemaResult<SuggestedParams> {
        self.check(LedgerOp::SuggestedParams)?;
        let round = self.round();
        Ok(SuggestedParams {
            fee: 0,
            min_fee: MIN_FEE,
            flat_fee: false,
            first_valid: round,
            last_valid: Round::new(round.0 + VALIDITY_WINDOW),
            genesis_id: GENESIS_ID.into(),
            genesis_hash: self.genesis_hash,
        })
    }

    async fn health_check(&self) -> AemaResult<()> {
        self.check(LedgerOp::HealthCheck)
    }

    async fn status(&self) -> AemaResult<NodeStatus> {
        self.check(LedgerOp::Status)?;
        Ok(self.status_now())
    }

    async fn status_after_block(&self, round: Round) -> AemaResult<NodeStatus> {
        self.check(LedgerOp::Status)?;
        tokio::task::yield_now().await;
        {
            let mut state = self.state.lock();
            if state.round <= round {
                state.round = round.next();
            }
        }
        Ok(self.status_now())
    }

    async fn account_information(&self, address: &Address) -> AemaResult<AccountInfo> {
        self.check(LedgerOp::AccountInformation)?;
        let state = self.state.lock();
        let created_apps = state
            .apps
            .iter()
            .filter(|(_, app)| app.creator == *address)
            .map(|(id, app)| app.to_application(*id))
            .collect();
        Ok(AccountInfo {
            address: *address,
            amount: FUNDED_AMOUNT,
            round: state.round,
            created_apps,
        })
    }

    async fn application_by_id(&self, id: AppId) -> AemaResult<Application> {
        self.check(LedgerOp::ApplicationById)?;
        self.state
            .lock()
            .apps
            .get(&id)
            .map(|app| app.to_application(id))
            .ok_or(AemaError::ApplicationNotFound(id))
    }

    async fn submit_raw_transaction(&self, raw: &[u8]) -> AemaResult<TxId> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.check(LedgerOp::Submit)?;

        let signed = SignedTransaction::decode(raw)?;
        if !signed.verify() {
            return Err(AemaError::TransactionRejected("invalid signature".into()));
        }
        let kind_op = match signed.txn.kind() {
            TransactionKind::Create => Some(LedgerOp::CreateApplication),
            TransactionKind::Delete => Some(LedgerOp::DeleteApplication),
            TransactionKind::Call => Some(LedgerOp::CallApplication),
            TransactionKind::Other => None,
        };
        if let Some(op) = kind_op {
            self.check(op)?;
        }

        let txn = signed.txn;
        if txn.genesis_id != GENESIS_ID || txn.genesis_hash != self.genesis_hash {
            return Err(AemaError::TransactionRejected("wrong network".into()));
        }
        let tx_id = txn.id();
        let stall = self.faults.lock().is_failing(LedgerOp::Confirmation);

        let mut state = self.state.lock();
        if txn.last_valid < state.round.next() {
            return Err(AemaError::TransactionRejected("transaction expired".into()));
        }
        let info = if stall {
            PendingTransactionInfo::default()
        } else {
            state.apply(&txn)?
        };
        tracing::trace!(%tx_id, kind = ?txn.kind(), round = %info.confirmed_round, "transaction accepted");
        state.pending.insert(tx_id, info);
        state.log.push(txn);
        Ok(tx_id)
    }

    async fn pending_transaction_info(&self, tx_id: &TxId) -> AemaResult<PendingTransactionInfo> {
        self.check(LedgerOp::PendingInfo)?;
        self.state
            .lock()
            .pending
            .get(tx_id)
            .cloned()
            .ok_or_else(|| AemaError::Client(format!("unknown transaction {tx_id}")))
    }

    async fn compile_program(&self, source: &[u8]) -> AemaResult<CompileResponse> {
        self.check(LedgerOp::Compile)?;
        if source.is_empty() {
            return Err(AemaError::Compile("empty source".into()));
        }
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        Ok(CompileResponse {
            hash: format!("{:016x}", hasher.finish()),
            result: STANDARD.encode(source),
        })
    }
}

//! Ledger data model
//!
//! Plain data as the ledger reports it: accounts, the applications they
//! created, application global state, node status and transaction status.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::{Address, AppId, Round};

/// Decoded global storage of an application (byte-slice slots only)
pub type Storage = BTreeMap<Vec<u8>, Vec<u8>>;

/// Declared storage slot counts of an application
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StateSchema {
    pub num_uint: u64,
    pub num_byte_slice: u64,
}

impl StateSchema {
    #[inline]
    pub fn new(num_uint: u64, num_byte_slice: u64) -> Self {
        StateSchema {
            num_uint,
            num_byte_slice,
        }
    }
}

/// A single global storage value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TealValue {
    Bytes(Vec<u8>),
    Uint(u64),
}

impl TealValue {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TealValue::Bytes(b) => Some(b),
            TealValue::Uint(_) => None,
        }
    }
}

/// A key-value pair in global storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TealKeyValue {
    pub key: Vec<u8>,
    pub value: TealValue,
}

impl TealKeyValue {
    pub fn bytes(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        TealKeyValue {
            key: key.into(),
            value: TealValue::Bytes(value.into()),
        }
    }
}

/// Parameters of a deployed application
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplicationParams {
    pub creator: Address,
    pub approval_program: Vec<u8>,
    pub clear_state_program: Vec<u8>,
    pub global_state_schema: StateSchema,
    pub local_state_schema: StateSchema,
    pub global_state: Vec<TealKeyValue>,
}

/// A deployed application (the oracle resource)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Application {
    pub id: AppId,
    /// Round in which the application was created
    pub created_at_round: Round,
    pub params: ApplicationParams,
}

impl Application {
    /// Byte-slice entries of the global state as a map
    pub fn storage(&self) -> Storage {
        self.params
            .global_state
            .iter()
            .filter_map(|kv| kv.value.as_bytes().map(|v| (kv.key.clone(), v.to_vec())))
            .collect()
    }
}

/// Account state as reported by the ledger
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: Address,
    pub amount: u64,
    pub round: Round,
    pub created_apps: Vec<Application>,
}

/// Node status
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeStatus {
    pub last_round: Round,
    pub time_since_last_round: Duration,
    pub catchup_time: Duration,
}

/// Parameters every transaction must carry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuggestedParams {
    pub fee: u64,
    pub min_fee: u64,
    pub flat_fee: bool,
    pub first_valid: Round,
    pub last_valid: Round,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
}

/// Pending (or confirmed) transaction status
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingTransactionInfo {
    /// Zero while the transaction is still in the pool
    pub confirmed_round: Round,
    /// Non-empty when the pool dropped the transaction
    pub pool_error: String,
    /// Set for confirmed application-create transactions
    pub application_index: Option<AppId>,
}

impl PendingTransactionInfo {
    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_round > Round::ZERO
    }
}

/// Result of compiling program source
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileResponse {
    pub hash: String,
    /// Base64 encoded program bytes
    pub result: String,
}

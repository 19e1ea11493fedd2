//! Error types for AEMA

use thiserror::Error;

use crate::{AppId, Round};

/// Why the on-chain program refused a call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Caller is not the application creator
    NotCreator,
    /// Completion type other than a plain call or a delete
    CompletionNotAllowed,
    /// Note field carried neither "put" nor "delete"
    UnknownMode,
    /// Put mode received a key without a value
    DanglingKey,
    /// Global storage would exceed the declared schema
    SchemaExceeded,
    /// Key or key plus value longer than the ledger allows
    EntryTooLarge,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            RejectReason::NotCreator => "sender is not the creator",
            RejectReason::CompletionNotAllowed => "completion type not allowed",
            RejectReason::UnknownMode => "unknown mode",
            RejectReason::DanglingKey => "odd argument count in put mode",
            RejectReason::SchemaExceeded => "global schema exceeded",
            RejectReason::EntryTooLarge => "entry too large",
        };
        f.write_str(reason)
    }
}

/// Core AEMA errors
#[derive(Error, Debug)]
pub enum AemaError {
    // Setup errors
    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Status check failed: {0}")]
    StatusCheckFailed(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // Ledger errors
    #[error("Ledger client error: {0}")]
    Client(String),

    #[error("Application not found: {0:?}")]
    ApplicationNotFound(AppId),

    #[error("Program compile failed: {0}")]
    Compile(String),

    // Transaction errors
    #[error("Transaction rejected by pool: {0}")]
    TransactionRejected(String),

    #[error("Program rejected call: {0}")]
    ProgramRejected(RejectReason),

    #[error("Transaction not confirmed within {rounds} rounds after round {start}")]
    ConfirmationTimeout { start: Round, rounds: u64 },

    #[error("Operation timed out")]
    Timeout,

    #[error("Operation cancelled")]
    Cancelled,

    // Mutation errors
    #[error("No target resource: account has no single valid oracle application")]
    NoTargetResource,

    #[error("Too many arguments: {count} > {max}")]
    TooManyArguments { count: usize, max: usize },

    #[error("Entry too large: {0}")]
    EntryTooLarge(String),

    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    // Runtime errors
    #[error("Buffer is already managed")]
    AlreadyManaged,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for AEMA operations
pub type AemaResult<T> = Result<T, AemaError>;

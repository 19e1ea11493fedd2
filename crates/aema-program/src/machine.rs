//! Approval state machine
//!
//! `Entry -> AccessCheck -> (Allow | Reject | Dispatch)`, then
//! `Dispatch -> Put | Delete -> Allow`. The machine reads the call and
//! yields the storage deltas; it never touches storage itself.

use bytes::Bytes;

use aema_core::{Address, AppId, RejectReason};
use aema_wire::{OnCompletion, Transaction};

/// Note value selecting put mode
pub const MODE_PUT: &[u8] = b"put";

/// Note value selecting delete mode
pub const MODE_DELETE: &[u8] = b"delete";

/// Mutation mode carried in the note field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Put,
    Delete,
}

impl Mode {
    pub fn from_note(note: &[u8]) -> Option<Self> {
        match note {
            MODE_PUT => Some(Mode::Put),
            MODE_DELETE => Some(Mode::Delete),
            _ => None,
        }
    }

    pub fn as_note(self) -> &'static [u8] {
        match self {
            Mode::Put => MODE_PUT,
            Mode::Delete => MODE_DELETE,
        }
    }
}

/// What the program sees of a call
#[derive(Clone, Copy, Debug)]
pub struct AppCallContext<'a> {
    pub app_id: AppId,
    pub sender: Address,
    /// Creator of the called application (unused on creation)
    pub creator: Address,
    pub on_completion: OnCompletion,
    pub args: &'a [Bytes],
    pub note: &'a [u8],
}

impl<'a> AppCallContext<'a> {
    pub fn from_transaction(txn: &'a Transaction, creator: Address) -> Self {
        AppCallContext {
            app_id: txn.app_id,
            sender: txn.sender,
            creator,
            on_completion: txn.on_completion,
            args: &txn.app_args,
            note: &txn.note,
        }
    }
}

/// A single accepted storage mutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateDelta {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Entry,
    AccessCheck,
    Dispatch,
    Put { cursor: usize },
    Delete { cursor: usize },
    Allow,
    Reject(RejectReason),
}

/// Run the approval logic. Returns the deltas to apply on accept.
pub fn evaluate(ctx: &AppCallContext<'_>) -> Result<Vec<StateDelta>, RejectReason> {
    let mut deltas = Vec::new();
    let mut step = Step::Entry;

    loop {
        step = match step {
            Step::Entry => {
                if ctx.app_id.is_zero() {
                    Step::Allow
                } else {
                    Step::AccessCheck
                }
            }
            Step::AccessCheck => {
                if ctx.sender != ctx.creator {
                    Step::Reject(RejectReason::NotCreator)
                } else {
                    match ctx.on_completion {
                        OnCompletion::DeleteApplication => Step::Allow,
                        OnCompletion::NoOp => Step::Dispatch,
                        _ => Step::Reject(RejectReason::CompletionNotAllowed),
                    }
                }
            }
            Step::Dispatch => {
                if ctx.args.is_empty() {
                    Step::Allow
                } else {
                    match Mode::from_note(ctx.note) {
                        Some(Mode::Put) => Step::Put { cursor: 0 },
                        Some(Mode::Delete) => Step::Delete { cursor: 0 },
                        None => Step::Reject(RejectReason::UnknownMode),
                    }
                }
            }
            Step::Put { cursor } => match &ctx.args[cursor..] {
                [] => Step::Allow,
                [_] => Step::Reject(RejectReason::DanglingKey),
                [key, value, ..] => {
                    deltas.push(StateDelta::Put {
                        key: key.to_vec(),
                        value: value.to_vec(),
                    });
                    Step::Put { cursor: cursor + 2 }
                }
            },
            Step::Delete { cursor } => match ctx.args.get(cursor) {
                None => Step::Allow,
                Some(key) => {
                    deltas.push(StateDelta::Delete { key: key.to_vec() });
                    Step::Delete { cursor: cursor + 1 }
                }
            },
            Step::Allow => return Ok(deltas),
            Step::Reject(reason) => return Err(reason),
        };
    }
}

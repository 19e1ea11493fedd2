//! Application-call transaction
//!
//! Encoding (all integers LE):
//! - Byte 0: Wire version
//! - 32 bytes: Sender address
//! - u64 fee, u64 first valid round, u64 last valid round
//! - u16-prefixed genesis id, 32-byte genesis hash
//! - u16-prefixed note (carries the program mode)
//! - u64 application id (0 on create), u8 on-completion
//! - u8 argument count, each argument u16-prefixed
//! - u32-prefixed approval and clear programs
//! - Global schema (u64, u64), local schema (u64, u64)

use bytes::Bytes;
use sha2::{Digest, Sha512_256};

use aema_core::{
    Address, AemaError, AemaResult, AppId, Round, StateSchema, SuggestedParams, TxId, MAX_ARGS,
    MAX_ARGS_TOTAL_LEN,
};
use aema_crypto::Account;

use crate::codec::{Reader, Writer};
use crate::SignedTransaction;

/// Current transaction encoding version
pub const WIRE_VERSION: u8 = 1;

/// Domain separation prefix for ids and signatures
pub const TX_DOMAIN: &[u8; 2] = b"TX";

/// Largest note field
pub const MAX_NOTE_SIZE: usize = 1024;

/// Largest genesis id string
pub const MAX_GENESIS_ID_LEN: usize = 64;

/// What happens after the approval program accepts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OnCompletion {
    #[default]
    NoOp = 0,
    OptIn = 1,
    CloseOut = 2,
    ClearState = 3,
    UpdateApplication = 4,
    DeleteApplication = 5,
}

impl OnCompletion {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(OnCompletion::NoOp),
            1 => Some(OnCompletion::OptIn),
            2 => Some(OnCompletion::CloseOut),
            3 => Some(OnCompletion::ClearState),
            4 => Some(OnCompletion::UpdateApplication),
            5 => Some(OnCompletion::DeleteApplication),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Kind of ledger operation a transaction performs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Create,
    Delete,
    Call,
    Other,
}

/// Application-call transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: Round,
    pub last_valid: Round,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    /// Side channel read by the program as the call mode
    pub note: Bytes,
    pub app_id: AppId,
    pub on_completion: OnCompletion,
    pub app_args: Vec<Bytes>,
    pub approval_program: Bytes,
    pub clear_program: Bytes,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
}

impl Transaction {
    /// Classify the transaction
    pub fn kind(&self) -> TransactionKind {
        if self.app_id.is_zero() {
            return TransactionKind::Create;
        }
        match self.on_completion {
            OnCompletion::DeleteApplication => TransactionKind::Delete,
            OnCompletion::NoOp => TransactionKind::Call,
            _ => TransactionKind::Other,
        }
    }

    /// Check field limits
    pub fn validate(&self) -> AemaResult<()> {
        if self.app_args.len() > MAX_ARGS {
            return Err(AemaError::TooManyArguments {
                count: self.app_args.len(),
                max: MAX_ARGS,
            });
        }
        let args_len: usize = self.app_args.iter().map(Bytes::len).sum();
        if args_len > MAX_ARGS_TOTAL_LEN {
            return Err(AemaError::EntryTooLarge(format!(
                "arguments total {args_len} bytes > {MAX_ARGS_TOTAL_LEN}"
            )));
        }
        if self.note.len() > MAX_NOTE_SIZE {
            return Err(AemaError::InvalidWireFormat(format!(
                "note too large: {} > {MAX_NOTE_SIZE}",
                self.note.len()
            )));
        }
        if self.genesis_id.len() > MAX_GENESIS_ID_LEN {
            return Err(AemaError::InvalidWireFormat("genesis id too long".into()));
        }
        if self.app_id.is_zero() && self.approval_program.is_empty() {
            return Err(AemaError::InvalidWireFormat(
                "application create without approval program".into(),
            ));
        }
        Ok(())
    }

    /// Canonical encoding. Only meaningful for a transaction that passes
    /// [`Transaction::validate`].
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(160 + self.note.len() + self.approval_program.len());
        w.u8(WIRE_VERSION);
        w.fixed(self.sender.as_bytes());
        w.u64(self.fee);
        w.u64(self.first_valid.0);
        w.u64(self.last_valid.0);
        w.short_bytes(self.genesis_id.as_bytes());
        w.fixed(&self.genesis_hash);
        w.short_bytes(&self.note);
        w.u64(self.app_id.0);
        w.u8(self.on_completion.to_byte());
        w.u8(self.app_args.len() as u8);
        for arg in &self.app_args {
            w.short_bytes(arg);
        }
        w.long_bytes(&self.approval_program);
        w.long_bytes(&self.clear_program);
        w.u64(self.global_schema.num_uint);
        w.u64(self.global_schema.num_byte_slice);
        w.u64(self.local_schema.num_uint);
        w.u64(self.local_schema.num_byte_slice);
        w.finish()
    }

    /// Parse a canonical encoding
    pub fn decode(buf: &[u8]) -> AemaResult<Self> {
        let mut r = Reader::new(buf);
        let txn = Self::read(&mut r)?;
        r.finish()?;
        Ok(txn)
    }

    pub(crate) fn read(r: &mut Reader<'_>) -> AemaResult<Self> {
        let version = r.u8()?;
        if version != WIRE_VERSION {
            return Err(AemaError::InvalidWireFormat(format!(
                "unsupported version {version}"
            )));
        }

        let sender = Address::new(r.array()?);
        let fee = r.u64()?;
        let first_valid = Round::new(r.u64()?);
        let last_valid = Round::new(r.u64()?);
        let genesis_id = String::from_utf8(r.short_bytes()?.to_vec())
            .map_err(|_| AemaError::InvalidWireFormat("genesis id is not utf-8".into()))?;
        let genesis_hash = r.array()?;
        let note = r.short_bytes()?;
        let app_id = AppId::new(r.u64()?);
        let oc = r.u8()?;
        let on_completion = OnCompletion::from_byte(oc)
            .ok_or_else(|| AemaError::InvalidWireFormat(format!("unknown on-completion {oc}")))?;

        let argc = r.u8()? as usize;
        let mut app_args = Vec::with_capacity(argc.min(MAX_ARGS));
        for _ in 0..argc {
            app_args.push(r.short_bytes()?);
        }

        let approval_program = r.long_bytes()?;
        let clear_program = r.long_bytes()?;
        let global_schema = StateSchema::new(r.u64()?, r.u64()?);
        let local_schema = StateSchema::new(r.u64()?, r.u64()?);

        let txn = Transaction {
            sender,
            fee,
            first_valid,
            last_valid,
            genesis_id,
            genesis_hash,
            note,
            app_id,
            on_completion,
            app_args,
            approval_program,
            clear_program,
            global_schema,
            local_schema,
        };
        txn.validate()?;
        Ok(txn)
    }

    /// Bytes covered by the signature
    pub fn signing_bytes(&self) -> Vec<u8> {
        let encoded = self.encode();
        let mut buf = Vec::with_capacity(TX_DOMAIN.len() + encoded.len());
        buf.extend_from_slice(TX_DOMAIN);
        buf.extend_from_slice(&encoded);
        buf
    }

    /// Transaction id: SHA-512/256 over the signing bytes
    pub fn id(&self) -> TxId {
        let digest = Sha512_256::digest(self.signing_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        TxId::new(out)
    }

    /// Sign with the sender's account. Fields beyond their limits are
    /// rejected, since the encoding could not represent them.
    pub fn sign(self, account: &Account) -> AemaResult<SignedTransaction> {
        self.validate()?;
        let sig = account.sign(&self.signing_bytes());
        Ok(SignedTransaction::new(self, sig))
    }
}

/// Application-call transaction builder
pub struct TransactionBuilder {
    txn: Transaction,
}

impl TransactionBuilder {
    /// Start a call against `app_id` with the given completion
    pub fn app_call(
        sender: Address,
        params: &SuggestedParams,
        app_id: AppId,
        on_completion: OnCompletion,
    ) -> Self {
        let fee = if params.flat_fee {
            params.fee
        } else {
            params.fee.max(params.min_fee)
        };
        TransactionBuilder {
            txn: Transaction {
                sender,
                fee,
                first_valid: params.first_valid,
                last_valid: params.last_valid,
                genesis_id: params.genesis_id.clone(),
                genesis_hash: params.genesis_hash,
                app_id,
                on_completion,
                ..Default::default()
            },
        }
    }

    /// Start an application create
    pub fn app_create(
        sender: Address,
        params: &SuggestedParams,
        approval: impl Into<Bytes>,
        clear: impl Into<Bytes>,
        global_schema: StateSchema,
        local_schema: StateSchema,
    ) -> Self {
        let mut builder = Self::app_call(sender, params, AppId::ZERO, OnCompletion::NoOp);
        builder.txn.approval_program = approval.into();
        builder.txn.clear_program = clear.into();
        builder.txn.global_schema = global_schema;
        builder.txn.local_schema = local_schema;
        builder
    }

    pub fn note(mut self, note: impl Into<Bytes>) -> Self {
        self.txn.note = note.into();
        self
    }

    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.txn.app_args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        self.txn.app_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Validate and produce the transaction
    pub fn build(self) -> AemaResult<Transaction> {
        self.txn.validate()?;
        Ok(self.txn)
    }
}

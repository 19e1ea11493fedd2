//! Signed transaction envelope
//!
//! Encoding: 64-byte ed25519 signature followed by the transaction encoding.

use aema_core::{AemaResult, TxId};

use crate::codec::{Reader, Writer};
use crate::Transaction;

/// Signature size
pub const SIGNATURE_SIZE: usize = 64;

/// A transaction with the sender's signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub txn: Transaction,
    pub sig: [u8; SIGNATURE_SIZE],
}

impl SignedTransaction {
    pub fn new(txn: Transaction, sig: [u8; SIGNATURE_SIZE]) -> Self {
        SignedTransaction { txn, sig }
    }

    /// Id of the inner transaction
    pub fn id(&self) -> TxId {
        self.txn.id()
    }

    /// True if the signature belongs to the sender
    pub fn verify(&self) -> bool {
        aema_crypto::verify(&self.txn.sender, &self.txn.signing_bytes(), &self.sig)
    }

    /// Raw bytes for submission
    pub fn encode(&self) -> Vec<u8> {
        let body = self.txn.encode();
        let mut w = Writer::with_capacity(SIGNATURE_SIZE + body.len());
        w.fixed(&self.sig);
        w.fixed(&body);
        w.finish()
    }

    /// Parse raw submission bytes
    pub fn decode(buf: &[u8]) -> AemaResult<Self> {
        let mut r = Reader::new(buf);
        let sig = r.array()?;
        let txn = Transaction::read(&mut r)?;
        r.finish()?;
        Ok(SignedTransaction { txn, sig })
    }
}

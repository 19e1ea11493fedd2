//! Identity types for AEMA
//!
//! Application ids and rounds are plain 64-bit ledger integers. Addresses and
//! transaction ids are 32-byte digests with a base32 text form.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha512_256};

use crate::{AemaError, AemaResult};

const BASE32: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

/// Address checksum length (trailing bytes of the public key hash)
pub const CHECKSUM_LEN: usize = 4;

/// Length of the textual address form
pub const ADDRESS_TEXT_LEN: usize = 58;

/// Application (oracle resource) identity. Zero means "not yet created".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AppId(pub u64);

impl AppId {
    pub const ZERO: AppId = AppId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        AppId(id)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        AppId(u64::from_le_bytes(bytes))
    }
}

impl fmt::Debug for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "App({})", self.0)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger round number. Doubles as the creation ordinal of applications.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Round(pub u64);

impl Round {
    pub const ZERO: Round = Round(0);

    #[inline]
    pub fn new(round: u64) -> Self {
        Round(round)
    }

    #[inline]
    pub fn next(self) -> Self {
        Round(self.0.saturating_add(1))
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account address - the raw ed25519 public key of the account
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    #[inline]
    pub fn new(public_key: [u8; 32]) -> Self {
        Address(public_key)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Last four bytes of SHA-512/256 over the public key
    pub fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let hash = Sha512_256::digest(self.0);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&hash[hash.len() - CHECKSUM_LEN..]);
        out
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_string();
        write!(f, "Address({}..)", &text[..8])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&self.checksum());
        f.write_str(&base32::encode(BASE32, &raw))
    }
}

impl FromStr for Address {
    type Err = AemaError;

    fn from_str(s: &str) -> AemaResult<Self> {
        if s.len() != ADDRESS_TEXT_LEN {
            return Err(AemaError::InvalidAddress(format!(
                "expected {ADDRESS_TEXT_LEN} characters, got {}",
                s.len()
            )));
        }
        let raw = base32::decode(BASE32, s)
            .ok_or_else(|| AemaError::InvalidAddress("not base32".into()))?;
        if raw.len() != 32 + CHECKSUM_LEN {
            return Err(AemaError::InvalidAddress(format!(
                "decoded length {}",
                raw.len()
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&raw[..32]);
        let address = Address(key);
        if address.checksum()[..] != raw[32..] {
            return Err(AemaError::InvalidAddress("checksum mismatch".into()));
        }
        Ok(address)
    }
}

/// Transaction identity - hash of the canonical transaction encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    #[inline]
    pub fn new(digest: [u8; 32]) -> Self {
        TxId(digest)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tx({})", self)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base32::encode(BASE32, &self.0))
    }
}

impl FromStr for TxId {
    type Err = AemaError;

    fn from_str(s: &str) -> AemaResult<Self> {
        let raw = base32::decode(BASE32, s)
            .ok_or_else(|| AemaError::InvalidWireFormat(format!("bad transaction id: {s}")))?;
        let digest: [u8; 32] = raw
            .try_into()
            .map_err(|_| AemaError::InvalidWireFormat(format!("bad transaction id: {s}")))?;
        Ok(TxId(digest))
    }
}

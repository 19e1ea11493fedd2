//! Account identity using Ed25519
//!
//! Private keys travel as base64 of the 64-byte `seed || public key` form.
//! The address is the public key itself.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use aema_core::{Address, AemaError, AemaResult};

/// Length of the exported private key (seed followed by public key)
pub const PRIVATE_KEY_LEN: usize = 64;

/// Length of a bare ed25519 seed
pub const SEED_LEN: usize = 32;

/// Generate a random private key in base64 form
pub fn generate_private_key_64() -> String {
    Account::generate().private_key_64()
}

/// Signing account on the ledger
#[derive(Clone)]
pub struct Account {
    signing_key: SigningKey,
    address: Address,
}

impl Account {
    /// Generate a new random account
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Create an account from a 32-byte seed
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    /// Import a base64 private key.
    ///
    /// Accepts the 64-byte export form, whose public half must match the seed,
    /// or a bare 32-byte seed.
    pub fn from_private_key_64(encoded: &str) -> AemaResult<Self> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AemaError::InvalidPrivateKey(e.to_string()))?;

        match raw.len() {
            PRIVATE_KEY_LEN => {
                let mut keypair = [0u8; PRIVATE_KEY_LEN];
                keypair.copy_from_slice(&raw);
                let signing_key = SigningKey::from_keypair_bytes(&keypair)
                    .map_err(|_| AemaError::InvalidPrivateKey("public key does not match seed".into()))?;
                Ok(Self::from_signing_key(signing_key))
            }
            SEED_LEN => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(&raw);
                Ok(Self::from_seed(&seed))
            }
            n => Err(AemaError::InvalidPrivateKey(format!(
                "expected {PRIVATE_KEY_LEN} or {SEED_LEN} bytes, got {n}"
            ))),
        }
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::new(signing_key.verifying_key().to_bytes());
        Account {
            signing_key,
            address,
        }
    }

    /// Account address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Private key bytes (secret)
    pub fn private_key_bytes(&self) -> [u8; PRIVATE_KEY_LEN] {
        self.signing_key.to_keypair_bytes()
    }

    /// Private key in base64 form (secret)
    pub fn private_key_64(&self) -> String {
        STANDARD.encode(self.private_key_bytes())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Verify a signature made by the account behind `address`
pub fn verify(address: &Address, message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(address.as_bytes()) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

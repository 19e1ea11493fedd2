//! AEMA Crypto - Account keys and signatures
//!
//! Provides the account identity used to authorize ledger transactions:
//! - Ed25519 key generation
//! - Base64 private key import/export
//! - Address derivation
//! - Signing and verification

pub mod account;

pub use account::*;

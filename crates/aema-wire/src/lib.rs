//! AEMA Wire Format - Application-call transactions
//!
//! This crate implements the transaction format the buffer submits:
//! - Application-call transaction model and builder
//! - Canonical little-endian encoding
//! - Signed transaction envelope
//! - Transaction ids

pub mod codec;
pub mod transaction;
pub mod signed;

pub use transaction::*;
pub use signed::*;

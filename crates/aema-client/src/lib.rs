//! AEMA Client - Ledger access
//!
//! This crate defines what the buffer needs from a ledger node:
//! - The `LedgerClient` capability trait
//! - Sign, submit and confirm helpers built on it
//! - Oracle program compilation
//! - A per-client confirmation window override

pub mod ledger;
pub mod confirm;
pub mod program;
pub mod window;

pub use ledger::*;
pub use confirm::*;
pub use program::*;
pub use window::*;

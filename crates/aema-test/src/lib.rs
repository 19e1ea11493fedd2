//! AEMA Test Harness - Ledger simulation for buffer testing
//!
//! This crate provides:
//! - An in-memory ledger implementing `LedgerClient`
//! - Per-operation fault injection
//! - Fixtures for seeding foreign and duplicate applications

pub mod faults;
pub mod ledger;

pub use faults::*;
pub use ledger::*;

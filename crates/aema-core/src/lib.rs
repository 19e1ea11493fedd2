//! AEMA Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout AEMA:
//! - Identifiers (AppId, Round, Address, TxId)
//! - Ledger data model (accounts, applications, global state)
//! - Oracle schema rules
//! - Reconciliation events
//! - Error taxonomy

pub mod id;
pub mod models;
pub mod schema;
pub mod event;
pub mod error;

pub use id::*;
pub use models::*;
pub use schema::*;
pub use event::*;
pub use error::*;

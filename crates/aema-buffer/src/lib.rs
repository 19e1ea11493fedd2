//! AEMA Buffer - Key-value storage on a self-healing oracle application
//!
//! This crate ties the pieces together:
//! - Reconciler loop keeping exactly one valid oracle per account
//! - Chunked put/delete writes within the program's argument ceiling
//! - The `AlgorandBuffer` facade gating access on readiness
//! - Configuration, tracing setup and cancellation

pub mod config;
pub mod logging;
pub mod cancel;
pub mod stats;
pub mod batcher;
pub mod reconciler;
pub mod buffer;

pub use config::*;
pub use logging::*;
pub use cancel::*;
pub use stats::*;
pub use batcher::*;
pub use reconciler::*;
pub use buffer::*;

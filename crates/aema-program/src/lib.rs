//! AEMA Program - The logic every oracle application runs
//!
//! The oracle application is deployed from the TEAL sources in [`teal`].
//! [`machine`] expresses the same approval logic as an explicit state
//! machine so transaction builders and test ledgers share one contract:
//! - Creation always accepted
//! - Only the creator may call or delete
//! - Plain calls dispatch on the note: "put" pairs or "delete" keys
//!
//! [`storage`] applies accepted mutations to global state under the
//! application's declared schema.

pub mod teal;
pub mod machine;
pub mod storage;

pub use teal::*;
pub use machine::*;
pub use storage::*;

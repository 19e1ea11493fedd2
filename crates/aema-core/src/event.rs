//! Reconciliation events
//!
//! One event is emitted per successful mutating step of the reconciler.
//! Failures never produce events.

use crate::{AppId, Round};

/// Why an application was removed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeleteCause {
    /// Global schema did not match the oracle schema
    SchemaMismatch,
    /// A valid application with an earlier creation round survives
    Duplicate,
}

/// Progress signal from the reconciler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconcileEvent {
    Created { app: AppId, round: Round },
    Deleted { app: AppId, cause: DeleteCause },
}

impl ReconcileEvent {
    /// Application the event refers to
    pub fn app(&self) -> AppId {
        match self {
            ReconcileEvent::Created { app, .. } | ReconcileEvent::Deleted { app, .. } => *app,
        }
    }

    #[inline]
    pub fn is_creation(&self) -> bool {
        matches!(self, ReconcileEvent::Created { .. })
    }
}

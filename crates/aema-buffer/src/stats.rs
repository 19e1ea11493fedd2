//! Buffer counters

/// Counters shared by the reconciler and the facade
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Completed reconciliation passes, failed ones included
    pub passes: u64,
    pub failed_passes: u64,
    pub apps_created: u64,
    pub apps_deleted: u64,
    pub events_emitted: u64,
    /// Events lost because the consumer fell behind
    pub events_dropped: u64,
    /// Confirmed write calls, partial writes included
    pub chunks_sent: u64,
}

/// A request to free at least `bytes` of reclaimable memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimRequest {
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimResult {
    pub freed_bytes: u64,
}

/// A component holding memory it can drop on request (for example cache entries).
///
/// Reclaimers release what they free through the ledger themselves; the ledger only
/// orchestrates. Implementations must not call back into
/// [`BudgetLedger::reserve_resource`](crate::BudgetLedger::reserve_resource).
pub trait MemoryReclaimer: Send + Sync {
    fn name(&self) -> &str;

    /// Upper bound on what [`MemoryReclaimer::reclaim`] could free right now.
    fn reclaimable_bytes(&self) -> u64;

    fn reclaim(&self, request: ReclaimRequest) -> ReclaimResult;
}

use crate::budget::MemoryBudget;
use crate::pressure::MemoryPressure;
use serde::{Deserialize, Serialize};

/// Snapshot of ledger state intended for status output and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReport {
    pub budget: MemoryBudget,
    /// Footprint of committed (loaded) resources.
    pub resource_bytes: u64,
    /// Footprint reserved by loads that have not finished yet.
    pub pending_bytes: u64,
    pub cache_bytes: u64,
    pub pressure: MemoryPressure,
}

impl MemoryReport {
    pub fn usage_total_bytes(&self) -> u64 {
        self.resource_bytes.saturating_add(self.cache_bytes)
    }

    pub fn available_bytes(&self) -> u64 {
        self.budget
            .total
            .saturating_sub(self.usage_total_bytes())
            .saturating_sub(self.pending_bytes)
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    pub count: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub high: TierStats,
    pub medium: TierStats,
    pub low: TierStats,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub item_count: usize,
    pub total_bytes: u64,
    pub by_priority: PriorityBreakdown,
    pub hits: u64,
    pub misses: u64,
    /// Entries removed by threshold sweeps, reclaim requests or aggressive clears.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

//! In-memory priority cache that shares the process memory budget with model resources.
//!
//! Entries carry a [`Priority`] and a TTL. Eviction happens in three ways:
//! - lazily, when an expired entry is looked up;
//! - by threshold sweeps, whenever committed usage (resources + cache) exceeds a configured
//!   fraction of the budget: expired entries first, then `Low` oldest-first, then `Medium`
//!   oldest-first. `High` entries are never evicted by pressure;
//! - explicitly, via [`PriorityCache::aggressive_clear`] (everything but `High`) or
//!   [`PriorityCache::clear`].

mod cache;
mod error;
mod stats;
mod weigh;

pub use cache::{CacheConfig, Priority, PriorityCache};
pub use error::{CacheError, Result};
pub use stats::{CacheStats, PriorityBreakdown, TierStats};
pub use weigh::Weigh;

mod eviction;
mod expiry;
mod reclaim;

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use lingua_memory::{BudgetLedger, MemoryReclaimer, ReclaimRequest, ReclaimResult, ReclaimerRegistration};
use lingua_scheduler::PeriodicTask;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{CacheError, Result};
use crate::stats::{CacheStats, TierStats};
use crate::weigh::Weigh;

/// Eviction priority of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Tiers evicted under pressure, in order.
const EVICTABLE_TIERS: [Priority; 2] = [Priority::Low, Priority::Medium];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    /// Default time-to-live for entries inserted with [`PriorityCache::insert`].
    pub ttl: Duration,
    /// Threshold sweeps start once `(resources + cache) / budget` exceeds this ratio.
    pub eviction_threshold: f64,
    /// Period of the background expiry sweep.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            eviction_threshold: 0.8,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

struct Entry<V> {
    payload: V,
    size: u64,
    priority: Priority,
    /// `None` when the ttl runs past the clock's range; such entries never expire.
    expires_at: Option<Instant>,
    /// Insertion order; refreshed on replacement. Oldest-first means lowest `seq`.
    seq: u64,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

struct State<V> {
    entries: HashMap<String, Entry<V>>,
    bytes: u64,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> Default for State<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            bytes: 0,
            next_seq: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Expired,
    Evicted,
    Explicit,
}

struct Inner<V> {
    ledger: BudgetLedger,
    config: CacheConfig,
    state: Mutex<State<V>>,
}

/// Key → payload store with per-entry priority and TTL, charged against the shared
/// [`BudgetLedger`].
///
/// Cloning is cheap; clones share the same entries.
pub struct PriorityCache<V> {
    inner: Arc<Inner<V>>,
    _registration: Arc<ReclaimerRegistration>,
}

impl<V> Clone for PriorityCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _registration: Arc::clone(&self._registration),
        }
    }
}

impl<V> PriorityCache<V>
where
    V: Weigh + Clone + Send + Sync + 'static,
{
    pub fn new(ledger: BudgetLedger, config: CacheConfig) -> Self {
        let inner = Arc::new(Inner {
            ledger: ledger.clone(),
            config,
            state: Mutex::new(State::default()),
        });
        let registration = ledger.register_reclaimer("priority_cache", &inner);
        Self {
            inner,
            _registration: Arc::new(registration),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Insert with the configured default TTL.
    pub fn insert(&self, key: impl Into<String>, payload: V, priority: Priority) -> Result<()> {
        self.insert_with_ttl(key, payload, priority, self.inner.config.ttl)
    }

    /// Insert or replace `key`, then run a threshold sweep.
    ///
    /// Fails without touching the cache when the entry cannot fit in the budget even after
    /// every evictable entry (expired, `Low`, `Medium`) other than `key` is dropped.
    pub fn insert_with_ttl(
        &self,
        key: impl Into<String>,
        payload: V,
        priority: Priority,
        ttl: Duration,
    ) -> Result<()> {
        let key = key.into();
        let size = payload.weigh();
        let now = Instant::now();
        let expires_at = now.checked_add(ttl);
        let inner = &self.inner;
        let mut state = inner.state.lock();

        let old_size = state.entries.get(&key).map_or(0, |entry| entry.size);
        if size > old_size {
            let needed = size - old_size;
            let available = inner.ledger.available();
            if needed > available {
                let shortfall = needed - available;
                if inner.evictable_bytes(&state, now, Some(&key)) < shortfall {
                    return Err(CacheError::InsufficientMemory {
                        key,
                        size,
                        available: available + old_size,
                    });
                }
                inner.free_at_least(&mut state, now, shortfall, Some(&key));
            }
            inner
                .ledger
                .try_charge_cache(needed)
                .map_err(|_| CacheError::InsufficientMemory {
                    key: key.clone(),
                    size,
                    available: inner.ledger.available() + old_size,
                })?;
        } else {
            inner.ledger.release_cache(old_size - size);
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.bytes = state.bytes - old_size + size;
        state.entries.insert(
            key,
            Entry {
                payload,
                size,
                priority,
                expires_at,
                seq,
            },
        );

        inner.maybe_evict_locked(&mut state, now);
        Ok(())
    }

    /// Payload for `key` if present and not expired. Expired entries are dropped here.
    pub fn lookup(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = self.inner.state.lock();

        let expired = match state.entries.get(key) {
            None => {
                state.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.inner.remove_locked(&mut state, key, Removal::Expired);
            state.misses += 1;
            return None;
        }

        state.hits += 1;
        state.entries.get(key).map(|entry| entry.payload.clone())
    }

    /// Whether a live (unexpired) entry exists. Does not count as a hit or miss.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        let mut state = self.inner.state.lock();
        self.inner.remove_locked(&mut state, key, Removal::Explicit)
    }

    /// Run a threshold sweep now. Returns the number of entries removed.
    pub fn maybe_evict(&self) -> usize {
        let mut state = self.inner.state.lock();
        self.inner.maybe_evict_locked(&mut state, Instant::now())
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    /// Drop every entry that is not `High`, regardless of the threshold.
    pub fn aggressive_clear(&self) -> usize {
        let mut state = self.inner.state.lock();
        let keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.priority != Priority::High)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.inner.remove_locked(&mut state, key, Removal::Evicted);
        }
        if !keys.is_empty() {
            tracing::info!(
                target: "lingua.cache",
                removed = keys.len(),
                remaining = state.entries.len(),
                "aggressively cleared non-high cache entries"
            );
        }
        keys.len()
    }

    /// Drop every entry, `High` included.
    pub fn clear(&self) -> usize {
        let mut state = self.inner.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        let bytes = std::mem::take(&mut state.bytes);
        self.inner.ledger.release_cache(bytes);
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_bytes(&self) -> u64 {
        self.inner.state.lock().bytes
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        let mut stats = CacheStats {
            item_count: state.entries.len(),
            total_bytes: state.bytes,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
            ..CacheStats::default()
        };
        for entry in state.entries.values() {
            let tier = match entry.priority {
                Priority::High => &mut stats.by_priority.high,
                Priority::Medium => &mut stats.by_priority.medium,
                Priority::Low => &mut stats.by_priority.low,
            };
            *tier = TierStats {
                count: tier.count + 1,
                bytes: tier.bytes + entry.size,
            };
        }
        stats
    }

    /// Start the periodic expiry sweep on the current Tokio runtime.
    ///
    /// The sweep holds only a weak reference; it stops doing work once the cache is dropped,
    /// and stops entirely when the returned task is dropped.
    pub fn spawn_sweeper(&self) -> PeriodicTask {
        let weak: Weak<Inner<V>> = Arc::downgrade(&self.inner);
        PeriodicTask::spawn("cache-sweep", self.inner.config.sweep_interval, move || {
            if let Some(inner) = weak.upgrade() {
                inner.sweep_expired();
            }
        })
    }
}

impl<V> Inner<V> {
    fn over_threshold(&self) -> bool {
        let total = self.ledger.total().max(1) as f64;
        (self.ledger.usage() as f64) / total > self.config.eviction_threshold
    }

    fn remove_locked(&self, state: &mut State<V>, key: &str, reason: Removal) -> Option<V> {
        let entry = state.entries.remove(key)?;
        state.bytes -= entry.size;
        self.ledger.release_cache(entry.size);
        match reason {
            Removal::Expired => state.expirations += 1,
            Removal::Evicted => state.evictions += 1,
            Removal::Explicit => {}
        }
        Some(entry.payload)
    }

    fn expired_keys(state: &State<V>, now: Instant) -> Vec<String> {
        state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Keys of live entries in `priority`, oldest first.
    fn tier_keys(state: &State<V>, priority: Priority, now: Instant) -> Vec<String> {
        let mut keys: Vec<(u64, &String)> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.priority == priority && !entry.is_expired(now))
            .map(|(key, entry)| (entry.seq, key))
            .collect();
        keys.sort_unstable_by_key(|(seq, _)| *seq);
        keys.into_iter().map(|(_, key)| key.clone()).collect()
    }

    fn remove_expired_locked(&self, state: &mut State<V>, now: Instant) -> (usize, u64) {
        let mut freed = 0;
        let keys = Self::expired_keys(state, now);
        for key in &keys {
            let size = state.entries.get(key).map_or(0, |entry| entry.size);
            if self.remove_locked(state, key, Removal::Expired).is_some() {
                freed += size;
            }
        }
        (keys.len(), freed)
    }

    fn maybe_evict_locked(&self, state: &mut State<V>, now: Instant) -> usize {
        if !self.over_threshold() {
            return 0;
        }

        let (mut removed, _) = self.remove_expired_locked(state, now);

        'tiers: for priority in EVICTABLE_TIERS {
            for key in Self::tier_keys(state, priority, now) {
                if !self.over_threshold() {
                    break 'tiers;
                }
                if self.remove_locked(state, &key, Removal::Evicted).is_some() {
                    removed += 1;
                }
            }
        }

        tracing::debug!(
            target: "lingua.cache",
            removed,
            usage = self.ledger.usage(),
            total = self.ledger.total(),
            still_over = self.over_threshold(),
            "threshold sweep finished"
        );
        removed
    }

    fn evictable_bytes(&self, state: &State<V>, now: Instant, exclude: Option<&str>) -> u64 {
        state
            .entries
            .iter()
            .filter(|(key, _)| Some(key.as_str()) != exclude)
            .filter(|(_, entry)| entry.is_expired(now) || entry.priority != Priority::High)
            .map(|(_, entry)| entry.size)
            .sum()
    }

    /// Free at least `bytes` (expired first, then `Low` and `Medium` oldest-first), skipping
    /// `exclude`. Returns what was freed, which may be less if the cache runs dry.
    fn free_at_least(
        &self,
        state: &mut State<V>,
        now: Instant,
        bytes: u64,
        exclude: Option<&str>,
    ) -> u64 {
        let mut freed = 0;

        for key in Self::expired_keys(state, now) {
            if Some(key.as_str()) == exclude {
                continue;
            }
            let size = state.entries.get(&key).map_or(0, |entry| entry.size);
            if self.remove_locked(state, &key, Removal::Expired).is_some() {
                freed += size;
            }
        }

        for priority in EVICTABLE_TIERS {
            for key in Self::tier_keys(state, priority, now) {
                if freed >= bytes {
                    return freed;
                }
                if Some(key.as_str()) == exclude {
                    continue;
                }
                let size = state.entries.get(&key).map_or(0, |entry| entry.size);
                if self.remove_locked(state, &key, Removal::Evicted).is_some() {
                    freed += size;
                }
            }
        }
        freed
    }

    fn sweep_expired(&self) -> usize {
        let mut state = self.state.lock();
        let (removed, freed) = self.remove_expired_locked(&mut state, Instant::now());
        if removed > 0 {
            tracing::debug!(
                target: "lingua.cache",
                removed,
                freed_bytes = freed,
                "swept expired cache entries"
            );
        }
        removed
    }
}

impl<V> MemoryReclaimer for Inner<V>
where
    V: Send + Sync,
{
    fn name(&self) -> &str {
        "priority_cache"
    }

    fn reclaimable_bytes(&self) -> u64 {
        let state = self.state.lock();
        self.evictable_bytes(&state, Instant::now(), None)
    }

    fn reclaim(&self, request: ReclaimRequest) -> ReclaimResult {
        let mut state = self.state.lock();
        let freed = self.free_at_least(&mut state, Instant::now(), request.bytes, None);
        ReclaimResult { freed_bytes: freed }
    }
}

impl<V> Drop for Inner<V> {
    fn drop(&mut self) {
        let bytes = self.state.get_mut().bytes;
        self.ledger.release_cache(bytes);
    }
}

use crate::budget::MemoryBudget;
use crate::pressure::{MemoryPressure, MemoryPressureThresholds};
use crate::reclaim::{MemoryReclaimer, ReclaimRequest};
use crate::report::MemoryReport;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient memory: requested {requested} bytes, {available} bytes available")]
    InsufficientMemory { requested: u64, available: u64 },
}

#[derive(Debug, Default, Clone, Copy)]
struct Usage {
    resource: u64,
    pending: u64,
    cache: u64,
}

impl Usage {
    fn committed(self) -> u64 {
        self.resource.saturating_add(self.cache)
    }

    fn claimed(self) -> u64 {
        self.committed().saturating_add(self.pending)
    }
}

struct ReclaimerEntry {
    name: String,
    reclaimer: Weak<dyn MemoryReclaimer>,
}

struct Inner {
    budget: MemoryBudget,
    thresholds: MemoryPressureThresholds,
    usage: Mutex<Usage>,
    next_id: AtomicU64,
    reclaimers: Mutex<BTreeMap<u64, ReclaimerEntry>>,
}

/// Shared bookkeeping of the process-wide memory budget.
///
/// `resource_usage() + cache_usage() <= total()` holds after every committed load and every
/// successful [`BudgetLedger::try_charge_cache`].
#[derive(Clone)]
pub struct BudgetLedger {
    inner: Arc<Inner>,
}

impl BudgetLedger {
    pub fn new(budget: MemoryBudget) -> Self {
        Self::with_thresholds(budget, MemoryPressureThresholds::default())
    }

    pub fn with_thresholds(budget: MemoryBudget, thresholds: MemoryPressureThresholds) -> Self {
        Self {
            inner: Arc::new(Inner {
                budget,
                thresholds,
                usage: Mutex::new(Usage::default()),
                next_id: AtomicU64::new(1),
                reclaimers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    pub fn total(&self) -> u64 {
        self.inner.budget.total
    }

    pub fn resource_usage(&self) -> u64 {
        self.inner.usage.lock().resource
    }

    pub fn pending_usage(&self) -> u64 {
        self.inner.usage.lock().pending
    }

    pub fn cache_usage(&self) -> u64 {
        self.inner.usage.lock().cache
    }

    /// Committed usage: loaded resources plus cache entries.
    pub fn usage(&self) -> u64 {
        self.inner.usage.lock().committed()
    }

    /// Bytes not yet committed or reserved.
    pub fn available(&self) -> u64 {
        self.total().saturating_sub(self.inner.usage.lock().claimed())
    }

    pub fn usage_ratio(&self) -> f64 {
        let total = self.total().max(1);
        (self.usage() as f64) / (total as f64)
    }

    pub fn pressure(&self) -> MemoryPressure {
        self.inner.thresholds.level_for_ratio(self.usage_ratio())
    }

    pub fn report(&self) -> MemoryReport {
        let usage = *self.inner.usage.lock();
        let total = self.total().max(1);
        let ratio = (usage.committed() as f64) / (total as f64);
        MemoryReport {
            budget: self.inner.budget,
            resource_bytes: usage.resource,
            pending_bytes: usage.pending,
            cache_bytes: usage.cache,
            pressure: self.inner.thresholds.level_for_ratio(ratio),
        }
    }

    /// Register a component that can free memory when a load does not fit.
    ///
    /// The ledger only keeps a weak reference; dropping the returned registration (or the
    /// reclaimer itself) removes it.
    pub fn register_reclaimer<R>(&self, name: impl Into<String>, reclaimer: &Arc<R>) -> ReclaimerRegistration
    where
        R: MemoryReclaimer + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let name = name.into();
        let strong: Arc<dyn MemoryReclaimer> = reclaimer.clone();
        self.inner.reclaimers.lock().insert(
            id,
            ReclaimerEntry {
                name: name.clone(),
                reclaimer: Arc::downgrade(&strong),
            },
        );
        ReclaimerRegistration {
            id,
            name,
            ledger: Arc::downgrade(&self.inner),
        }
    }

    /// Admit a resource load of `bytes`.
    ///
    /// The footprint is held as pending until [`ResourceReservation::commit`]. If it does not
    /// fit, registered reclaimers are consulted; they are only asked to free memory when that
    /// would make the load fit. Otherwise the call fails and usage is left untouched.
    pub fn reserve_resource(&self, bytes: u64) -> Result<ResourceReservation, LedgerError> {
        if let Some(reservation) = self.try_reserve(bytes) {
            return Ok(reservation);
        }

        let shortfall = self.shortfall(bytes);
        if bytes > self.total() {
            return Err(self.insufficient(bytes));
        }

        let reclaimers = self.live_reclaimers();
        let reclaimable: u64 = reclaimers
            .iter()
            .map(|(_, reclaimer)| reclaimer.reclaimable_bytes())
            .fold(0, u64::saturating_add);
        if reclaimable < shortfall {
            tracing::debug!(
                target: "lingua.memory",
                requested = bytes,
                shortfall,
                reclaimable,
                "load rejected; reclaimable memory would not cover the shortfall"
            );
            return Err(self.insufficient(bytes));
        }

        let mut remaining = shortfall;
        for (name, reclaimer) in reclaimers {
            if remaining == 0 {
                break;
            }
            let result = reclaimer.reclaim(ReclaimRequest { bytes: remaining });
            tracing::debug!(
                target: "lingua.memory",
                reclaimer = %name,
                requested = remaining,
                freed = result.freed_bytes,
                "reclaimed memory for resource load"
            );
            remaining = remaining.saturating_sub(result.freed_bytes);
        }

        self.try_reserve(bytes)
            .ok_or_else(|| self.insufficient(bytes))
    }

    /// Release the footprint of a committed resource.
    pub fn release_resource(&self, bytes: u64) {
        let mut usage = self.inner.usage.lock();
        usage.resource = usage.resource.saturating_sub(bytes);
    }

    /// Charge cache usage only if the invariant still holds afterwards.
    pub fn try_charge_cache(&self, bytes: u64) -> Result<(), LedgerError> {
        let mut usage = self.inner.usage.lock();
        let total = self.inner.budget.total;
        if usage.claimed().saturating_add(bytes) > total {
            return Err(LedgerError::InsufficientMemory {
                requested: bytes,
                available: total.saturating_sub(usage.claimed()),
            });
        }
        usage.cache += bytes;
        Ok(())
    }

    pub fn release_cache(&self, bytes: u64) {
        let mut usage = self.inner.usage.lock();
        usage.cache = usage.cache.saturating_sub(bytes);
    }

    fn try_reserve(&self, bytes: u64) -> Option<ResourceReservation> {
        let mut usage = self.inner.usage.lock();
        if usage.claimed().saturating_add(bytes) > self.inner.budget.total {
            return None;
        }
        usage.pending += bytes;
        Some(ResourceReservation {
            ledger: self.clone(),
            bytes,
            settled: false,
        })
    }

    fn shortfall(&self, bytes: u64) -> u64 {
        let claimed = self.inner.usage.lock().claimed();
        claimed
            .saturating_add(bytes)
            .saturating_sub(self.inner.budget.total)
    }

    fn insufficient(&self, bytes: u64) -> LedgerError {
        LedgerError::InsufficientMemory {
            requested: bytes,
            available: self.available(),
        }
    }

    fn live_reclaimers(&self) -> Vec<(String, Arc<dyn MemoryReclaimer>)> {
        let mut reclaimers = self.inner.reclaimers.lock();
        reclaimers.retain(|_, entry| entry.reclaimer.strong_count() > 0);
        reclaimers
            .values()
            .filter_map(|entry| {
                entry
                    .reclaimer
                    .upgrade()
                    .map(|reclaimer| (entry.name.clone(), reclaimer))
            })
            .collect()
    }
}

impl std::fmt::Debug for BudgetLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let usage = *self.inner.usage.lock();
        f.debug_struct("BudgetLedger")
            .field("total", &self.inner.budget.total)
            .field("resource", &usage.resource)
            .field("pending", &usage.pending)
            .field("cache", &usage.cache)
            .finish()
    }
}

/// Footprint held for an in-flight load.
///
/// Dropping it without [`ResourceReservation::commit`] returns the bytes to the budget.
#[must_use = "an uncommitted reservation is released on drop"]
pub struct ResourceReservation {
    ledger: BudgetLedger,
    bytes: u64,
    settled: bool,
}

impl ResourceReservation {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Turn the pending footprint into committed resource usage.
    pub fn commit(mut self) {
        let mut usage = self.ledger.inner.usage.lock();
        usage.pending = usage.pending.saturating_sub(self.bytes);
        usage.resource = usage.resource.saturating_add(self.bytes);
        self.settled = true;
    }
}

impl std::fmt::Debug for ResourceReservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceReservation")
            .field("bytes", &self.bytes)
            .field("settled", &self.settled)
            .finish()
    }
}

impl Drop for ResourceReservation {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut usage = self.ledger.inner.usage.lock();
        usage.pending = usage.pending.saturating_sub(self.bytes);
    }
}

/// Handle kept by the registering component; dropping it unregisters the reclaimer.
pub struct ReclaimerRegistration {
    id: u64,
    name: String,
    ledger: Weak<Inner>,
}

impl ReclaimerRegistration {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for ReclaimerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReclaimerRegistration")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl Drop for ReclaimerRegistration {
    fn drop(&mut self) {
        if let Some(ledger) = self.ledger.upgrade() {
            ledger.reclaimers.lock().remove(&self.id);
        }
    }
}

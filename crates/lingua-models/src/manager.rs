use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use lingua_memory::{BudgetLedger, LedgerError, ResourceReservation};
use lingua_scheduler::{run_isolated, run_with_timeout, CancellableTimer, TaskError};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::lease::ResourceLease;
use crate::loader::{ModelHandle, ModelLoader};
use crate::status::{ResourceSnapshot, ResourceStatus};
use crate::{ResourceDescriptor, ResourceError, ResourceId};

/// `None` until the load settles.
type LoadOutcome = Option<Result<(), ResourceError>>;

type LoadResult = Result<Result<Result<ModelHandle, String>, TaskError>, TaskError>;

const ABANDONED: &str = "unloaded while loading";

struct SlotState {
    status: ResourceStatus,
    last_used_at: Option<SystemTime>,
    model: Option<ModelHandle>,
    /// Present exactly while `status` is `Loading`.
    inflight: Option<watch::Receiver<LoadOutcome>>,
    /// Bumped when a load starts or is abandoned. Identifies the current load and the
    /// leases handed out from it.
    generation: u64,
    active_leases: usize,
    last_error: Option<String>,
    idle_timer: CancellableTimer,
    /// Bumped on every arm and cancel; a firing with a stale epoch does nothing.
    idle_epoch: u64,
}

impl SlotState {
    fn new() -> Self {
        Self {
            status: ResourceStatus::Unloaded,
            last_used_at: None,
            model: None,
            inflight: None,
            generation: 0,
            active_leases: 0,
            last_error: None,
            idle_timer: CancellableTimer::new(),
            idle_epoch: 0,
        }
    }
}

struct Slot {
    descriptor: ResourceDescriptor,
    loader: Arc<dyn ModelLoader>,
    state: Mutex<SlotState>,
}

pub(crate) struct Inner {
    ledger: BudgetLedger,
    slots: BTreeMap<ResourceId, Slot>,
    backgrounded: AtomicBool,
    this: Weak<Inner>,
}

/// Owns every resource slot and drives it through its lifecycle.
///
/// Cheap to clone. The set of resources is fixed when the manager is built.
#[derive(Clone)]
pub struct ResourceManager {
    inner: Arc<Inner>,
}

pub struct ResourceManagerBuilder {
    ledger: BudgetLedger,
    resources: Vec<(ResourceDescriptor, Arc<dyn ModelLoader>)>,
}

impl ResourceManagerBuilder {
    pub fn resource(mut self, descriptor: ResourceDescriptor, loader: Arc<dyn ModelLoader>) -> Self {
        self.resources.push((descriptor, loader));
        self
    }

    pub fn build(self) -> ResourceManager {
        let mut slots = BTreeMap::new();
        for (descriptor, loader) in self.resources {
            let id = descriptor.id.clone();
            let slot = Slot {
                descriptor,
                loader,
                state: Mutex::new(SlotState::new()),
            };
            if slots.insert(id.clone(), slot).is_some() {
                tracing::warn!(
                    target: "lingua.models",
                    resource = %id,
                    "resource registered twice; keeping the last descriptor"
                );
            }
        }

        let ledger = self.ledger;
        ResourceManager {
            inner: Arc::new_cyclic(|this| Inner {
                ledger,
                slots,
                backgrounded: AtomicBool::new(false),
                this: this.clone(),
            }),
        }
    }
}

impl ResourceManager {
    pub fn builder(ledger: BudgetLedger) -> ResourceManagerBuilder {
        ResourceManagerBuilder {
            ledger,
            resources: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &BudgetLedger {
        &self.inner.ledger
    }

    pub fn descriptor(&self, id: &ResourceId) -> Option<&ResourceDescriptor> {
        self.inner.slots.get(id).map(|slot| &slot.descriptor)
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = &ResourceId> + '_ {
        self.inner.slots.keys()
    }

    /// Make sure `id` is loaded and lease it.
    ///
    /// Concurrent callers share a single in-flight load and all observe its outcome. A load
    /// that does not fit in the budget fails with [`ResourceError::InsufficientMemory`]
    /// before the resource ever enters `Loading`.
    pub async fn ensure_loaded(&self, id: &ResourceId) -> Result<ResourceLease, ResourceError> {
        let slot = self.inner.slot(id)?;

        loop {
            let mut receiver = {
                let mut state = slot.state.lock();
                if state.status.is_loaded() {
                    if let Some(model) = state.model.clone() {
                        return Ok(self.inner.lease_locked(slot, &mut state, model));
                    }
                }
                match state.inflight.clone() {
                    Some(receiver) => receiver,
                    None => self.inner.start_load_locked(slot, &mut state)?,
                }
            };

            let outcome = receiver
                .wait_for(Option::is_some)
                .await
                .map(|outcome| (*outcome).clone());
            match outcome {
                Ok(Some(Err(err))) => return Err(err),
                Ok(_) => {}
                Err(_) => {
                    return Err(ResourceError::LoadFailure {
                        resource: id.clone(),
                        reason: "load task ended without reporting a result".to_owned(),
                    })
                }
            }
        }
    }

    /// Unload `id` if it is `Loaded` (or stuck in `Error`). Returns whether anything changed.
    ///
    /// A resource that is still `Loading` is left alone; use
    /// [`ResourceManager::force_unload_all`] to abandon in-flight loads.
    pub fn unload(&self, id: &ResourceId) -> Result<bool, ResourceError> {
        let slot = self.inner.slot(id)?;
        let (changed, model) = {
            let mut state = slot.state.lock();
            match state.status {
                ResourceStatus::Loading => {
                    tracing::debug!(
                        target: "lingua.models",
                        resource = %id,
                        "ignoring unload of a resource that is still loading"
                    );
                    (false, None)
                }
                ResourceStatus::Unloaded => (false, None),
                ResourceStatus::Loaded | ResourceStatus::Error(_) => {
                    (true, self.inner.unload_locked(slot, &mut state, "explicit"))
                }
            }
        };
        self.inner.release_model(slot, model);
        Ok(changed)
    }

    /// Unload every resource regardless of timers or leases, abandoning in-flight loads.
    ///
    /// Returns how many resources were `Loaded` or `Loading`.
    pub fn force_unload_all(&self) -> usize {
        let mut affected = 0;
        for slot in self.inner.slots.values() {
            let model = {
                let mut state = slot.state.lock();
                match state.status {
                    ResourceStatus::Loading => {
                        affected += 1;
                        self.inner.abandon_locked(slot, &mut state);
                        None
                    }
                    ResourceStatus::Loaded => {
                        affected += 1;
                        self.inner.unload_locked(slot, &mut state, "forced")
                    }
                    ResourceStatus::Error(_) => self.inner.unload_locked(slot, &mut state, "forced"),
                    ResourceStatus::Unloaded => {
                        self.inner.cancel_idle_locked(&mut state);
                        None
                    }
                }
            };
            self.inner.release_model(slot, model);
        }
        tracing::info!(target: "lingua.models", affected, "forced unload of all resources");
        affected
    }

    /// While backgrounded, idle timers are not armed and dropping the last lease of a
    /// resource unloads it on the spot. Leaving the background arms timers for anything
    /// that was loaded in the meantime; nothing is reloaded eagerly.
    pub fn set_backgrounded(&self, backgrounded: bool) {
        let previous = self.inner.backgrounded.swap(backgrounded, Ordering::SeqCst);
        if previous == backgrounded {
            return;
        }
        for slot in self.inner.slots.values() {
            let mut state = slot.state.lock();
            if backgrounded {
                self.inner.cancel_idle_locked(&mut state);
            } else {
                self.inner.arm_idle_locked(slot, &mut state);
            }
        }
        tracing::debug!(target: "lingua.models", backgrounded, "background mode changed");
    }

    pub fn is_backgrounded(&self) -> bool {
        self.inner.is_backgrounded()
    }

    /// Cancel all pending idle timers without unloading anything.
    pub fn cancel_idle_timers(&self) {
        for slot in self.inner.slots.values() {
            self.inner.cancel_idle_locked(&mut slot.state.lock());
        }
    }

    pub fn status(&self, id: &ResourceId) -> Option<ResourceSnapshot> {
        self.inner.slots.get(id).map(Slot::snapshot)
    }

    pub fn statuses(&self) -> Vec<ResourceSnapshot> {
        self.inner.slots.values().map(Slot::snapshot).collect()
    }

    pub fn loaded_count(&self) -> usize {
        self.inner
            .slots
            .values()
            .filter(|slot| slot.state.lock().status.is_loaded())
            .count()
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("resources", &self.inner.slots.keys().collect::<Vec<_>>())
            .field("backgrounded", &self.is_backgrounded())
            .finish()
    }
}

impl Slot {
    fn snapshot(&self) -> ResourceSnapshot {
        let state = self.state.lock();
        ResourceSnapshot {
            id: self.descriptor.id.clone(),
            status: state.status.clone(),
            last_used_at: state.last_used_at,
            footprint_bytes: self.descriptor.footprint_bytes,
            active_leases: state.active_leases,
            last_error: state.last_error.clone(),
        }
    }
}

impl Inner {
    fn slot(&self, id: &ResourceId) -> Result<&Slot, ResourceError> {
        self.slots
            .get(id)
            .ok_or_else(|| ResourceError::UnknownResource(id.clone()))
    }

    fn is_backgrounded(&self) -> bool {
        self.backgrounded.load(Ordering::SeqCst)
    }

    fn lease_locked(&self, slot: &Slot, state: &mut SlotState, model: ModelHandle) -> ResourceLease {
        state.active_leases += 1;
        state.last_used_at = Some(SystemTime::now());
        self.cancel_idle_locked(state);
        ResourceLease::new(
            self.this.clone(),
            slot.descriptor.id.clone(),
            state.generation,
            model,
        )
    }

    fn start_load_locked(
        &self,
        slot: &Slot,
        state: &mut SlotState,
    ) -> Result<watch::Receiver<LoadOutcome>, ResourceError> {
        let descriptor = &slot.descriptor;
        let reservation = self
            .ledger
            .reserve_resource(descriptor.footprint_bytes)
            .map_err(|err| match err {
                LedgerError::InsufficientMemory {
                    requested,
                    available,
                } => ResourceError::InsufficientMemory {
                    resource: descriptor.id.clone(),
                    requested,
                    available,
                },
            })
            .inspect_err(|err| {
                tracing::warn!(target: "lingua.models", resource = %descriptor.id, error = %err, "load rejected");
            })?;

        let Some(manager) = self.this.upgrade() else {
            return Err(ResourceError::LoadFailure {
                resource: descriptor.id.clone(),
                reason: "resource manager is shutting down".to_owned(),
            });
        };

        let (sender, receiver) = watch::channel(None);
        state.generation += 1;
        state.status = ResourceStatus::Loading;
        state.inflight = Some(receiver.clone());
        self.cancel_idle_locked(state);

        tracing::info!(
            target: "lingua.models",
            resource = %descriptor.id,
            footprint = descriptor.footprint_bytes,
            timeout = ?descriptor.load_timeout,
            "loading resource"
        );

        let generation = state.generation;
        let loader = Arc::clone(&slot.loader);
        let descriptor = descriptor.clone();
        tokio::spawn(async move {
            let id = descriptor.id.clone();
            let timeout = descriptor.load_timeout;
            let result = run_isolated(async move {
                run_with_timeout(timeout, loader.load(&descriptor)).await
            })
            .await;
            manager.finish_load(&id, generation, reservation, result, sender);
        });

        Ok(receiver)
    }

    fn finish_load(
        &self,
        id: &ResourceId,
        generation: u64,
        reservation: ResourceReservation,
        result: LoadResult,
        sender: watch::Sender<LoadOutcome>,
    ) {
        let Some(slot) = self.slots.get(id) else {
            return;
        };

        let outcome = match result {
            Ok(Ok(Ok(model))) => Ok(model),
            Ok(Ok(Err(reason))) => Err(ResourceError::LoadFailure {
                resource: id.clone(),
                reason,
            }),
            Ok(Err(TaskError::DeadlineExceeded(timeout))) => Err(ResourceError::LoadTimeout {
                resource: id.clone(),
                timeout,
            }),
            Ok(Err(err)) | Err(err) => Err(ResourceError::LoadFailure {
                resource: id.clone(),
                reason: err.to_string(),
            }),
        };

        let mut orphan = None;
        let reported = {
            let mut state = slot.state.lock();
            if state.generation != generation || state.status != ResourceStatus::Loading {
                drop(reservation);
                orphan = outcome.ok();
                tracing::info!(target: "lingua.models", resource = %id, "discarded abandoned load");
                Err(ResourceError::LoadFailure {
                    resource: id.clone(),
                    reason: ABANDONED.to_owned(),
                })
            } else {
                state.inflight = None;
                match outcome {
                    Ok(model) => {
                        reservation.commit();
                        state.status = ResourceStatus::Loaded;
                        state.model = Some(model);
                        state.active_leases = 0;
                        state.last_used_at = Some(SystemTime::now());
                        state.last_error = None;
                        self.arm_idle_locked(slot, &mut state);
                        tracing::info!(
                            target: "lingua.models",
                            resource = %id,
                            resource_bytes = self.ledger.resource_usage(),
                            "resource loaded"
                        );
                        Ok(())
                    }
                    Err(err) => {
                        drop(reservation);
                        let reason = err.to_string();
                        state.status = ResourceStatus::Error(reason.clone());
                        tracing::warn!(target: "lingua.models", resource = %id, error = %reason, "resource load failed");
                        state.status = ResourceStatus::Unloaded;
                        state.last_error = Some(reason);
                        Err(err)
                    }
                }
            }
        };

        self.release_model(slot, orphan);
        let _ = sender.send(Some(reported));
    }

    pub(crate) fn release_lease(&self, id: &ResourceId, generation: u64) {
        let Some(slot) = self.slots.get(id) else {
            return;
        };
        let model = {
            let mut state = slot.state.lock();
            if state.generation != generation || !state.status.is_loaded() {
                return;
            }
            state.active_leases = state.active_leases.saturating_sub(1);
            state.last_used_at = Some(SystemTime::now());
            if state.active_leases > 0 {
                return;
            }
            if self.is_backgrounded() {
                self.unload_locked(slot, &mut state, "released while backgrounded")
            } else {
                self.arm_idle_locked(slot, &mut state);
                None
            }
        };
        self.release_model(slot, model);
    }

    fn arm_idle_locked(&self, slot: &Slot, state: &mut SlotState) {
        if self.is_backgrounded() || state.active_leases > 0 || !state.status.is_loaded() {
            return;
        }
        state.idle_epoch += 1;
        let epoch = state.idle_epoch;
        let manager = self.this.clone();
        let id = slot.descriptor.id.clone();
        state
            .idle_timer
            .arm(slot.descriptor.idle_unload_delay, move || {
                if let Some(manager) = manager.upgrade() {
                    manager.idle_expired(&id, epoch);
                }
            });
    }

    fn cancel_idle_locked(&self, state: &mut SlotState) {
        state.idle_epoch += 1;
        state.idle_timer.cancel();
    }

    fn idle_expired(&self, id: &ResourceId, epoch: u64) {
        let Some(slot) = self.slots.get(id) else {
            return;
        };
        let model = {
            let mut state = slot.state.lock();
            if state.idle_epoch != epoch || state.active_leases > 0 || !state.status.is_loaded() {
                return;
            }
            self.unload_locked(slot, &mut state, "idle")
        };
        self.release_model(slot, model);
    }

    /// `Loaded` or `Error` to `Unloaded`. Returns the model for the caller to release once
    /// the slot lock is dropped.
    fn unload_locked(&self, slot: &Slot, state: &mut SlotState, reason: &'static str) -> Option<ModelHandle> {
        self.cancel_idle_locked(state);
        let model = match state.status {
            ResourceStatus::Loaded => {
                self.ledger.release_resource(slot.descriptor.footprint_bytes);
                state.model.take()
            }
            ResourceStatus::Error(_) => None,
            ResourceStatus::Loading | ResourceStatus::Unloaded => return None,
        };
        state.status = ResourceStatus::Unloaded;
        state.active_leases = 0;
        tracing::info!(
            target: "lingua.models",
            resource = %slot.descriptor.id,
            reason,
            resource_bytes = self.ledger.resource_usage(),
            "resource unloaded"
        );
        model
    }

    fn abandon_locked(&self, slot: &Slot, state: &mut SlotState) {
        self.cancel_idle_locked(state);
        state.generation += 1;
        state.status = ResourceStatus::Unloaded;
        state.inflight = None;
        tracing::info!(target: "lingua.models", resource = %slot.descriptor.id, "abandoned in-flight load");
    }

    fn release_model(&self, slot: &Slot, model: Option<ModelHandle>) {
        if let Some(model) = model {
            slot.loader.release(&slot.descriptor, model);
        }
    }
}

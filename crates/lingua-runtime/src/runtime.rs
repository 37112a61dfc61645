use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use lingua_cache::{CacheStats, PriorityCache};
use lingua_config::{JsonFilePreferenceStore, LinguaConfig, MemoryPreferenceStore, PreferenceError, PreferenceStore};
use lingua_memory::{BudgetLedger, MemoryReport};
use lingua_models::{
    ExecutionQueue, ModelLoader, ResourceId, ResourceLease, ResourceManager, ResourceSnapshot, Submission,
};
use lingua_scheduler::PeriodicTask;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{CachePayload, LifecycleSignal, RuntimeError, SignalBridge, SignalOutcome};

/// Preference key holding the user's target language.
pub const TARGET_LANGUAGE_KEY: &str = "target_language";
pub const DEFAULT_TARGET_LANGUAGE: &str = "es";

/// What [`LinguaRuntime::force_cleanup`] released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub resources_unloaded: usize,
    pub cache_entries_removed: usize,
}

pub struct LinguaRuntimeBuilder {
    config: LinguaConfig,
    loaders: HashMap<ResourceId, Arc<dyn ModelLoader>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
}

impl LinguaRuntimeBuilder {
    /// Register the loader for a configured resource.
    pub fn loader(mut self, id: impl Into<ResourceId>, loader: Arc<dyn ModelLoader>) -> Self {
        self.loaders.insert(id.into(), loader);
        self
    }

    /// Use `store` instead of the one described by `[preferences]`.
    pub fn preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    /// Wire every service together. Must be called from within a tokio runtime; the cache
    /// sweeper starts immediately.
    pub fn build(self) -> Result<LinguaRuntime, RuntimeError> {
        let Self {
            config,
            mut loaders,
            preferences,
        } = self;

        let validation = config.validate();
        if !validation.errors.is_empty() {
            return Err(RuntimeError::InvalidConfig(
                validation.errors.iter().map(ToString::to_string).collect(),
            ));
        }
        for warning in &validation.warnings {
            tracing::warn!(target: "lingua.runtime", %warning, "configuration warning");
        }

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(RuntimeError::NoAsyncRuntime);
        }

        let preferences: Arc<dyn PreferenceStore> = match (preferences, &config.preferences.path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(JsonFilePreferenceStore::open(path)?),
            (None, None) => Arc::new(MemoryPreferenceStore::new()),
        };
        let target_language = preferences
            .get(TARGET_LANGUAGE_KEY)?
            .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string());

        let ledger = BudgetLedger::with_thresholds(config.memory_budget(), config.memory.pressure);

        let mut manager = ResourceManager::builder(ledger.clone());
        for descriptor in config.resource_descriptors() {
            let loader = loaders
                .remove(&descriptor.id)
                .ok_or_else(|| RuntimeError::MissingLoader(descriptor.id.clone()))?;
            manager = manager.resource(descriptor, loader);
        }
        for id in loaders.keys() {
            tracing::warn!(target: "lingua.runtime", resource = %id, "ignoring loader for unconfigured resource");
        }
        let manager = manager.build();

        let queue = ExecutionQueue::new(manager.clone());
        let cache = PriorityCache::new(ledger.clone(), config.cache_config());
        let sweeper = cache.spawn_sweeper();
        let bridge = SignalBridge::new(manager.clone(), cache.clone());

        tracing::info!(
            target: "lingua.runtime",
            budget_bytes = ledger.total(),
            resources = manager.resource_ids().count(),
            %target_language,
            "runtime ready"
        );

        Ok(LinguaRuntime {
            config,
            ledger,
            manager,
            queue,
            cache,
            bridge,
            sweeper: Mutex::new(Some(sweeper)),
            preferences,
            target_language: RwLock::new(target_language),
        })
    }
}

/// The assembled Lingua services.
pub struct LinguaRuntime {
    config: LinguaConfig,
    ledger: BudgetLedger,
    manager: ResourceManager,
    queue: ExecutionQueue,
    cache: PriorityCache<CachePayload>,
    bridge: SignalBridge<CachePayload>,
    sweeper: Mutex<Option<PeriodicTask>>,
    preferences: Arc<dyn PreferenceStore>,
    target_language: RwLock<String>,
}

impl LinguaRuntime {
    pub fn builder(config: LinguaConfig) -> LinguaRuntimeBuilder {
        LinguaRuntimeBuilder {
            config,
            loaders: HashMap::new(),
            preferences: None,
        }
    }

    pub fn config(&self) -> &LinguaConfig {
        &self.config
    }

    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    pub fn manager(&self) -> &ResourceManager {
        &self.manager
    }

    pub fn queue(&self) -> &ExecutionQueue {
        &self.queue
    }

    pub fn cache(&self) -> &PriorityCache<CachePayload> {
        &self.cache
    }

    pub fn signal_bridge(&self) -> &SignalBridge<CachePayload> {
        &self.bridge
    }

    /// See [`ExecutionQueue::submit`].
    pub fn submit<F, Fut, T, E>(&self, resource_id: impl Into<ResourceId>, op: F) -> Submission<T>
    where
        F: FnOnce(ResourceLease) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.queue.submit(resource_id, op)
    }

    pub fn resource_status(&self, id: &ResourceId) -> Option<ResourceSnapshot> {
        self.manager.status(id)
    }

    pub fn resource_statuses(&self) -> Vec<ResourceSnapshot> {
        self.manager.statuses()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn memory_report(&self) -> MemoryReport {
        self.ledger.report()
    }

    pub fn on_signal(&self, signal: LifecycleSignal) -> SignalOutcome {
        self.bridge.on_signal(signal)
    }

    /// Forward every value of `signals` to the signal bridge on a background task.
    pub fn spawn_signal_listener(&self, signals: watch::Receiver<LifecycleSignal>) -> JoinHandle<()> {
        let bridge = self.bridge.clone();
        tokio::spawn(async move { bridge.listen(signals).await })
    }

    /// Drop every cache entry, `High` included, and unload every resource.
    pub fn force_cleanup(&self) -> CleanupReport {
        let report = CleanupReport {
            cache_entries_removed: self.cache.clear(),
            resources_unloaded: self.manager.force_unload_all(),
        };
        tracing::info!(
            target: "lingua.runtime",
            resources_unloaded = report.resources_unloaded,
            cache_entries_removed = report.cache_entries_removed,
            "forced cleanup"
        );
        report
    }

    pub fn target_language(&self) -> String {
        self.target_language.read().clone()
    }

    /// Persist and adopt a new target language. Unchanged values are not written.
    pub fn set_target_language(&self, language: &str) -> Result<(), PreferenceError> {
        if *self.target_language.read() == language {
            return Ok(());
        }
        self.preferences.set(TARGET_LANGUAGE_KEY, language)?;
        *self.target_language.write() = language.to_string();
        tracing::debug!(target: "lingua.runtime", %language, "target language changed");
        Ok(())
    }

    /// Stop the cache sweeper, cancel idle timers and close the queue. Loaded resources stay
    /// loaded until [`force_cleanup`](Self::force_cleanup) or drop.
    pub fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
        }
        self.manager.cancel_idle_timers();
        let dropped = self.queue.close();
        tracing::info!(target: "lingua.runtime", dropped_tasks = dropped, "runtime shut down");
    }
}

impl std::fmt::Debug for LinguaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinguaRuntime")
            .field("manager", &self.manager)
            .field("queue", &self.queue)
            .field("target_language", &*self.target_language.read())
            .finish_non_exhaustive()
    }
}

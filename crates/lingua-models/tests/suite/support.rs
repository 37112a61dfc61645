use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lingua_memory::{BudgetLedger, MemoryBudget};
use lingua_models::{BoxFuture, ModelHandle, ModelLoader, ResourceDescriptor, ResourceManager};

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    Fail(&'static str),
    Hang,
}

/// Loader whose outcome can be changed between loads.
pub struct ScriptedLoader {
    delay: Duration,
    behavior: Mutex<Behavior>,
    loads: AtomicUsize,
    releases: AtomicUsize,
}

impl ScriptedLoader {
    pub fn new(delay: Duration) -> Arc<Self> {
        Self::with_behavior(delay, Behavior::Succeed)
    }

    pub fn with_behavior(delay: Duration, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            delay,
            behavior: Mutex::new(behavior),
            loads: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ModelLoader for ScriptedLoader {
    fn load(&self, descriptor: &ResourceDescriptor) -> BoxFuture<'static, Result<ModelHandle, String>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock().unwrap();
        let delay = self.delay;
        let name = format!("{}-model", descriptor.id);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            match behavior {
                Behavior::Succeed => Ok(ModelHandle::new(name)),
                Behavior::Fail(reason) => Err(reason.to_owned()),
                Behavior::Hang => std::future::pending().await,
            }
        })
    }

    fn release(&self, _descriptor: &ResourceDescriptor, _handle: ModelHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn descriptor(id: &str, footprint: u64) -> ResourceDescriptor {
    ResourceDescriptor::new(id, footprint)
        .with_load_timeout(Duration::from_secs(5))
        .with_idle_unload_delay(Duration::from_secs(30))
}

pub fn manager_with(
    total: u64,
    resources: Vec<(ResourceDescriptor, Arc<ScriptedLoader>)>,
) -> ResourceManager {
    let mut builder = ResourceManager::builder(BudgetLedger::new(MemoryBudget::from_total(total)));
    for (descriptor, loader) in resources {
        builder = builder.resource(descriptor, loader);
    }
    builder.build()
}

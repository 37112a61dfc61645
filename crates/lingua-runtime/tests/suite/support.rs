use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lingua_config::LinguaConfig;
use lingua_models::{BoxFuture, ModelHandle, ModelLoader, ResourceDescriptor};
use lingua_runtime::{LinguaRuntime, LinguaRuntimeBuilder};

/// Loader that succeeds after a fixed delay and counts loads and releases.
#[derive(Default)]
pub struct CountingLoader {
    loads: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ModelLoader for CountingLoader {
    fn load(&self, descriptor: &ResourceDescriptor) -> BoxFuture<'static, Result<ModelHandle, String>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let name = descriptor.id.to_string();
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(ModelHandle::new(name))
        })
    }

    fn release(&self, _descriptor: &ResourceDescriptor, _handle: ModelHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub const SMALL_CONFIG: &str = r#"
[memory]
total_bytes = 1000

[cache]
ttl_ms = 60000
eviction_threshold = 0.8
sweep_interval_ms = 1000

[[resources]]
id = "translation"
footprint_bytes = 150
load_timeout_ms = 5000
idle_unload_delay_ms = 30000

[[resources]]
id = "speech"
footprint_bytes = 80
load_timeout_ms = 5000
idle_unload_delay_ms = 30000
"#;

pub fn small_config() -> LinguaConfig {
    let (config, diagnostics) = LinguaConfig::load_from_str_with_diagnostics(SMALL_CONFIG).unwrap();
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    config
}

pub fn builder_with(config: LinguaConfig, loader: &Arc<CountingLoader>) -> LinguaRuntimeBuilder {
    LinguaRuntime::builder(config)
        .loader("translation", loader.clone())
        .loader("speech", loader.clone())
}

pub fn runtime(loader: &Arc<CountingLoader>) -> LinguaRuntime {
    builder_with(small_config(), loader).build().unwrap()
}

/// Load `resource` through the queue and wait for the operation to finish.
pub async fn touch(runtime: &LinguaRuntime, resource: &'static str) {
    runtime
        .submit(resource, |_lease| async { Ok::<_, String>(()) })
        .await
        .unwrap();
}

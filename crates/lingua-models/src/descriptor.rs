use std::borrow::{Borrow, Cow};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of a swappable model resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Cow<'static, str>);

impl ResourceId {
    pub const TRANSLATION: ResourceId = ResourceId(Cow::Borrowed("translation"));
    pub const SPEECH: ResourceId = ResourceId(Cow::Borrowed("speech"));

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(id: &ResourceId) -> Self {
        id.clone()
    }
}

/// Static configuration of a resource. Created once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    /// Bytes committed to the ledger while the resource is loaded.
    pub footprint_bytes: u64,
    pub load_timeout: Duration,
    pub idle_unload_delay: Duration,
}

impl ResourceDescriptor {
    pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_IDLE_UNLOAD_DELAY: Duration = Duration::from_secs(5 * 60);

    pub fn new(id: impl Into<ResourceId>, footprint_bytes: u64) -> Self {
        Self {
            id: id.into(),
            footprint_bytes,
            load_timeout: Self::DEFAULT_LOAD_TIMEOUT,
            idle_unload_delay: Self::DEFAULT_IDLE_UNLOAD_DELAY,
        }
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn with_idle_unload_delay(mut self, delay: Duration) -> Self {
        self.idle_unload_delay = delay;
        self
    }

    /// 150 MiB translation model, unloaded after five idle minutes.
    pub fn translation() -> Self {
        Self::new(ResourceId::TRANSLATION, 150 * lingua_memory::MB)
    }

    /// 80 MiB speech synthesis model, unloaded after two idle minutes.
    pub fn speech() -> Self {
        Self::new(ResourceId::SPEECH, 80 * lingua_memory::MB)
            .with_idle_unload_delay(Duration::from_secs(2 * 60))
    }
}

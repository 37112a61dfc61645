use std::fmt;
use std::str::FromStr;

use lingua_cache::{PriorityCache, Weigh};
use lingua_models::ResourceManager;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Host-platform lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleSignal {
    Foregrounded,
    Backgrounded,
}

impl fmt::Display for LifecycleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleSignal::Foregrounded => f.write_str("foregrounded"),
            LifecycleSignal::Backgrounded => f.write_str("backgrounded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lifecycle signal `{0}` (expected `foreground` or `background`)")]
pub struct ParseSignalError(String);

impl FromStr for LifecycleSignal {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foreground" | "foregrounded" => Ok(LifecycleSignal::Foregrounded),
            "background" | "backgrounded" => Ok(LifecycleSignal::Backgrounded),
            _ => Err(ParseSignalError(s.to_string())),
        }
    }
}

/// What a signal released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalOutcome {
    pub resources_unloaded: usize,
    pub cache_entries_evicted: usize,
}

/// Translates lifecycle signals into resource-manager and cache actions.
///
/// Backgrounding unloads every resource and drops all non-`High` cache entries. Foregrounding
/// only clears the backgrounded flag; resources reload lazily on the next use.
pub struct SignalBridge<V> {
    manager: ResourceManager,
    cache: PriorityCache<V>,
}

impl<V> Clone for SignalBridge<V> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<V> SignalBridge<V>
where
    V: Weigh + Clone + Send + Sync + 'static,
{
    pub fn new(manager: ResourceManager, cache: PriorityCache<V>) -> Self {
        Self { manager, cache }
    }

    pub fn on_signal(&self, signal: LifecycleSignal) -> SignalOutcome {
        match signal {
            LifecycleSignal::Backgrounded => {
                // Flag first so leases released after this point unload instead of re-arming.
                self.manager.set_backgrounded(true);
                let outcome = SignalOutcome {
                    resources_unloaded: self.manager.force_unload_all(),
                    cache_entries_evicted: self.cache.aggressive_clear(),
                };
                tracing::info!(
                    target: "lingua.runtime",
                    resources_unloaded = outcome.resources_unloaded,
                    cache_entries_evicted = outcome.cache_entries_evicted,
                    "backgrounded; released memory"
                );
                outcome
            }
            LifecycleSignal::Foregrounded => {
                self.manager.set_backgrounded(false);
                tracing::info!(target: "lingua.runtime", "foregrounded");
                SignalOutcome::default()
            }
        }
    }

    /// Apply the channel's current value, then every change, until the sender is dropped.
    pub async fn listen(&self, mut signals: watch::Receiver<LifecycleSignal>) {
        loop {
            let signal = *signals.borrow_and_update();
            self.on_signal(signal);
            if signals.changed().await.is_err() {
                tracing::debug!(target: "lingua.runtime", "lifecycle signal source closed");
                return;
            }
        }
    }
}

impl<V> fmt::Debug for SignalBridge<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBridge")
            .field("backgrounded", &self.manager.is_backgrounded())
            .finish_non_exhaustive()
    }
}

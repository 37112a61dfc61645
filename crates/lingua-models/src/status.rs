use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ResourceStatus {
    Unloaded,
    Loading,
    Loaded,
    /// Transient; a failed load passes through here on its way back to `Unloaded`.
    Error(String),
}

impl ResourceStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ResourceStatus::Loaded)
    }
}

/// Point-in-time view of one resource slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: ResourceId,
    pub status: ResourceStatus,
    pub last_used_at: Option<SystemTime>,
    pub footprint_bytes: u64,
    pub active_leases: usize,
    pub last_error: Option<String>,
}

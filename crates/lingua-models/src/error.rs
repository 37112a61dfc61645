use std::time::Duration;

use crate::ResourceId;

/// Failures reported to callers of the manager and the execution queue.
///
/// None of these are fatal; the resource involved is always left in a consistent state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("unknown resource `{0}`")]
    UnknownResource(ResourceId),
    #[error(
        "not enough memory to load `{resource}`: needs {requested} bytes, {available} bytes available"
    )]
    InsufficientMemory {
        resource: ResourceId,
        requested: u64,
        available: u64,
    },
    #[error("loading `{resource}` did not finish within {timeout:?}")]
    LoadTimeout {
        resource: ResourceId,
        timeout: Duration,
    },
    #[error("failed to load `{resource}`: {reason}")]
    LoadFailure { resource: ResourceId, reason: String },
    #[error("operation failed: {0}")]
    OperationFailure(String),
    #[error("execution queue is closed")]
    QueueClosed,
    #[error("work for `{0}` was submitted outside a tokio runtime")]
    NoAsyncRuntime(ResourceId),
}

impl ResourceError {
    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResourceError::InsufficientMemory { .. } | ResourceError::LoadTimeout { .. }
        )
    }

    /// Resource the failure concerns, when it is tied to one.
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            ResourceError::UnknownResource(resource)
            | ResourceError::InsufficientMemory { resource, .. }
            | ResourceError::LoadTimeout { resource, .. }
            | ResourceError::LoadFailure { resource, .. }
            | ResourceError::NoAsyncRuntime(resource) => Some(resource),
            ResourceError::OperationFailure(_) | ResourceError::QueueClosed => None,
        }
    }
}

use std::any::Any;
use std::fmt;
use std::sync::Weak;

use crate::loader::ModelHandle;
use crate::manager::Inner;
use crate::ResourceId;

/// Proof that a resource is loaded, held for the duration of an operation.
///
/// While any lease is outstanding the idle timer cannot unload the resource. Dropping the
/// last lease refreshes the resource's last-used time and re-arms its idle timer.
pub struct ResourceLease {
    manager: Weak<Inner>,
    id: ResourceId,
    generation: u64,
    model: ModelHandle,
}

impl ResourceLease {
    pub(crate) fn new(manager: Weak<Inner>, id: ResourceId, generation: u64, model: ModelHandle) -> Self {
        Self {
            manager,
            id,
            generation,
            model,
        }
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.model.downcast_ref::<T>()
    }
}

impl fmt::Debug for ResourceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLease")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.release_lease(&self.id, self.generation);
        }
    }
}

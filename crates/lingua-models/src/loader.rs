use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::ResourceDescriptor;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased handle to a loaded model. Clones share the same model.
#[derive(Clone)]
pub struct ModelHandle(Arc<dyn Any + Send + Sync>);

impl ModelHandle {
    pub fn new<T>(model: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Arc::new(model))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Arc::clone(&self.0).downcast().ok()
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle").finish_non_exhaustive()
    }
}

/// Backend that materializes a resource.
///
/// `load` must not block; it returns a future the manager drives under the descriptor's
/// `load_timeout`. Errors are plain strings and surface as `ResourceError::LoadFailure`.
pub trait ModelLoader: Send + Sync {
    fn load(&self, descriptor: &ResourceDescriptor) -> BoxFuture<'static, Result<ModelHandle, String>>;

    /// Called once the manager no longer references `handle`. Operations still holding a
    /// lease keep their own clone alive.
    fn release(&self, descriptor: &ResourceDescriptor, handle: ModelHandle) {
        let _ = descriptor;
        drop(handle);
    }
}

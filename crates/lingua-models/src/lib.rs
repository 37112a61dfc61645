//! Model resources: descriptors, the loader seam, the lifecycle manager and the
//! single-flight execution queue.
//!
//! A resource moves through `Unloaded -> Loading -> Loaded -> Unloaded`. Loads are admitted by
//! the shared [`lingua_memory::BudgetLedger`]; failed or timed-out loads pass through a
//! transient `Error` back to `Unloaded` without committing anything. All work that needs a
//! loaded resource goes through [`ExecutionQueue`], which runs one operation at a time across
//! the whole process.

mod descriptor;
mod error;
mod lease;
mod loader;
mod manager;
pub mod queue;
mod status;

pub use descriptor::{ResourceDescriptor, ResourceId};
pub use error::ResourceError;
pub use lease::ResourceLease;
pub use loader::{BoxFuture, ModelHandle, ModelLoader};
pub use manager::{ResourceManager, ResourceManagerBuilder};
pub use queue::{ExecutionQueue, Submission};
pub use status::{ResourceSnapshot, ResourceStatus};

//! Timer and task primitives shared by Lingua's resource manager and cache.
//!
//! Everything here runs on the ambient Tokio runtime; nothing spawns threads.

mod periodic;
mod task;
mod timer;
mod watchdog;

pub use periodic::PeriodicTask;
pub use task::{run_isolated, TaskError};
pub use timer::CancellableTimer;
pub use tokio_util::sync::CancellationToken;
pub use watchdog::run_with_timeout;

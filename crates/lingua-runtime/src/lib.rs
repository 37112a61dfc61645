//! Service wiring for Lingua.
//!
//! [`LinguaRuntime`] constructs the budget ledger, resource manager, execution queue, priority
//! cache and lifecycle signal bridge exactly once and hands out references to them. Nothing
//! in Lingua is a global; collaborators receive the runtime (or one of its parts) explicitly.

mod error;
mod payload;
mod runtime;
mod signals;

pub use error::RuntimeError;
pub use payload::CachePayload;
pub use runtime::{
    CleanupReport, LinguaRuntime, LinguaRuntimeBuilder, DEFAULT_TARGET_LANGUAGE, TARGET_LANGUAGE_KEY,
};
pub use signals::{LifecycleSignal, ParseSignalError, SignalBridge, SignalOutcome};

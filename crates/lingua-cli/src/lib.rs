//! Library half of the `lingua` binary: simulated model backends and the translate / speak /
//! demo flows that drive [`lingua_runtime::LinguaRuntime`].

pub mod session;
pub mod simulated;

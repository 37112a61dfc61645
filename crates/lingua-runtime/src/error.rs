use lingua_config::PreferenceError;
use lingua_models::ResourceId;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("no loader registered for configured resource `{0}`")]
    MissingLoader(ResourceId),
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),
    #[error("the runtime must be built from within a tokio runtime")]
    NoAsyncRuntime,
    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced by cache mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache entry {key} ({size} bytes) does not fit in the memory budget ({available} bytes available)")]
    InsufficientMemory { key: String, size: u64, available: u64 },
}

use std::sync::Arc;

use lingua_cache::Weigh;

/// Values memoized in the runtime's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePayload {
    Text(Arc<str>),
    Audio(Arc<[u8]>),
}

impl CachePayload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CachePayload::Text(text) => Some(text),
            CachePayload::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&[u8]> {
        match self {
            CachePayload::Audio(samples) => Some(samples),
            CachePayload::Text(_) => None,
        }
    }
}

impl Weigh for CachePayload {
    fn weigh(&self) -> u64 {
        match self {
            CachePayload::Text(text) => text.weigh(),
            CachePayload::Audio(samples) => samples.weigh(),
        }
    }
}

impl From<String> for CachePayload {
    fn from(text: String) -> Self {
        CachePayload::Text(text.into())
    }
}

impl From<&str> for CachePayload {
    fn from(text: &str) -> Self {
        CachePayload::Text(text.into())
    }
}

impl From<Vec<u8>> for CachePayload {
    fn from(samples: Vec<u8>) -> Self {
        CachePayload::Audio(samples.into())
    }
}

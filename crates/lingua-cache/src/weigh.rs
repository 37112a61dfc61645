use std::sync::Arc;

/// Approximate heap footprint of a cached payload, in bytes.
pub trait Weigh {
    fn weigh(&self) -> u64;
}

impl Weigh for String {
    fn weigh(&self) -> u64 {
        self.len() as u64
    }
}

impl Weigh for Arc<str> {
    fn weigh(&self) -> u64 {
        self.len() as u64
    }
}

impl Weigh for Vec<u8> {
    fn weigh(&self) -> u64 {
        self.len() as u64
    }
}

impl Weigh for Arc<[u8]> {
    fn weigh(&self) -> u64 {
        self.len() as u64
    }
}

impl Weigh for serde_json::Value {
    /// Length of the compact JSON encoding.
    fn weigh(&self) -> u64 {
        serde_json::to_vec(self)
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(0)
    }
}

use serde::{Deserialize, Serialize};

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;

/// Process-wide memory budget shared by model resources and the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBudget {
    pub total: u64,
}

/// Optional overrides applied on top of the default budget (typically from config).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryBudgetOverrides {
    pub total: Option<u64>,
}

impl MemoryBudget {
    /// Budget used when nothing is configured. Sized for a mid-range phone.
    pub const DEFAULT_TOTAL: u64 = 512 * MB;

    pub fn from_total(total: u64) -> Self {
        Self { total }
    }

    pub fn apply_overrides(mut self, overrides: MemoryBudgetOverrides) -> Self {
        if let Some(total) = overrides.total {
            self.total = total;
        }
        self
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::from_total(Self::DEFAULT_TOTAL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseByteSizeError {
    #[error("byte size is empty")]
    Empty,
    #[error("invalid byte size number `{0}`")]
    InvalidNumber(String),
    #[error("unknown byte size suffix `{0}` (expected B, K/KB/KiB, M/MB/MiB or G/GB/GiB)")]
    UnknownSuffix(String),
    #[error("byte size `{0}` overflows u64")]
    Overflow(String),
}

/// Parse a human-friendly byte size such as `512MiB`, `1.5G` or `4096`.
///
/// Decimal and binary suffixes are both interpreted as powers of 1024.
pub fn parse_byte_size(input: &str) -> Result<u64, ParseByteSizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseByteSizeError::Empty);
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);
    let suffix = suffix.trim();

    let multiplier = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KB,
        "m" | "mb" | "mib" => MB,
        "g" | "gb" | "gib" => GB,
        _ => return Err(ParseByteSizeError::UnknownSuffix(suffix.to_owned())),
    };

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| ParseByteSizeError::Overflow(trimmed.to_owned()));
    }

    let value = number
        .parse::<f64>()
        .map_err(|_| ParseByteSizeError::InvalidNumber(number.to_owned()))?;
    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(ParseByteSizeError::Overflow(trimmed.to_owned()));
    }
    Ok(bytes.round() as u64)
}

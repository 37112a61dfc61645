use serde::de::DeserializeOwned;

/// Combined diagnostics produced while loading and validating a Lingua config.
///
/// Loading is best effort: callers always get a `LinguaConfig` when deserialization succeeds,
/// plus whatever issues were found along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDiagnostics {
    /// Keys present in the input TOML that were not recognized, with full paths such as
    /// `resources[0].footprint`.
    pub unknown_keys: Vec<String>,
    /// Non-fatal issues (invalid-but-recoverable values).
    pub warnings: Vec<ConfigWarning>,
    /// Semantic failures; the config is internally inconsistent.
    pub errors: Vec<ConfigValidationError>,
}

impl ConfigDiagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty() && self.warnings.is_empty() && self.errors.is_empty()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn extend_validation(&mut self, validation: ValidationDiagnostics) {
        self.warnings.extend(validation.warnings);
        self.errors.extend(validation.errors);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationDiagnostics {
    pub warnings: Vec<ConfigWarning>,
    pub errors: Vec<ConfigValidationError>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    InvalidValue { toml_path: String, message: String },
    LoggingLevelInvalid { value: String, normalized: String },
    NoResources,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    InvalidValue { toml_path: String, message: String },
    BudgetZero,
    EvictionThresholdOutOfRange { value: f64 },
    DuplicateResource { id: String },
    ResourceExceedsBudget { id: String, footprint_bytes: u64, budget_bytes: u64 },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::InvalidValue { toml_path, message } => write!(f, "{toml_path}: {message}"),
            ConfigWarning::LoggingLevelInvalid { value, normalized } => {
                write!(f, "logging.level `{value}` is not a valid filter (`{normalized}`); using `info`")
            }
            ConfigWarning::NoResources => f.write_str("no [[resources]] configured"),
        }
    }
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::InvalidValue { toml_path, message } => write!(f, "{toml_path}: {message}"),
            ConfigValidationError::BudgetZero => f.write_str("memory.total_bytes must be >= 1"),
            ConfigValidationError::EvictionThresholdOutOfRange { value } => {
                write!(f, "cache.eviction_threshold must be in (0, 1], got {value}")
            }
            ConfigValidationError::DuplicateResource { id } => write!(f, "resource `{id}` is configured twice"),
            ConfigValidationError::ResourceExceedsBudget {
                id,
                footprint_bytes,
                budget_bytes,
            } => write!(
                f,
                "resource `{id}` needs {footprint_bytes} bytes but the whole budget is {budget_bytes} bytes"
            ),
        }
    }
}

pub(crate) fn deserialize_toml_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::<String>::new();
    let deserializer = toml::de::Deserializer::new(text);
    let value = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(normalize_serde_ignored_path(path));
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}

fn normalize_serde_ignored_path(path: serde_ignored::Path) -> String {
    // `serde_ignored` renders a leading `.` and sequence indices as `.0` segments; TOML users
    // expect `a[0].b`.
    let raw = path.to_string();
    let raw = raw.trim_start_matches('.');
    raw.split('.')
        .enumerate()
        .fold(String::new(), |mut out, (idx, segment)| {
            let is_index = idx > 0 && !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
            if is_index {
                out.push('[');
                out.push_str(segment);
                out.push(']');
                return out;
            }

            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(segment);
            out
        })
}

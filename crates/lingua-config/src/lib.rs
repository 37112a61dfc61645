use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use lingua_cache::CacheConfig;
use lingua_memory::{MemoryBudget, MemoryBudgetOverrides, MemoryPressureThresholds};
use lingua_models::{ResourceDescriptor, ResourceId};
use thiserror::Error;

mod diagnostics;
mod logging;
mod preferences;
mod validation;

pub use diagnostics::{ConfigDiagnostics, ConfigValidationError, ConfigWarning, ValidationDiagnostics};
pub use logging::{init_tracing, LogBuffer};
pub use preferences::{JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceError, PreferenceStore};

/// Conventional file name looked up by the CLI when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "lingua.toml";

/// A byte size which supports both raw byte counts and human-friendly suffixes.
///
/// This is used for config values where TOML integer literals would be unwieldy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl Serialize for ByteSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bytes(u64),
            Human(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bytes(value) => Ok(ByteSize(value)),
            Repr::Human(value) => lingua_memory::parse_byte_size(&value)
                .map(ByteSize)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// `[memory]`: the process-wide budget shared by model resources and the cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct MemoryConfig {
    /// Override the total budget (in bytes, or a string such as `"512MiB"`).
    #[serde(default)]
    pub total_bytes: Option<ByteSize>,

    /// Ratios at which the reported pressure level changes.
    #[serde(default)]
    pub pressure: MemoryPressureThresholds,
}

/// `[cache]`: priority cache tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Default time-to-live for cache entries.
    #[serde(default = "CacheSettings::default_ttl_ms")]
    pub ttl_ms: u64,

    /// Threshold sweeps start once `usage / budget` exceeds this ratio.
    #[serde(default = "CacheSettings::default_eviction_threshold")]
    pub eviction_threshold: f64,

    /// Period of the background expiry sweep.
    #[serde(default = "CacheSettings::default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl CacheSettings {
    fn default_ttl_ms() -> u64 {
        30 * 60 * 1_000
    }

    fn default_eviction_threshold() -> f64 {
        0.8
    }

    fn default_sweep_interval_ms() -> u64 {
        60 * 1_000
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_ms: Self::default_ttl_ms(),
            eviction_threshold: Self::default_eviction_threshold(),
            sweep_interval_ms: Self::default_sweep_interval_ms(),
        }
    }
}

/// One `[[resources]]` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub id: String,

    /// Memory committed to the budget while the resource is loaded.
    pub footprint_bytes: ByteSize,

    #[serde(default = "ResourceConfig::default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    #[serde(default = "ResourceConfig::default_idle_unload_delay_ms")]
    pub idle_unload_delay_ms: u64,
}

impl ResourceConfig {
    fn default_load_timeout_ms() -> u64 {
        10_000
    }

    fn default_idle_unload_delay_ms() -> u64 {
        5 * 60 * 1_000
    }

    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(ResourceId::new(self.id.clone()), self.footprint_bytes.0)
            .with_load_timeout(Duration::from_millis(self.load_timeout_ms))
            .with_idle_unload_delay(Duration::from_millis(self.idle_unload_delay_ms))
    }
}

impl From<&ResourceDescriptor> for ResourceConfig {
    fn from(descriptor: &ResourceDescriptor) -> Self {
        Self {
            id: descriptor.id.to_string(),
            footprint_bytes: ByteSize(descriptor.footprint_bytes),
            load_timeout_ms: descriptor.load_timeout.as_millis() as u64,
            idle_unload_delay_ms: descriptor.idle_unload_delay.as_millis() as u64,
        }
    }
}

fn default_resources() -> Vec<ResourceConfig> {
    vec![
        ResourceConfig::from(&ResourceDescriptor::translation()),
        ResourceConfig::from(&ResourceDescriptor::speech()),
    ]
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging level for all Lingua crates, or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Mirror logs to stderr (in addition to the in-memory buffer).
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to the given file path. If the file cannot be opened, file logging is
    /// disabled while other sinks remain active.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Number of log lines kept in memory.
    #[serde(default = "LoggingConfig::default_buffer_lines")]
    pub buffer_lines: usize,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn default_buffer_lines() -> usize {
        2_000
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            // Anything else is treated as an `EnvFilter` directive string.
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// Effective `EnvFilter`. If `RUST_LOG` is set, it is merged into the configured level.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
            buffer_lines: Self::default_buffer_lines(),
        }
    }
}

/// `[preferences]`: where the persisted user preferences live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PreferencesConfig {
    /// JSON file backing the preference store. Preferences are kept in memory only when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Top-level `lingua.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinguaConfig {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub preferences: PreferencesConfig,
}

impl Default for LinguaConfig {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            cache: CacheSettings::default(),
            resources: default_resources(),
            logging: LoggingConfig::default(),
            preferences: PreferencesConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

/// Strip quoted user-provided values from a TOML error message.
fn sanitize_toml_error_message(message: &str) -> String {
    static QUOTED_STRING_RE: OnceLock<Option<regex::Regex>> = OnceLock::new();

    let re = QUOTED_STRING_RE.get_or_init(|| regex::Regex::new(r#""(?:\\.|[^"\\])*""#).ok());
    match re {
        Some(re) => re.replace_all(message, r#""<redacted>""#).into_owned(),
        None => message.to_owned(),
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` includes a source snippet; keep only the message.
        ConfigError::Toml(sanitize_toml_error_message(err.message()))
    }
}

impl LinguaConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = read_config(path.as_ref())?;
        Ok(toml::from_str(&text)?)
    }

    /// Load a config file from TOML and return diagnostics (unknown keys and semantic
    /// validation failures).
    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let text = read_config(path.as_ref())?;
        Self::load_from_str_with_diagnostics(&text)
    }

    /// Load a config from a TOML string and return diagnostics.
    pub fn load_from_str_with_diagnostics(text: &str) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) = diagnostics::deserialize_toml_with_unknown_keys::<LinguaConfig>(text)?;

        let mut diagnostics = ConfigDiagnostics {
            unknown_keys,
            ..ConfigDiagnostics::default()
        };
        diagnostics.extend_validation(config.validate());

        for key in &diagnostics.unknown_keys {
            tracing::warn!(target: "lingua.config", key = %key, "ignoring unknown config key");
        }

        Ok((config, diagnostics))
    }

    pub fn memory_budget(&self) -> MemoryBudget {
        MemoryBudget::default().apply_overrides(MemoryBudgetOverrides {
            total: self.memory.total_bytes.map(|size| size.0),
        })
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_millis(self.cache.ttl_ms),
            eviction_threshold: self.cache.eviction_threshold,
            sweep_interval: Duration::from_millis(self.cache.sweep_interval_ms),
        }
    }

    /// Descriptors for every configured resource, in file order.
    pub fn resource_descriptors(&self) -> Vec<ResourceDescriptor> {
        self.resources.iter().map(ResourceConfig::descriptor).collect()
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

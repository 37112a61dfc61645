use std::collections::BTreeSet;

use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{LinguaConfig, LoggingConfig};

impl LinguaConfig {
    /// Validate semantic invariants for a configuration.
    ///
    /// Validation is best-effort: it attempts to report as many problems as possible in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        validate_memory(self, &mut out);
        validate_cache(self, &mut out);
        validate_resources(self, &mut out);
        validate_logging(self, &mut out);

        out
    }
}

fn validate_memory(config: &LinguaConfig, out: &mut ValidationDiagnostics) {
    if config.memory_budget().total == 0 {
        out.errors.push(ConfigValidationError::BudgetZero);
    }

    let pressure = config.memory.pressure;
    if !(pressure.medium <= pressure.high && pressure.high <= pressure.critical) {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "memory.pressure".to_string(),
            message: "expected medium <= high <= critical".to_string(),
        });
    }
}

fn validate_cache(config: &LinguaConfig, out: &mut ValidationDiagnostics) {
    let threshold = config.cache.eviction_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        out.errors
            .push(ConfigValidationError::EvictionThresholdOutOfRange { value: threshold });
    }

    if config.cache.ttl_ms == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "cache.ttl_ms".to_string(),
            message: "must be >= 1".to_string(),
        });
    }

    if config.cache.sweep_interval_ms == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "cache.sweep_interval_ms".to_string(),
            message: "must be >= 1".to_string(),
        });
    }
}

fn validate_resources(config: &LinguaConfig, out: &mut ValidationDiagnostics) {
    if config.resources.is_empty() {
        out.warnings.push(ConfigWarning::NoResources);
        return;
    }

    let budget = config.memory_budget().total;
    let mut seen = BTreeSet::new();
    for (idx, resource) in config.resources.iter().enumerate() {
        if resource.id.trim().is_empty() {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: format!("resources[{idx}].id"),
                message: "must not be empty".to_string(),
            });
        }
        if !seen.insert(resource.id.as_str()) {
            out.errors.push(ConfigValidationError::DuplicateResource {
                id: resource.id.clone(),
            });
        }
        if resource.footprint_bytes.0 > budget {
            out.errors.push(ConfigValidationError::ResourceExceedsBudget {
                id: resource.id.clone(),
                footprint_bytes: resource.footprint_bytes.0,
                budget_bytes: budget,
            });
        }
        if resource.load_timeout_ms == 0 {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: format!("resources[{idx}].load_timeout_ms"),
                message: "must be >= 1".to_string(),
            });
        }
        if resource.idle_unload_delay_ms == 0 {
            out.warnings.push(ConfigWarning::InvalidValue {
                toml_path: format!("resources[{idx}].idle_unload_delay_ms"),
                message: "0 unloads the resource as soon as it is released".to_string(),
            });
        }
    }
}

fn validate_logging(config: &LinguaConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
            normalized,
        });
    }

    if config.logging.buffer_lines == 0 {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "logging.buffer_lines".to_string(),
            message: "must be >= 1; keeping one line".to_string(),
        });
    }
}

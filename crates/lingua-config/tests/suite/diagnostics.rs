use std::io::Write;

use lingua_config::{ConfigError, ConfigValidationError, ConfigWarning, LinguaConfig};
use tempfile::NamedTempFile;

#[test]
fn reports_unknown_keys_with_full_paths() {
    let text = r#"
typo = 1

[cache]
ttl = 5

[[resources]]
id = "translation"
footprint_bytes = "150MiB"
footprint = 1
"#;

    let (_config, diagnostics) =
        LinguaConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.unknown_keys,
        vec!["cache.ttl", "resources[0].footprint", "typo"]
    );
    assert!(diagnostics.is_ok());
}

#[test]
fn empty_file_is_the_default_config() {
    let (config, diagnostics) = LinguaConfig::load_from_str_with_diagnostics("").unwrap();
    assert_eq!(config, LinguaConfig::default());
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn reports_semantic_errors_in_one_pass() {
    let text = r#"
[memory]
total_bytes = "100MiB"

[cache]
eviction_threshold = 1.5
ttl_ms = 0

[[resources]]
id = "translation"
footprint_bytes = "150MiB"

[[resources]]
id = "translation"
footprint_bytes = "10MiB"
load_timeout_ms = 0
"#;

    let (_config, diagnostics) = LinguaConfig::load_from_str_with_diagnostics(text).unwrap();

    assert!(!diagnostics.is_ok());
    assert!(diagnostics
        .errors
        .contains(&ConfigValidationError::EvictionThresholdOutOfRange { value: 1.5 }));
    assert!(diagnostics.errors.contains(&ConfigValidationError::DuplicateResource {
        id: "translation".into()
    }));
    assert!(diagnostics.errors.contains(&ConfigValidationError::ResourceExceedsBudget {
        id: "translation".into(),
        footprint_bytes: 150 * 1024 * 1024,
        budget_bytes: 100 * 1024 * 1024,
    }));
    assert!(diagnostics.errors.contains(&ConfigValidationError::InvalidValue {
        toml_path: "cache.ttl_ms".into(),
        message: "must be >= 1".into(),
    }));
    assert!(diagnostics.errors.contains(&ConfigValidationError::InvalidValue {
        toml_path: "resources[1].load_timeout_ms".into(),
        message: "must be >= 1".into(),
    }));
}

#[test]
fn zero_budget_is_rejected() {
    let (_config, diagnostics) =
        LinguaConfig::load_from_str_with_diagnostics("[memory]\ntotal_bytes = 0\n").unwrap();
    assert!(diagnostics.errors.contains(&ConfigValidationError::BudgetZero));
}

#[test]
fn invalid_logging_level_is_a_warning() {
    let (_config, diagnostics) =
        LinguaConfig::load_from_str_with_diagnostics("[logging]\nlevel = \"lingua=[\"\n").unwrap();
    assert!(diagnostics.is_ok());
    assert!(matches!(
        diagnostics.warnings.as_slice(),
        [ConfigWarning::LoggingLevelInvalid { .. }]
    ));
}

#[test]
fn loads_from_a_file_and_reports_missing_files() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[cache]\nsweep_interval_ms = 500").unwrap();

    let config = LinguaConfig::load_from_path(file.path()).unwrap();
    assert_eq!(config.cache_config().sweep_interval.as_millis(), 500);

    let missing = file.path().with_extension("missing");
    assert!(matches!(
        LinguaConfig::load_from_path(&missing),
        Err(ConfigError::Io { .. })
    ));
}

use super::*;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |var| map.get(var).cloned()
}

#[test]
fn test_defaults() {
    let config = ValidationConfig::default();
    assert_eq!(config.default_checked_level, CheckedLevel::Always);
    assert!(!config.deep_container_checks);
    assert!(config.sealed_allow_list.is_empty());
    assert!(!config.test_mode.is_locked());
}

#[test]
fn test_from_json_partial() {
    let config = ValidationConfig::from_json_str(
        r#"{ "default_checked_level": "tests", "inspect": { "max_length": 40 } }"#,
    )
    .unwrap();
    assert_eq!(config.default_checked_level, CheckedLevel::Tests);
    assert_eq!(config.inspect.max_length, 40);
    assert_eq!(config.inspect.max_depth, InspectOptions::default().max_depth);
}

#[test]
fn test_from_json_rejects_bad_level() {
    let err = ValidationConfig::from_json_str(r#"{ "default_checked_level": "sometimes" }"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn test_bad_glob_is_an_error() {
    let err = ValidationConfig::from_json_str(r#"{ "sealed_allow_list": ["a/[b"] }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Glob(_)));
}

#[test]
fn test_sealed_allow_list_matches() {
    let config =
        ValidationConfig::from_json_str(r#"{ "sealed_allow_list": ["spec/**/*.rb"] }"#).unwrap();
    assert!(config.is_sealed_allowed(Path::new("spec/models/user_spec.rb")));
    assert!(!config.is_sealed_allowed(Path::new("lib/user.rb")));
}

#[test]
fn test_set_sealed_allow_list() {
    let mut config = ValidationConfig::default();
    config.set_sealed_allow_list(["test/*.rb"]).unwrap();
    assert!(config.is_sealed_allowed(Path::new("test/a.rb")));
}

#[test]
fn test_env_overlay() {
    let mut config = ValidationConfig::default();
    config
        .apply_env_from(env(&[(CHECKED_LEVEL_ENV, "never"), (TEST_MODE_ENV, "1")]))
        .unwrap();
    assert_eq!(config.default_checked_level, CheckedLevel::Never);
    assert!(config.test_mode.check_tests());
}

#[test]
fn test_env_overlay_rejects_garbage() {
    let mut config = ValidationConfig::default();
    let err = config
        .apply_env_from(env(&[(CHECKED_LEVEL_ENV, "often")]))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidEnv {
            var: CHECKED_LEVEL_ENV,
            ..
        }
    ));

    let err = config
        .apply_env_from(env(&[(TEST_MODE_ENV, "maybe")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnv { var: TEST_MODE_ENV, .. }));
}

#[test]
fn test_enable_tests_checks_seeds_test_mode() {
    let config = ValidationConfig::from_json_str(r#"{ "enable_tests_checks": true }"#).unwrap();
    assert!(config.test_mode.check_tests());
}

// =============================================================================
// TestMode
// =============================================================================

#[test]
fn test_test_mode_unset_reads_as_disabled() {
    let mode = TestMode::new();
    assert!(!mode.check_tests());
    assert!(mode.is_locked());
}

#[test]
fn test_test_mode_can_flip_before_first_read() {
    let mode = TestMode::new();
    mode.enable().unwrap();
    mode.disable().unwrap();
    mode.enable().unwrap();
    assert!(mode.check_tests());
    assert!(mode.check_tests());
}

#[test]
fn test_test_mode_locks_on_first_read() {
    let mode = TestMode::new();
    mode.disable().unwrap();
    assert!(!mode.check_tests());
    assert!(matches!(mode.enable(), Err(ConfigError::TestModeLocked)));
    assert!(matches!(mode.disable(), Err(ConfigError::TestModeLocked)));
    assert!(!mode.check_tests());
}

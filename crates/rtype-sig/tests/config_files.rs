//! Loading `ValidationConfig` from disk and the environment.

use rtype_sig::{CheckedLevel, ConfigError, Runtime, SourceLocation, ValidationConfig};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

fn write_config(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("rtype.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(json.as_bytes()).unwrap();
    path
}

#[test]
fn loads_a_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "default_checked_level": "tests",
            "deep_container_checks": true,
            "inspect": { "max_length": 40 },
            "sealed_allow_list": ["spec/**/*.rb"],
            "enable_tests_checks": true
        }"#,
    );
    let config = ValidationConfig::from_path(&path).unwrap();
    assert_eq!(config.default_checked_level, CheckedLevel::Tests);
    assert!(config.deep_container_checks);
    assert_eq!(config.inspect.max_length, 40);
    assert!(config.is_sealed_allowed(Path::new("spec/models/user_spec.rb")));
    assert!(!config.is_sealed_allowed(Path::new("lib/user.rb")));
    assert!(config.test_mode.check_tests());
}

#[test]
fn empty_object_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "{}");
    let config = ValidationConfig::from_path(&path).unwrap();
    assert_eq!(config.default_checked_level, CheckedLevel::Always);
    assert!(!config.deep_container_checks);
    assert!(config.sealed_allow_list.is_empty());
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = ValidationConfig::from_path(&path).unwrap_err();
    let ConfigError::Io { path: reported, .. } = &err else {
        panic!("expected an io error, got {err:?}");
    };
    assert_eq!(reported, &path.display().to_string());
}

#[test]
fn malformed_json_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, r#"{ "default_checked_level": "sometimes" }"#);
    assert!(matches!(
        ValidationConfig::from_path(&path),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn environment_overrides_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, r#"{ "default_checked_level": "always" }"#);
    let mut config = ValidationConfig::from_path(&path).unwrap();
    let env: HashMap<&str, &str> = HashMap::from([("RTYPE_CHECKED_LEVEL", ":never")]);
    config
        .apply_env_from(|var| env.get(var).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(config.default_checked_level, CheckedLevel::Never);
}

#[test]
fn file_config_drives_the_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, r#"{ "sealed_allow_list": ["test/**"] }"#);
    let rt = Runtime::with_config(ValidationConfig::from_path(&path).unwrap());
    let parent = rt
        .define_class("Sealed", None, SourceLocation::new("lib/sealed.rb", 1))
        .unwrap();
    rt.sealed(parent, SourceLocation::new("lib/sealed.rb", 2)).unwrap();
    assert!(
        rt.define_class("Double", Some(parent), SourceLocation::new("test/double.rb", 1))
            .is_ok()
    );
}

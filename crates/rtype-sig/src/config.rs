//! Validation configuration.
//!
//! Loaded from JSON (every field optional) and overlaid from the environment:
//!
//! ```json
//! {
//!   "default_checked_level": "tests",
//!   "deep_container_checks": true,
//!   "inspect": { "max_length": 120 },
//!   "sealed_allow_list": ["spec/**/*.rb"],
//!   "enable_tests_checks": true
//! }
//! ```
//!
//! | Variable              | Effect                                  |
//! |-----------------------|-----------------------------------------|
//! | `RTYPE_CHECKED_LEVEL` | overrides `default_checked_level`       |
//! | `RTYPE_TEST_MODE`     | `1`/`true` or `0`/`false`: test mode     |

use crate::error::ConfigError;
use crate::signature::CheckedLevel;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rtype_solver::InspectOptions;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

pub const CHECKED_LEVEL_ENV: &str = "RTYPE_CHECKED_LEVEL";
pub const TEST_MODE_ENV: &str = "RTYPE_TEST_MODE";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Level used by signatures that do not call `.checked`.
    pub default_checked_level: CheckedLevel,
    /// Validate container elements, not just the container class.
    pub deep_container_checks: bool,
    /// Caps on how much of a failing value is rendered.
    pub inspect: InspectOptions,
    /// Files allowed to subclass/include/extend any sealed entity.
    pub sealed_allow_list: Vec<String>,
    /// Initial test-mode setting; `None` leaves it unset.
    pub enable_tests_checks: Option<bool>,
    #[serde(skip)]
    allow_set: GlobSet,
    #[serde(skip)]
    pub test_mode: TestMode,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            default_checked_level: CheckedLevel::Always,
            deep_container_checks: false,
            inspect: InspectOptions::default(),
            sealed_allow_list: Vec::new(),
            enable_tests_checks: None,
            allow_set: GlobSet::empty(),
            test_mode: TestMode::new(),
        }
    }
}

impl ValidationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: ValidationConfig = serde_json::from_str(json)?;
        config.prepare()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Compile the allow-list and seed test mode from `enable_tests_checks`.
    fn prepare(&mut self) -> Result<(), ConfigError> {
        self.compile_allow_list()?;
        match self.enable_tests_checks {
            Some(true) => self.test_mode.enable()?,
            Some(false) => self.test_mode.disable()?,
            None => {}
        }
        Ok(())
    }

    /// Replace the allow-list.
    pub fn set_sealed_allow_list(
        &mut self,
        patterns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<(), ConfigError> {
        self.sealed_allow_list = patterns.into_iter().map(Into::into).collect();
        self.compile_allow_list()
    }

    fn compile_allow_list(&mut self) -> Result<(), ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.sealed_allow_list {
            builder.add(Glob::new(pattern)?);
        }
        self.allow_set = builder.build()?;
        Ok(())
    }

    /// Overlay settings from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Overlay settings from `lookup` (the environment, in production).
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(CHECKED_LEVEL_ENV) {
            self.default_checked_level =
                raw.parse().map_err(|_| ConfigError::InvalidEnv {
                    var: CHECKED_LEVEL_ENV,
                    value: raw.clone(),
                })?;
            debug!(level = %self.default_checked_level, "checked level from environment");
        }
        if let Some(raw) = lookup(TEST_MODE_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.test_mode.enable()?,
                "0" | "false" | "no" | "off" => self.test_mode.disable()?,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: TEST_MODE_ENV,
                        value: raw,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn is_sealed_allowed(&self, caller: &Path) -> bool {
        self.allow_set.is_match(caller)
    }
}

// =============================================================================
// TestMode
// =============================================================================

const UNSET: u8 = 0;
const ENABLED: u8 = 1;
const DISABLED: u8 = 2;
const LOCKED_ENABLED: u8 = 3;
const LOCKED_DISABLED: u8 = 4;

/// Whether `.checked(:tests)` signatures are enforced.
///
/// Assignable until the first `Tests`-checked call reads it; from then on it
/// is locked and assignments fail with [`ConfigError::TestModeLocked`].
#[derive(Debug)]
pub struct TestMode(AtomicU8);

impl TestMode {
    pub const fn new() -> Self {
        Self(AtomicU8::new(UNSET))
    }

    pub fn enable(&self) -> Result<(), ConfigError> {
        self.assign(ENABLED)
    }

    pub fn disable(&self) -> Result<(), ConfigError> {
        self.assign(DISABLED)
    }

    fn assign(&self, state: u8) -> Result<(), ConfigError> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
                LOCKED_ENABLED | LOCKED_DISABLED => None,
                _ => Some(state),
            })
            .map(|_| ())
            .map_err(|_| ConfigError::TestModeLocked)
    }

    /// Read the flag on behalf of a `Tests`-checked call, locking it.
    pub fn check_tests(&self) -> bool {
        let previous = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
                ENABLED => Some(LOCKED_ENABLED),
                UNSET | DISABLED => Some(LOCKED_DISABLED),
                _ => None,
            })
            .unwrap_or_else(|locked| locked);
        matches!(previous, ENABLED | LOCKED_ENABLED)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.0.load(Ordering::Acquire), LOCKED_ENABLED | LOCKED_DISABLED)
    }
}

impl Default for TestMode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

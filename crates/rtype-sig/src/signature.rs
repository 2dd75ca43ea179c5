//! The immutable signature of one method.
//!
//! A [`Signature`] is produced by [`crate::builder::SigBuilder`] once the
//! method it annotates is known. Apart from the first-failure cache it never
//! changes after construction and is shared as `Arc<Signature>` between the
//! method table and every installed call wrapper.

use rtype_common::SourceLocation;
use rtype_solver::{ClassId, TypeId};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

// =============================================================================
// Parameters
// =============================================================================

/// How a parameter receives its argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// `x`
    Required,
    /// `x = default`
    Optional,
    /// `*rest`
    Rest,
    /// `x:`
    KeyRequired,
    /// `x: default`
    KeyOptional,
    /// `**kwrest`
    KeyRest,
    /// `&blk`
    Block,
}

impl ParamKind {
    pub fn is_positional(self) -> bool {
        matches!(self, ParamKind::Required | ParamKind::Optional | ParamKind::Rest)
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            ParamKind::KeyRequired | ParamKind::KeyOptional | ParamKind::KeyRest
        )
    }
}

/// One declared parameter: its name and kind come from the method definition,
/// its type from the `sig`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: Arc<str>,
    pub kind: ParamKind,
    pub ty: TypeId,
}

// =============================================================================
// Mode
// =============================================================================

/// Override relationship declared by a `sig`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Standard,
    Abstract,
    Overridable,
    Override,
    Implementation,
    OverridableOverride,
    OverridableImplementation,
}

impl Mode {
    pub fn is_override(self) -> bool {
        matches!(self, Mode::Override | Mode::OverridableOverride)
    }

    pub fn is_implementation(self) -> bool {
        matches!(self, Mode::Implementation | Mode::OverridableImplementation)
    }

    /// Whether a child may `.override` a method declared with this mode.
    pub fn permits_override(self) -> bool {
        matches!(
            self,
            Mode::Overridable
                | Mode::Override
                | Mode::OverridableOverride
                | Mode::OverridableImplementation
        )
    }

    /// Builder-style rendering used in diagnostics: `.override`,
    /// `.overridable.implementation`, ...
    pub fn pretty(self) -> &'static str {
        match self {
            Mode::Standard => "standard",
            Mode::Abstract => ".abstract",
            Mode::Overridable => ".overridable",
            Mode::Override => ".override",
            Mode::Implementation => ".implementation",
            Mode::OverridableOverride => ".overridable.override",
            Mode::OverridableImplementation => ".overridable.implementation",
        }
    }
}

/// What `.override(allow_incompatible: ...)` lets through.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AllowIncompatible {
    #[default]
    No,
    /// `allow_incompatible: :visibility`
    Visibility,
    /// `allow_incompatible: true`: shape, types and visibility.
    All,
}

impl AllowIncompatible {
    pub fn visibility(self) -> bool {
        self != AllowIncompatible::No
    }

    pub fn signature(self) -> bool {
        self == AllowIncompatible::All
    }
}

// =============================================================================
// Checked level and failure policy
// =============================================================================

/// When a signature is enforced at call time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckedLevel {
    #[default]
    Always,
    /// Only when test-mode checking is enabled.
    Tests,
    /// The method is installed without a wrapper.
    Never,
}

impl FromStr for CheckedLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches(':').to_ascii_lowercase().as_str() {
            "always" => Ok(CheckedLevel::Always),
            "tests" => Ok(CheckedLevel::Tests),
            "never" => Ok(CheckedLevel::Never),
            other => Err(format!("unknown checked level `{other}`")),
        }
    }
}

impl fmt::Display for CheckedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckedLevel::Always => "always",
            CheckedLevel::Tests => "tests",
            CheckedLevel::Never => "never",
        })
    }
}

/// What happens when a call fails validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Raise (or defer to the call-validation handler).
    #[default]
    Raise,
    /// Log, notify the soft-failure handler with `notify`, and continue.
    Soft { notify: Arc<str> },
}

// =============================================================================
// Signature
// =============================================================================

#[derive(Debug)]
pub struct Signature {
    pub owner: ClassId,
    pub owner_name: Arc<str>,
    pub method_name: Arc<str>,
    /// In definition order.
    pub params: Vec<ParamDescriptor>,
    pub returns: TypeId,
    pub bind: Option<TypeId>,
    pub mode: Mode,
    pub checked: CheckedLevel,
    pub on_failure: FailurePolicy,
    pub location: SourceLocation,
    pub generated: bool,
    pub is_final: bool,
    pub allow_incompatible: AllowIncompatible,
    pub type_parameters: Vec<Arc<str>>,
    first_failure: OnceLock<Arc<str>>,
    failures: AtomicU64,
}

impl Signature {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        owner: ClassId,
        owner_name: Arc<str>,
        method_name: Arc<str>,
        params: Vec<ParamDescriptor>,
        returns: TypeId,
        bind: Option<TypeId>,
        mode: Mode,
        checked: CheckedLevel,
        on_failure: FailurePolicy,
        location: SourceLocation,
        generated: bool,
        is_final: bool,
        allow_incompatible: AllowIncompatible,
        type_parameters: Vec<Arc<str>>,
    ) -> Self {
        Self {
            owner,
            owner_name,
            method_name,
            params,
            returns,
            bind,
            mode,
            checked,
            on_failure,
            location,
            generated,
            is_final,
            allow_incompatible,
            type_parameters,
            first_failure: OnceLock::new(),
            failures: AtomicU64::new(0),
        }
    }

    pub fn positional(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.params.iter().filter(|p| p.kind.is_positional())
    }

    /// Number of named positional parameters (required and optional).
    pub fn arg_count(&self) -> usize {
        self.params
            .iter()
            .filter(|p| matches!(p.kind, ParamKind::Required | ParamKind::Optional))
            .count()
    }

    pub fn req_arg_count(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Required)
            .count()
    }

    pub fn has_rest(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::Rest)
    }

    pub fn kwarg_names(&self) -> Vec<Arc<str>> {
        self.params
            .iter()
            .filter(|p| matches!(p.kind, ParamKind::KeyRequired | ParamKind::KeyOptional))
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn req_kwarg_names(&self) -> Vec<Arc<str>> {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::KeyRequired)
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn has_keyrest(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::KeyRest)
    }

    pub fn block(&self) -> Option<&ParamDescriptor> {
        self.params.iter().find(|p| p.kind == ParamKind::Block)
    }

    pub fn param(&self, name: &str) -> Option<&ParamDescriptor> {
        self.params.iter().find(|p| &*p.name == name)
    }

    /// `Owner#name at file:line`.
    pub fn describe(&self) -> String {
        format!("{}#{} at {}", self.owner_name, self.method_name, self.location)
    }

    /// Record a call-time failure. Returns the diagnostic of the first failure
    /// ever recorded and the running failure count.
    pub(crate) fn record_failure(&self, message: &str) -> (Arc<str>, u64) {
        let first = self.first_failure.get_or_init(|| message.into()).clone();
        let count = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        (first, count)
    }

    /// The first failure recorded for this signature, if any.
    pub fn first_failure(&self) -> Option<&str> {
        self.first_failure.get().map(|s| &**s)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "tests/signature_tests.rs"]
mod tests;

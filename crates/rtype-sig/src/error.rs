//! Error types, one enum per concern, aggregated into [`Error`].
//!
//! | Concern                 | Type               | Default handling          |
//! |-------------------------|--------------------|---------------------------|
//! | `sig` declaration       | `DeclarationError` | always fatal              |
//! | sig vs. method mismatch | `SigBuildError`    | fatal unless handled      |
//! | override/abstract rules | `ContractError`    | fatal at install time     |
//! | sealed/final/abstract   | `HierarchyError`   | fatal at the violation    |
//! | call-time type check    | `TypeError`        | raised unless handled     |
//! | arity                   | `ArgumentError`    | always raised             |

use crate::signature::Signature;
use rtype_common::SourceLocation;
use rtype_solver::{ClassTableError, CoerceError, TypeId, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Declaration
// =============================================================================

/// Misuse of the `sig` builder. Always fatal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{location}: Error interpreting `sig`:\n  {message}")]
pub struct DeclarationError {
    pub message: String,
    pub location: SourceLocation,
}

impl DeclarationError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

// =============================================================================
// Signature build
// =============================================================================

/// The declared parameters do not line up with the method definition, or a
/// declared type could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SigBuildError {
    #[error("The declaration for `{method}` is missing parameter(s): {}", .names.join(", "))]
    MissingParams { method: Arc<str>, names: Vec<Arc<str>> },

    #[error("The declaration for `{method}` has extra parameter(s): {}", .names.join(", "))]
    ExtraParams { method: Arc<str>, names: Vec<Arc<str>> },

    #[error(
        "Parameter `{name}` is declared out of order (declared as arg number {declared}, \
         defined in the method as arg number {defined}).\nMethod: {method}"
    )]
    OutOfOrder {
        name: Arc<str>,
        declared: usize,
        defined: usize,
        method: String,
    },

    #[error(
        "Required params after optional params are not supported in method declarations. \
         Method: {method}"
    )]
    RequiredAfterOptional { method: String },

    #[error("Invalid type for `{name}` in the declaration of `{method}`: {source}")]
    InvalidType {
        method: Arc<str>,
        name: Arc<str>,
        source: CoerceError,
    },
}

// =============================================================================
// Inheritance contracts
// =============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContractKind {
    /// `.override` / `.implementation` with nothing to override.
    MissingParent,
    /// Mode incompatible with the parent's mode.
    Mode,
    /// Parameter list incompatible with the parent's.
    Shape,
    /// Parameter or return types incompatible with the parent's.
    Variance,
    /// Override less visible than the parent.
    Visibility,
    FinalMethod,
    Interface,
    AbstractOwner,
}

/// Violation of an override/implementation/final relationship, detected when
/// the method is installed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ContractError {
    pub kind: ContractKind,
    pub message: String,
}

impl ContractError {
    pub fn new(kind: ContractKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// =============================================================================
// Hierarchy
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("`{entity}` was declared sealed and can only be {verb} in {declared_in}, not {caller}")]
    Sealed {
        entity: Arc<str>,
        verb: &'static str,
        declared_in: Arc<str>,
        caller: Arc<str>,
    },

    #[error("`{entity}` was declared as final and cannot be {verb}")]
    Final { entity: Arc<str>, verb: &'static str },

    #[error("`{0}` was already declared `final!` and cannot be declared `sealed!`")]
    SealedAfterFinal(Arc<str>),

    #[error("`{0}` was already declared `sealed!` and cannot be re-declared `sealed!`")]
    SealedTwice(Arc<str>),

    #[error("`{0}` was already declared as sealed and cannot be declared as final")]
    FinalAfterSealed(Arc<str>),

    #[error("`{0}` was already declared as final and cannot be re-declared as final")]
    FinalTwice(Arc<str>),

    #[error("`{0}` is a class; `interface!` can only be declared on modules")]
    InterfaceOnClass(Arc<str>),

    #[error("{0} is declared as abstract; it cannot be instantiated")]
    AbstractInstantiation(Arc<str>),

    #[error("{0} is a module; modules cannot be instantiated")]
    ModuleInstantiation(Arc<str>),

    #[error("{0} is an enum; its values are fixed and new instances cannot be created")]
    EnumInstantiation(Arc<str>),

    #[error("Missing implementation for abstract method(s) in {entity}:\n{}", .methods.join("\n"))]
    MissingImplementations { entity: Arc<str>, methods: Vec<String> },

    #[error(transparent)]
    Class(#[from] ClassTableError),
}

// =============================================================================
// Call validation
// =============================================================================

/// What was being checked when a call-time type error was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Parameter,
    BlockParameter,
    ReturnValue,
    Bind,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Parameter => "Parameter",
            FailureKind::BlockParameter => "Block parameter",
            FailureKind::ReturnValue => "Return value",
            FailureKind::Bind => "Bind",
        })
    }
}

/// A value did not match its declared type at call time.
///
/// Displayed as `pretty_message`; repeated failures of the same signature
/// also carry the first failure's diagnostic.
#[derive(Clone, Debug, Error)]
pub struct TypeError {
    pub kind: FailureKind,
    /// Parameter name (`None` for return values and bind checks).
    pub name: Option<Arc<str>>,
    /// `Expected type X, got ...`
    pub message: String,
    /// `message` with the kind, call site and definition site.
    pub pretty_message: String,
    pub expected: TypeId,
    pub value: Value,
    pub caller: SourceLocation,
    pub definition: SourceLocation,
    /// Pretty message of the first failure ever recorded for this signature.
    pub first_failure: Arc<str>,
    /// Number of failures recorded for this signature, this one included.
    pub failure_count: u64,
}

impl TypeError {
    pub(crate) fn new(
        signature: &Signature,
        kind: FailureKind,
        name: Option<Arc<str>>,
        message: String,
        expected: TypeId,
        value: Value,
        caller: SourceLocation,
    ) -> Self {
        let label = match &name {
            Some(name) => format!("{kind} '{name}'"),
            None => kind.to_string(),
        };
        let pretty_message = format!(
            "{label}: {message}\nCaller: {caller}\nDefinition: {}",
            signature.location
        );
        let (first_failure, failure_count) = signature.record_failure(&pretty_message);
        Self {
            kind,
            name,
            message,
            pretty_message,
            expected,
            value,
            caller,
            definition: signature.location.clone(),
            first_failure,
            failure_count,
        }
    }

    /// `true` when this is the first failure recorded for its signature.
    pub fn is_first_failure(&self) -> bool {
        self.failure_count == 1
    }

}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_message)?;
        if !self.is_first_failure() {
            write!(
                f,
                "\nFirst failure (of {}):\n  {}",
                self.failure_count,
                self.first_failure.replace('\n', "\n  ")
            )?;
        }
        Ok(())
    }
}

/// Arity and keyword problems. Never routed through a handler.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("wrong number of arguments (given {given}, expected {expected})")]
    WrongNumber { given: usize, expected: String },

    #[error("missing keyword{}: {}", plural(.0), symbols(.0))]
    MissingKeywords(Vec<Arc<str>>),

    #[error("unknown keyword{}: {}", plural(.0), symbols(.0))]
    UnknownKeywords(Vec<Arc<str>>),
}

fn plural(names: &[Arc<str>]) -> &'static str {
    if names.len() == 1 { "" } else { "s" }
}

fn symbols(names: &[Arc<str>]) -> String {
    names
        .iter()
        .map(|n| format!(":{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of an inline assertion (`let_type`, `cast`, `must`).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InlineTypeError {
    pub message: String,
}

/// Anything that can go wrong while dispatching a call.
#[derive(Clone, Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(
        "The method `{method}` on {owner} is declared as `abstract`. It does not have an implementation."
    )]
    AbstractMethod { method: Arc<str>, owner: Arc<str> },

    #[error("undefined method `{method}' for {receiver}")]
    NoMethod { method: Arc<str>, receiver: String },

    /// Error produced by a method body itself.
    #[error("{0}")]
    Raised(String),
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid sealed allow-list pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("invalid value `{value}` for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error(
        "test-mode checking must be configured before any method with a sig marked \
         `.checked(:tests)` is called"
    )]
    TestModeLocked,
}

// =============================================================================
// Aggregate
// =============================================================================

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    #[error(transparent)]
    SigBuild(#[from] SigBuildError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    InlineType(#[from] InlineTypeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Coerce(#[from] CoerceError),
}

impl From<ClassTableError> for Error {
    fn from(err: ClassTableError) -> Self {
        Error::Hierarchy(HierarchyError::Class(err))
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Call(CallError::Type(err))
    }
}

impl From<ArgumentError> for Error {
    fn from(err: ArgumentError) -> Self {
        Error::Call(CallError::Argument(err))
    }
}

//! rtype: a runtime type algebra with method-signature enforcement.
//!
//! The work is split across the workspace crates, re-exported here:
//!
//! - [`common`] - source locations and recursion limits
//! - [`solver`] - interned types, class hierarchy, subtyping and value validation
//! - [`sig`] - `sig` declarations, call validation and inheritance contracts
//!
//! The root package adds tracing setup and, behind the `cli` feature, the
//! `rtype` command-line tool.

pub use rtype_common as common;
pub use rtype_sig as sig;
pub use rtype_solver as solver;

pub use rtype_sig::{
    Args, CallError, CheckedLevel, ClassId, Error, MethodDef, MethodParam, Runtime, SigBuilder,
    SourceLocation, TypeId, ValidationConfig, Value,
};

#[cfg(feature = "cli")]
pub mod cli;
pub mod tracing_config;

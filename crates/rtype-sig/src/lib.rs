//! Method signatures for dynamically typed code.
//!
//! This crate provides:
//! - `SigBuilder` - the `sig` declaration builder
//! - `Signature` - an immutable, resolved signature
//! - `install` - wrapping a method body with call validation
//! - `Runtime` - class hierarchy, method table and dispatch, enforcing
//!   override/abstract/final/sealed contracts
//! - `ValidationConfig` / `Handlers` - configuration and error hooks

pub mod assertions;
pub mod binding;
pub mod body;
pub mod builder;
pub mod config;
pub mod contracts;
pub mod error;
pub mod handlers;
pub mod method;
pub mod runtime;
pub mod shape;
pub mod signature;
pub mod validation;

pub use binding::{BoundArg, bind_arguments};
pub use body::ClassBody;
pub use builder::{Declaration, IntoDeclaration, SigBuilder};
pub use config::{TestMode, ValidationConfig};
pub use error::{
    ArgumentError, CallError, ConfigError, ContractError, ContractKind, DeclarationError, Error,
    FailureKind, HierarchyError, InlineTypeError, SigBuildError, TypeError,
};
pub use handlers::Handlers;
pub use method::{Args, MethodBody, MethodDef, MethodParam, Visibility};
pub use runtime::{MethodEntry, Runtime};
pub use signature::{
    AllowIncompatible, CheckedLevel, FailurePolicy, Mode, ParamDescriptor, ParamKind, Signature,
};
pub use validation::{ValidationContext, install};

// Re-export the type algebra so embedders need a single dependency.
pub use rtype_common::SourceLocation;
pub use rtype_solver::{
    ClassFlags, ClassId, ClassTable, InspectOptions, ObjectRef, ProcRef, RawType, TypeDatabase,
    TypeId, TypeInterner, Value,
};

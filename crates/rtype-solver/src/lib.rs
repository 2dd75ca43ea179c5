//! Runtime type algebra.
//!
//! Types are data: interned [`TypeData`] nodes referenced by [`TypeId`]. On top
//! of the representation this crate provides
//!
//! - a class/module table with Ruby-style ancestor linearisation
//!   ([`ClassTable`]),
//! - a dynamic value model ([`Value`]) and validity checks of values against
//!   types ([`is_valid`], [`is_recursively_valid`]),
//! - the subtype relation ([`is_subtype_of`]),
//! - rendering ([`TypeFormatter`]) and parsing ([`parse_type`]) of type
//!   expressions, and coercion of loose type arguments ([`coerce`]).
//!
//! Key properties:
//! - O(1) type equality via interning (`TypeId` comparison)
//! - All tables are `Send + Sync`; interning is idempotent under races
//! - Generic type parameters are erased at runtime: always valid, always
//!   compatible
pub mod coerce;
mod format;
pub mod hierarchy;
mod intern;
pub mod parse;
pub mod recursion;
mod subtype;
pub mod types;
pub mod validate;
pub mod value;

pub use coerce::{CoerceError, RawType, class_type, coerce};
pub use format::TypeFormatter;
pub use hierarchy::{
    ClassFlags, ClassId, ClassInfo, ClassKind, ClassTable, ClassTableError, EnumMember,
};
pub use intern::{TypeDatabase, TypeInterner};
pub use parse::{ParseError, parse_type};
pub use subtype::{SubtypeChecker, are_equivalent, is_subtype_of};
pub use types::{ContainerKind, ProcShape, SingletonKey, TypeData, TypeId, TypeList, Variance};
pub use validate::{is_recursively_valid, is_valid, mismatch_message};
pub use value::{InspectOptions, ObjectRef, ProcRef, Value};

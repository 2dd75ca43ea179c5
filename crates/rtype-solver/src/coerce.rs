//! Conversion of loosely specified type arguments into interned types.
//!
//! Declarations accept a bare class, an enum member, an already-built type or
//! a type expression; everything funnels through [`coerce`].

use crate::TypeDatabase;
use crate::hierarchy::{ClassFlags, ClassId};
use crate::parse::{ParseError, parse_type};
use crate::types::{ContainerKind, TypeId};
use crate::value::ObjectRef;
use thiserror::Error;

/// Something that can stand for a type in a declaration.
#[derive(Clone, Debug)]
pub enum RawType {
    Type(TypeId),
    Class(ClassId),
    /// An enum member; coerces to its singleton type.
    EnumValue(ObjectRef),
    /// A type expression, see [`crate::parse`].
    Expr(String),
}

impl From<TypeId> for RawType {
    fn from(id: TypeId) -> Self {
        RawType::Type(id)
    }
}

impl From<ClassId> for RawType {
    fn from(id: ClassId) -> Self {
        RawType::Class(id)
    }
}

impl From<&str> for RawType {
    fn from(expr: &str) -> Self {
        RawType::Expr(expr.to_string())
    }
}

impl From<String> for RawType {
    fn from(expr: String) -> Self {
        RawType::Expr(expr)
    }
}

impl From<ObjectRef> for RawType {
    fn from(obj: ObjectRef) -> Self {
        RawType::EnumValue(obj)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CoerceError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unknown class or module id {0:?}")]
    UnknownClass(ClassId),
    #[error("unknown type id {0:?}")]
    UnknownType(TypeId),
    #[error("{0} is not a type: only enum members can be used as value types")]
    NotAType(String),
}

/// Coerce a raw type argument.
///
/// Bare generic builtins become their untyped generic form, so `Array` means
/// `T::Array[T.untyped]` and `Hash` means `T::Hash[T.untyped, T.untyped]`.
pub fn coerce(db: &dyn TypeDatabase, raw: impl Into<RawType>) -> Result<TypeId, CoerceError> {
    match raw.into() {
        RawType::Type(id) => {
            if db.lookup(id).is_none() {
                return Err(CoerceError::UnknownType(id));
            }
            Ok(id)
        }
        RawType::Class(class) => {
            if !db.classes().contains(class) {
                return Err(CoerceError::UnknownClass(class));
            }
            Ok(class_type(db, class))
        }
        RawType::EnumValue(object) => {
            let classes = db.classes();
            if !classes.flags(object.class()).contains(ClassFlags::ENUM) {
                let rendered = object
                    .label()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#<{}>", classes.name(object.class())));
                return Err(CoerceError::NotAType(rendered));
            }
            Ok(db.singleton(&object))
        }
        RawType::Expr(expr) => Ok(parse_type(db, &expr)?),
    }
}

/// The instance type of a class named on its own.
///
/// Generic builtins are erased to their untyped form, whether the class was
/// passed directly or written as a bare name in a type expression.
pub fn class_type(db: &dyn TypeDatabase, class: ClassId) -> TypeId {
    match class {
        ClassId::ARRAY => db.container(ContainerKind::Array, TypeId::UNTYPED),
        ClassId::SET => db.container(ContainerKind::Set, TypeId::UNTYPED),
        ClassId::RANGE => db.container(ContainerKind::Range, TypeId::UNTYPED),
        ClassId::ENUMERATOR => db.container(ContainerKind::Enumerator, TypeId::UNTYPED),
        ClassId::ENUMERABLE => db.container(ContainerKind::Enumerable, TypeId::UNTYPED),
        ClassId::HASH => db.hash(TypeId::UNTYPED, TypeId::UNTYPED),
        _ => db.simple(class),
    }
}

#[cfg(test)]
#[path = "tests/coerce_tests.rs"]
mod tests;

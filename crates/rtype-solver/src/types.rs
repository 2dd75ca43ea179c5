//! Type representation for the runtime type algebra.
//!
//! Types are interned: a [`TypeData`] is stored once in the [`TypeInterner`]
//! and referenced everywhere by its [`TypeId`]. Two structurally equal type
//! expressions therefore always share an id, which gives O(1) equality and
//! hashing and makes the per-class memoization of nominal types free.
//!
//! [`TypeInterner`]: crate::TypeInterner

use crate::hierarchy::ClassId;
use std::sync::Arc;

// =============================================================================
// TypeId
// =============================================================================

/// Interned type handle.
///
/// The first few ids are pre-registered by the interner so that the sentinels
/// and the most common nominal types can be used as constants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// `T.untyped`: absorbs everything in both directions.
    pub const UNTYPED: Self = Self(0);
    /// `T.anything`: the top type.
    pub const UNKNOWN: Self = Self(1);
    /// Internal "no declared return contract" marker.
    pub const VOID: Self = Self(2);
    /// `T.noreturn`: the bottom type, the empty union.
    pub const NORETURN: Self = Self(3);

    pub const NIL: Self = Self(4);
    pub const TRUE_CLASS: Self = Self(5);
    pub const FALSE_CLASS: Self = Self(6);
    /// `T::Boolean`, i.e. `T.any(TrueClass, FalseClass)`.
    pub const BOOLEAN: Self = Self(7);
    pub const OBJECT: Self = Self(8);
    pub const INTEGER: Self = Self(9);
    pub const FLOAT: Self = Self(10);
    pub const STRING: Self = Self(11);
    pub const SYMBOL: Self = Self(12);
    pub const PROC: Self = Self(13);

    /// First id handed out to types interned after construction.
    pub const FIRST_DYNAMIC: u32 = 14;

    /// Sentinels that never describe a concrete set of values.
    pub const fn is_sentinel(self) -> bool {
        self.0 <= Self::NORETURN.0
    }
}

// =============================================================================
// TypeData
// =============================================================================

/// Ordered, deduplicated member list of a union or intersection.
pub type TypeList = Arc<[TypeId]>;

/// The structural content of a type node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Untyped,
    /// Top type (`T.anything`).
    Unknown,
    Void,

    /// Nominal type: any value whose class has this class/module as an ancestor.
    Simple(ClassId),

    /// `T.any(...)`. The empty union is `T.noreturn`.
    Union(TypeList),
    /// `T.all(...)`.
    Intersection(TypeList),

    /// Single-parameter generic containers (`T::Array[X]`, `T::Set[X]`, ...).
    Container(ContainerKind, TypeId),
    /// `T::Hash[K, V]`.
    Hash(TypeId, TypeId),

    /// `T.proc.params(...).returns(...)`.
    Proc(Arc<ProcShape>),

    /// `T.class_of(Foo)`: the class object `Foo` or any of its subclasses.
    ClassOf(ClassId),
    /// `T::Class[X]`: any class whose instances are `X`.
    TypedClass(TypeId),
    /// `T::Module[X]`: any module (or class) whose instances are `X`.
    TypedModule(TypeId),

    /// Exactly one value (an enum member).
    Singleton(SingletonKey),

    /// `T.type_parameter(:U)`; erased at runtime.
    TypeParameter(Arc<str>),
    /// `T.type_member` / `T.type_template`; erased at runtime.
    TypeVariable(Variance, Option<TypeId>),
}

impl TypeData {
    pub fn is_union(&self) -> bool {
        matches!(self, TypeData::Union(_))
    }

    pub fn is_intersection(&self) -> bool {
        matches!(self, TypeData::Intersection(_))
    }
}

/// Identity of a singleton value type.
///
/// The label is carried so that the type can be rendered without consulting
/// the object; equality still includes the object id, so two enum members that
/// happen to share a label remain distinct.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SingletonKey {
    pub class: ClassId,
    pub object: u64,
    pub label: Arc<str>,
}

/// Parameter and return shape of a proc type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProcShape {
    pub params: Vec<(Arc<str>, TypeId)>,
    pub returns: TypeId,
    /// `T.proc.bind(X)`: the type of `self` inside the block.
    pub bind: Option<TypeId>,
}

impl ProcShape {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

// =============================================================================
// Containers
// =============================================================================

/// Runtime container family of a single-parameter generic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Set,
    Range,
    Enumerator,
    Enumerable,
}

impl ContainerKind {
    /// Class (or module, for `Enumerable`) every valid value must descend from.
    pub const fn underlying_class(self) -> ClassId {
        match self {
            ContainerKind::Array => ClassId::ARRAY,
            ContainerKind::Set => ClassId::SET,
            ContainerKind::Range => ClassId::RANGE,
            ContainerKind::Enumerator => ClassId::ENUMERATOR,
            ContainerKind::Enumerable => ClassId::ENUMERABLE,
        }
    }

    /// Rendered generic name, e.g. `T::Array`.
    pub const fn generic_name(self) -> &'static str {
        match self {
            ContainerKind::Array => "T::Array",
            ContainerKind::Set => "T::Set",
            ContainerKind::Range => "T::Range",
            ContainerKind::Enumerator => "T::Enumerator",
            ContainerKind::Enumerable => "T::Enumerable",
        }
    }

    pub fn from_generic_name(name: &str) -> Option<Self> {
        match name {
            "T::Array" => Some(ContainerKind::Array),
            "T::Set" => Some(ContainerKind::Set),
            "T::Range" => Some(ContainerKind::Range),
            "T::Enumerator" => Some(ContainerKind::Enumerator),
            "T::Enumerable" => Some(ContainerKind::Enumerable),
            _ => None,
        }
    }
}

/// Declared variance of a type member.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Variance {
    Invariant,
    Covariant,
    Contravariant,
}

impl Variance {
    pub const fn symbol(self) -> Option<&'static str> {
        match self {
            Variance::Invariant => None,
            Variance::Covariant => Some(":out"),
            Variance::Contravariant => Some(":in"),
        }
    }
}

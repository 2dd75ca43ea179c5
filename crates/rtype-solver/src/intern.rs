//! Type interning.
//!
//! Every [`TypeData`] is stored exactly once. Construction goes through the
//! factory methods on [`TypeDatabase`], which normalise their input before
//! interning:
//!
//! - nested unions/intersections are flattened into the parent,
//! - duplicate members are removed (order of first occurrence is kept),
//! - a single-member union/intersection collapses to the member,
//! - the empty union is `T.noreturn`.
//!
//! Nominal types are thereby memoized per class: `simple(c)` always returns
//! the same [`TypeId`] for the same class.

use crate::hierarchy::{ClassId, ClassTable};
use crate::types::{ContainerKind, ProcShape, SingletonKey, TypeData, TypeId, TypeList, Variance};
use crate::value::ObjectRef;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::sync::{Arc, RwLock};

// =============================================================================
// TypeDatabase
// =============================================================================

/// Query surface shared by the subtype checker, the validator, the formatter
/// and the parser.
pub trait TypeDatabase: Send + Sync {
    /// Structural content of an interned type.
    fn lookup(&self, id: TypeId) -> Option<TypeData>;

    /// Intern raw data without normalisation. Use the factory methods instead.
    fn intern(&self, data: TypeData) -> TypeId;

    /// The class table nominal types refer to.
    fn classes(&self) -> &ClassTable;

    /// Cached rendered name (see [`crate::TypeFormatter`]).
    fn name_of(&self, id: TypeId) -> Arc<str>;

    // -------------------------------------------------------------------------
    // Factories
    // -------------------------------------------------------------------------

    fn simple(&self, class: ClassId) -> TypeId {
        self.intern(TypeData::Simple(class))
    }

    fn union(&self, members: Vec<TypeId>) -> TypeId {
        let flat = self.flatten(members, TypeData::is_union);
        match flat.len() {
            1 => flat[0],
            _ => self.intern(TypeData::Union(flat.into_iter().collect())),
        }
    }

    /// `T.all(...)`. An empty member list yields `T.anything`.
    fn intersection(&self, members: Vec<TypeId>) -> TypeId {
        let flat = self.flatten(members, TypeData::is_intersection);
        match flat.len() {
            0 => TypeId::UNKNOWN,
            1 => flat[0],
            _ => self.intern(TypeData::Intersection(flat.into_iter().collect())),
        }
    }

    /// `T.nilable(t)`.
    fn nilable(&self, inner: TypeId) -> TypeId {
        self.union(vec![inner, TypeId::NIL])
    }

    fn container(&self, kind: ContainerKind, element: TypeId) -> TypeId {
        self.intern(TypeData::Container(kind, element))
    }

    fn array(&self, element: TypeId) -> TypeId {
        self.container(ContainerKind::Array, element)
    }

    fn set(&self, element: TypeId) -> TypeId {
        self.container(ContainerKind::Set, element)
    }

    fn range(&self, element: TypeId) -> TypeId {
        self.container(ContainerKind::Range, element)
    }

    fn enumerator(&self, element: TypeId) -> TypeId {
        self.container(ContainerKind::Enumerator, element)
    }

    fn enumerable(&self, element: TypeId) -> TypeId {
        self.container(ContainerKind::Enumerable, element)
    }

    fn hash(&self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(TypeData::Hash(key, value))
    }

    fn proc_type(&self, params: Vec<(Arc<str>, TypeId)>, returns: TypeId) -> TypeId {
        self.intern(TypeData::Proc(Arc::new(ProcShape {
            params,
            returns,
            bind: None,
        })))
    }

    fn bound_proc(
        &self,
        bind: TypeId,
        params: Vec<(Arc<str>, TypeId)>,
        returns: TypeId,
    ) -> TypeId {
        self.intern(TypeData::Proc(Arc::new(ProcShape {
            params,
            returns,
            bind: Some(bind),
        })))
    }

    fn class_of(&self, class: ClassId) -> TypeId {
        self.intern(TypeData::ClassOf(class))
    }

    fn typed_class(&self, instance: TypeId) -> TypeId {
        self.intern(TypeData::TypedClass(instance))
    }

    fn typed_module(&self, instance: TypeId) -> TypeId {
        self.intern(TypeData::TypedModule(instance))
    }

    /// Singleton type of one enum member.
    fn singleton(&self, object: &ObjectRef) -> TypeId {
        let label: Arc<str> = match object.label() {
            Some(label) => label.into(),
            None => format!("{}#{}", self.classes().name(object.class()), object.id()).into(),
        };
        self.intern(TypeData::Singleton(SingletonKey {
            class: object.class(),
            object: object.id(),
            label,
        }))
    }

    fn type_parameter(&self, name: &str) -> TypeId {
        self.intern(TypeData::TypeParameter(name.into()))
    }

    fn type_variable(&self, variance: Variance, fixed: Option<TypeId>) -> TypeId {
        self.intern(TypeData::TypeVariable(variance, fixed))
    }

    /// Flatten nested composites of the same shape and drop duplicates.
    #[doc(hidden)]
    fn flatten(&self, members: Vec<TypeId>, same_shape: fn(&TypeData) -> bool) -> Vec<TypeId> {
        let mut out: SmallVec<[TypeId; 8]> = SmallVec::new();
        for member in members {
            match self.lookup(member) {
                Some(data) if same_shape(&data) => {
                    let nested: TypeList = match data {
                        TypeData::Union(list) | TypeData::Intersection(list) => list,
                        _ => continue,
                    };
                    for inner in nested.iter() {
                        if !out.contains(inner) {
                            out.push(*inner);
                        }
                    }
                }
                _ => {
                    if !out.contains(&member) {
                        out.push(member);
                    }
                }
            }
        }
        out.into_vec()
    }
}

// =============================================================================
// TypeInterner
// =============================================================================

/// Thread-safe interner backing [`TypeDatabase`].
pub struct TypeInterner {
    types: RwLock<Vec<TypeData>>,
    index: DashMap<TypeData, TypeId, FxBuildHasher>,
    names: DashMap<TypeId, Arc<str>, FxBuildHasher>,
    classes: ClassTable,
}

impl TypeInterner {
    /// Create an interner with a fresh builtin class table.
    pub fn new() -> Self {
        Self::with_classes(ClassTable::new())
    }

    pub fn with_classes(classes: ClassTable) -> Self {
        let interner = Self {
            types: RwLock::new(Vec::with_capacity(64)),
            index: DashMap::default(),
            names: DashMap::default(),
            classes,
        };
        interner.register_constants();
        interner
    }

    fn register_constants(&self) {
        let constants = [
            (TypeId::UNTYPED, TypeData::Untyped),
            (TypeId::UNKNOWN, TypeData::Unknown),
            (TypeId::VOID, TypeData::Void),
            (TypeId::NORETURN, TypeData::Union(Arc::from([]))),
            (TypeId::NIL, TypeData::Simple(ClassId::NIL_CLASS)),
            (TypeId::TRUE_CLASS, TypeData::Simple(ClassId::TRUE_CLASS)),
            (TypeId::FALSE_CLASS, TypeData::Simple(ClassId::FALSE_CLASS)),
            (
                TypeId::BOOLEAN,
                TypeData::Union(Arc::from([TypeId::TRUE_CLASS, TypeId::FALSE_CLASS])),
            ),
            (TypeId::OBJECT, TypeData::Simple(ClassId::OBJECT)),
            (TypeId::INTEGER, TypeData::Simple(ClassId::INTEGER)),
            (TypeId::FLOAT, TypeData::Simple(ClassId::FLOAT)),
            (TypeId::STRING, TypeData::Simple(ClassId::STRING)),
            (TypeId::SYMBOL, TypeData::Simple(ClassId::SYMBOL)),
            (TypeId::PROC, TypeData::Simple(ClassId::PROC)),
        ];
        for (expected, data) in constants {
            let id = self.intern(data);
            debug_assert_eq!(id, expected, "pre-registered type ids out of order");
        }
        debug_assert_eq!(self.len() as u32, TypeId::FIRST_DYNAMIC);
    }

    /// Number of interned types.
    pub fn len(&self) -> usize {
        self.types.read().map(|t| t.len()).unwrap_or(0)
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDatabase for TypeInterner {
    fn lookup(&self, id: TypeId) -> Option<TypeData> {
        let types = self.types.read().ok()?;
        types.get(id.0 as usize).cloned()
    }

    fn intern(&self, data: TypeData) -> TypeId {
        if let Some(id) = self.index.get(&data) {
            return *id;
        }
        // The entry holds the shard lock, so two racing writers of the same
        // data cannot both push.
        *self.index.entry(data.clone()).or_insert_with(|| {
            let mut types = match self.types.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let id = TypeId(types.len() as u32);
            types.push(data);
            id
        })
    }

    fn classes(&self) -> &ClassTable {
        &self.classes
    }

    fn name_of(&self, id: TypeId) -> Arc<str> {
        if let Some(name) = self.names.get(&id) {
            return name.clone();
        }
        let rendered: Arc<str> = crate::format::TypeFormatter::new(self).format(id).into();
        self.names.insert(id, rendered.clone());
        rendered
    }
}

#[cfg(test)]
#[path = "tests/intern_tests.rs"]
mod tests;

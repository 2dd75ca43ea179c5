//! Class and module table.
//!
//! The runtime has no open classes, so every class/module the type algebra can
//! refer to is registered here explicitly, together with its inheritance edges
//! (superclass, included modules, extended modules) and a metadata record of
//! entity-level declarations (`abstract!`, `interface!`, `sealed!`, `final!`).
//!
//! Ancestor lookup follows Ruby's linearisation: the class itself, then its
//! included modules (most recently included first, each expanded recursively),
//! then the superclass chain. Modules already present in the superclass chain
//! are not repeated. Linearisations are cached and the cache is dropped
//! whenever an edge is added.

use crate::value::{InspectOptions, ObjectRef, Value};
use bitflags::bitflags;
use dashmap::DashMap;
use rtype_common::SourceLocation;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tracing::trace;

// =============================================================================
// ClassId
// =============================================================================

/// Identity of a class or module.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    pub const BASIC_OBJECT: Self = Self(0);
    pub const OBJECT: Self = Self(1);
    pub const KERNEL: Self = Self(2);
    pub const COMPARABLE: Self = Self(3);
    pub const ENUMERABLE: Self = Self(4);
    pub const NIL_CLASS: Self = Self(5);
    pub const TRUE_CLASS: Self = Self(6);
    pub const FALSE_CLASS: Self = Self(7);
    pub const NUMERIC: Self = Self(8);
    pub const INTEGER: Self = Self(9);
    pub const FLOAT: Self = Self(10);
    pub const STRING: Self = Self(11);
    pub const SYMBOL: Self = Self(12);
    pub const ARRAY: Self = Self(13);
    pub const HASH: Self = Self(14);
    pub const RANGE: Self = Self(15);
    pub const SET: Self = Self(16);
    pub const ENUMERATOR: Self = Self(17);
    pub const PROC: Self = Self(18);
    pub const MODULE: Self = Self(19);
    pub const CLASS: Self = Self(20);

    /// First id handed out to user-defined classes and modules.
    pub const FIRST_USER: u32 = 21;

    pub const fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_USER
    }
}

/// Whether an entity is a class (instantiable, single superclass) or a module.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Module,
}

bitflags! {
    /// Entity-level declarations.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u8 {
        const ABSTRACT = 1 << 0;
        /// Implies `ABSTRACT`; every method must be abstract.
        const INTERFACE = 1 << 1;
        const SEALED = 1 << 2;
        const FINAL = 1 << 3;
        /// Instances are a closed set of singleton values.
        const ENUM = 1 << 4;
    }
}

// =============================================================================
// ClassInfo
// =============================================================================

/// Metadata record for one class or module.
#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: Arc<str>,
    pub kind: ClassKind,
    /// `None` only for `BasicObject` and for modules.
    pub superclass: Option<ClassId>,
    /// Included modules, in inclusion order.
    pub includes: Vec<ClassId>,
    /// Modules extended onto the class object itself.
    pub extends: Vec<ClassId>,
    pub flags: ClassFlags,
    /// Where the entity was declared (`None` for builtins).
    pub location: Option<SourceLocation>,
}

impl ClassInfo {
    fn builtin(name: &str, kind: ClassKind, superclass: Option<ClassId>) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass,
            includes: Vec::new(),
            extends: Vec::new(),
            flags: ClassFlags::empty(),
            location: None,
        }
    }

    pub fn is_module(&self) -> bool {
        self.kind == ClassKind::Module
    }

    pub fn is_abstract(&self) -> bool {
        self.flags
            .intersects(ClassFlags::ABSTRACT | ClassFlags::INTERFACE)
    }
}

/// Structural errors raised while editing the class table.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClassTableError {
    #[error("unknown class or module id {0:?}")]
    UnknownClass(ClassId),
    #[error("`{0}` is already defined")]
    DuplicateName(Arc<str>),
    #[error("superclass must be a class, but `{0}` is a module")]
    SuperclassNotAClass(Arc<str>),
    #[error("wrong argument type `{0}` (expected a module)")]
    NotAModule(Arc<str>),
    #[error("cyclic include detected: `{module}` already includes `{target}`")]
    CyclicInclude { target: Arc<str>, module: Arc<str> },
    #[error("Enum values must have unique serializations. Value '{value}' is repeated on {owner}.")]
    DuplicateSerialization { owner: Arc<str>, value: String },
    #[error("Enum {owner} key not found: {value}")]
    UnknownSerialization { owner: Arc<str>, value: String },
}

/// A registered enum member and the value it serializes to.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumMember {
    pub value: ObjectRef,
    pub serialized: Value,
}

// =============================================================================
// ClassTable
// =============================================================================

/// Process-wide registry of classes and modules.
///
/// All methods take `&self`; the table is safe to share between threads.
pub struct ClassTable {
    entries: DashMap<ClassId, ClassInfo, FxBuildHasher>,
    by_name: DashMap<Arc<str>, ClassId, FxBuildHasher>,
    ancestors: DashMap<ClassId, Arc<[ClassId]>, FxBuildHasher>,
    enum_values: DashMap<ClassId, Vec<EnumMember>, FxBuildHasher>,
    next_id: AtomicU32,
}

impl ClassTable {
    pub fn new() -> Self {
        let table = Self {
            entries: DashMap::default(),
            by_name: DashMap::default(),
            ancestors: DashMap::default(),
            enum_values: DashMap::default(),
            next_id: AtomicU32::new(ClassId::FIRST_USER),
        };
        table.register_builtins();
        table
    }

    fn register_builtins(&self) {
        use ClassKind::{Class, Module};
        let obj = Some(ClassId::OBJECT);
        let builtins: [(ClassId, &str, ClassKind, Option<ClassId>, &[ClassId]); 21] = [
            (ClassId::BASIC_OBJECT, "BasicObject", Class, None, &[]),
            (ClassId::OBJECT, "Object", Class, Some(ClassId::BASIC_OBJECT), &[ClassId::KERNEL]),
            (ClassId::KERNEL, "Kernel", Module, None, &[]),
            (ClassId::COMPARABLE, "Comparable", Module, None, &[]),
            (ClassId::ENUMERABLE, "Enumerable", Module, None, &[]),
            (ClassId::NIL_CLASS, "NilClass", Class, obj, &[]),
            (ClassId::TRUE_CLASS, "TrueClass", Class, obj, &[]),
            (ClassId::FALSE_CLASS, "FalseClass", Class, obj, &[]),
            (ClassId::NUMERIC, "Numeric", Class, obj, &[ClassId::COMPARABLE]),
            (ClassId::INTEGER, "Integer", Class, Some(ClassId::NUMERIC), &[]),
            (ClassId::FLOAT, "Float", Class, Some(ClassId::NUMERIC), &[]),
            (ClassId::STRING, "String", Class, obj, &[ClassId::COMPARABLE]),
            (ClassId::SYMBOL, "Symbol", Class, obj, &[ClassId::COMPARABLE]),
            (ClassId::ARRAY, "Array", Class, obj, &[ClassId::ENUMERABLE]),
            (ClassId::HASH, "Hash", Class, obj, &[ClassId::ENUMERABLE]),
            (ClassId::RANGE, "Range", Class, obj, &[ClassId::ENUMERABLE]),
            (ClassId::SET, "Set", Class, obj, &[ClassId::ENUMERABLE]),
            (ClassId::ENUMERATOR, "Enumerator", Class, obj, &[ClassId::ENUMERABLE]),
            (ClassId::PROC, "Proc", Class, obj, &[]),
            (ClassId::MODULE, "Module", Class, obj, &[]),
            (ClassId::CLASS, "Class", Class, Some(ClassId::MODULE), &[]),
        ];
        for (id, name, kind, superclass, includes) in builtins {
            let mut info = ClassInfo::builtin(name, kind, superclass);
            info.includes.extend_from_slice(includes);
            self.by_name.insert(info.name.clone(), id);
            self.entries.insert(id, info);
        }
    }

    /// Number of registered classes and modules (builtins included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // -------------------------------------------------------------------------
    // Definition
    // -------------------------------------------------------------------------

    /// Register a new class. `superclass` defaults to `Object`.
    pub fn define_class(
        &self,
        name: &str,
        superclass: Option<ClassId>,
        location: Option<SourceLocation>,
    ) -> Result<ClassId, ClassTableError> {
        let superclass = superclass.unwrap_or(ClassId::OBJECT);
        let parent = self.get(superclass)?;
        if parent.is_module() {
            return Err(ClassTableError::SuperclassNotAClass(parent.name));
        }
        self.insert_new(name, ClassKind::Class, Some(superclass), location)
    }

    /// Register a new module.
    pub fn define_module(
        &self,
        name: &str,
        location: Option<SourceLocation>,
    ) -> Result<ClassId, ClassTableError> {
        self.insert_new(name, ClassKind::Module, None, location)
    }

    fn insert_new(
        &self,
        name: &str,
        kind: ClassKind,
        superclass: Option<ClassId>,
        location: Option<SourceLocation>,
    ) -> Result<ClassId, ClassTableError> {
        let name: Arc<str> = name.into();
        let entry = self.by_name.entry(name.clone());
        if let dashmap::mapref::entry::Entry::Occupied(_) = entry {
            return Err(ClassTableError::DuplicateName(name));
        }
        let id = ClassId(self.next_id.fetch_add(1, Ordering::Relaxed));
        entry.insert(id);
        self.entries.insert(
            id,
            ClassInfo {
                name,
                kind,
                superclass,
                includes: Vec::new(),
                extends: Vec::new(),
                flags: ClassFlags::empty(),
                location,
            },
        );
        trace!(class = id.0, ?kind, "registered class");
        Ok(id)
    }

    /// Record `include module` on `target`. Including an already-included
    /// module is a no-op.
    pub fn add_include(&self, target: ClassId, module: ClassId) -> Result<(), ClassTableError> {
        let module_info = self.get(module)?;
        if !module_info.is_module() {
            return Err(ClassTableError::NotAModule(module_info.name));
        }
        let target_info = self.get(target)?;
        if module == target || self.ancestors(module).contains(&target) {
            return Err(ClassTableError::CyclicInclude {
                target: target_info.name,
                module: module_info.name,
            });
        }
        if let Some(mut entry) = self.entries.get_mut(&target) {
            if !entry.includes.contains(&module) {
                entry.includes.push(module);
            }
        }
        self.ancestors.clear();
        Ok(())
    }

    /// Record `extend module` on `target` (the class object gains the module's
    /// ancestors).
    pub fn add_extend(&self, target: ClassId, module: ClassId) -> Result<(), ClassTableError> {
        let module_info = self.get(module)?;
        if !module_info.is_module() {
            return Err(ClassTableError::NotAModule(module_info.name));
        }
        self.get(target)?;
        if let Some(mut entry) = self.entries.get_mut(&target) {
            if !entry.extends.contains(&module) {
                entry.extends.push(module);
            }
        }
        Ok(())
    }

    /// Undo an `include` recorded by [`Self::add_include`].
    pub fn remove_include(&self, target: ClassId, module: ClassId) {
        if let Some(mut entry) = self.entries.get_mut(&target) {
            entry.includes.retain(|&m| m != module);
        }
        self.ancestors.clear();
    }

    /// Undo an `extend` recorded by [`Self::add_extend`].
    pub fn remove_extend(&self, target: ClassId, module: ClassId) {
        if let Some(mut entry) = self.entries.get_mut(&target) {
            entry.extends.retain(|&m| m != module);
        }
    }

    /// Add entity-level declaration flags.
    pub fn add_flags(&self, id: ClassId, flags: ClassFlags) -> Result<(), ClassTableError> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(ClassTableError::UnknownClass(id))?;
        entry.flags |= flags;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Snapshot of the metadata record.
    pub fn get(&self, id: ClassId) -> Result<ClassInfo, ClassTableError> {
        self.entries
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(ClassTableError::UnknownClass(id))
    }

    pub fn contains(&self, id: ClassId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).map(|e| *e.value())
    }

    /// Display name; unknown ids render as `<unknown class>`.
    pub fn name(&self, id: ClassId) -> Arc<str> {
        self.entries
            .get(&id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| "<unknown class>".into())
    }

    pub fn kind(&self, id: ClassId) -> Option<ClassKind> {
        self.entries.get(&id).map(|e| e.kind)
    }

    pub fn flags(&self, id: ClassId) -> ClassFlags {
        self.entries
            .get(&id)
            .map(|e| e.flags)
            .unwrap_or_default()
    }

    pub fn location(&self, id: ClassId) -> Option<SourceLocation> {
        self.entries.get(&id).and_then(|e| e.location.clone())
    }

    /// Linearised ancestors, starting with `id` itself.
    pub fn ancestors(&self, id: ClassId) -> Arc<[ClassId]> {
        if let Some(cached) = self.ancestors.get(&id) {
            return cached.clone();
        }
        let computed: Arc<[ClassId]> = self.linearize(id, 0).into();
        self.ancestors.insert(id, computed.clone());
        computed
    }

    fn linearize(&self, id: ClassId, depth: u32) -> Vec<ClassId> {
        // Cycles are rejected by `add_include`; the depth cap only guards
        // against corrupted tables.
        if depth > 256 {
            return vec![id];
        }
        let Some(info) = self.entries.get(&id).map(|e| e.value().clone()) else {
            return vec![id];
        };
        let super_chain = info
            .superclass
            .map(|sup| self.linearize(sup, depth + 1))
            .unwrap_or_default();

        let mut result = vec![id];
        for &module in info.includes.iter().rev() {
            for ancestor in self.linearize(module, depth + 1) {
                if !result.contains(&ancestor) && !super_chain.contains(&ancestor) {
                    result.push(ancestor);
                }
            }
        }
        for ancestor in super_chain {
            if !result.contains(&ancestor) {
                result.push(ancestor);
            }
        }
        result
    }

    /// `true` if `ancestor` appears in the linearisation of `id`.
    pub fn is_subclass_of(&self, id: ClassId, ancestor: ClassId) -> bool {
        id == ancestor || self.ancestors(id).contains(&ancestor)
    }

    /// Ancestors of the class *object* `id` (the singleton side): modules
    /// extended onto it or onto any superclass, then `Class`/`Module`.
    pub fn singleton_ancestors(&self, id: ClassId) -> Vec<ClassId> {
        let mut result = Vec::new();
        let mut current = Some(id);
        let mut kind = ClassKind::Class;
        let mut first = true;
        while let Some(cid) = current {
            let Some(info) = self.entries.get(&cid).map(|e| e.value().clone()) else {
                break;
            };
            if first {
                kind = info.kind;
                first = false;
            }
            for &module in info.extends.iter().rev() {
                for ancestor in self.ancestors(module).iter() {
                    if !result.contains(ancestor) {
                        result.push(*ancestor);
                    }
                }
            }
            current = info.superclass;
        }
        let meta = match kind {
            ClassKind::Class => ClassId::CLASS,
            ClassKind::Module => ClassId::MODULE,
        };
        for ancestor in self.ancestors(meta).iter() {
            if !result.contains(ancestor) {
                result.push(*ancestor);
            }
        }
        result
    }

    // -------------------------------------------------------------------------
    // Enum members
    // -------------------------------------------------------------------------

    /// Register a member of an enum class. It serializes to its lowercased
    /// short label (`Suit::Spades` serializes to `"spades"`).
    pub fn register_enum_value(&self, class: ClassId, value: ObjectRef) -> Result<(), ClassTableError> {
        let label = self.short_label(class, &value).unwrap_or_default();
        let serialized = Value::string(label.to_lowercase());
        self.register_enum_value_serialized(class, value, serialized)
    }

    /// Register a member of an enum class with an explicit serialized form.
    /// Serialized forms are unique within one enum.
    pub fn register_enum_value_serialized(
        &self,
        class: ClassId,
        value: ObjectRef,
        serialized: Value,
    ) -> Result<(), ClassTableError> {
        let mut members = self.enum_values.entry(class).or_default();
        if members.iter().any(|m| m.serialized == serialized) {
            return Err(ClassTableError::DuplicateSerialization {
                owner: self.name(class),
                value: match &serialized {
                    Value::String(s) => s.to_string(),
                    other => other.inspect(self, &InspectOptions::default()),
                },
            });
        }
        members.push(EnumMember { value, serialized });
        Ok(())
    }

    pub fn enum_values(&self, class: ClassId) -> Vec<ObjectRef> {
        self.enum_values
            .get(&class)
            .map(|e| e.iter().map(|m| m.value.clone()).collect())
            .unwrap_or_default()
    }

    /// `Spades` for `Suit::Spades`.
    fn short_label<'v>(&self, class: ClassId, value: &'v ObjectRef) -> Option<&'v str> {
        let prefix = self.name(class);
        value
            .label()
            .and_then(|l| l.strip_prefix(&*prefix))
            .and_then(|rest| rest.strip_prefix("::"))
    }

    /// Find an enum member of `class` by its short label (e.g. `Spades`).
    pub fn enum_value_by_label(&self, class: ClassId, label: &str) -> Option<ObjectRef> {
        self.enum_values.get(&class).and_then(|members| {
            members
                .iter()
                .find(|m| self.short_label(class, &m.value) == Some(label))
                .map(|m| m.value.clone())
        })
    }

    /// The serialized form of an enum member, `None` for anything else.
    pub fn serialize(&self, value: &ObjectRef) -> Option<Value> {
        self.enum_values.get(&value.class()).and_then(|members| {
            members
                .iter()
                .find(|m| m.value == *value)
                .map(|m| m.serialized.clone())
        })
    }

    /// The member of `class` serializing to `serialized`, if any.
    pub fn try_deserialize(&self, class: ClassId, serialized: &Value) -> Option<ObjectRef> {
        self.enum_values.get(&class).and_then(|members| {
            members
                .iter()
                .find(|m| m.serialized == *serialized)
                .map(|m| m.value.clone())
        })
    }

    /// Like [`Self::try_deserialize`], but an unknown serialized value is an
    /// error.
    pub fn deserialize(&self, class: ClassId, serialized: &Value) -> Result<ObjectRef, ClassTableError> {
        self.try_deserialize(class, serialized)
            .ok_or_else(|| ClassTableError::UnknownSerialization {
                owner: self.name(class),
                value: serialized.inspect(self, &InspectOptions::default()),
            })
    }

    pub fn has_serialized(&self, class: ClassId, serialized: &Value) -> bool {
        self.try_deserialize(class, serialized).is_some()
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/hierarchy_tests.rs"]
mod tests;

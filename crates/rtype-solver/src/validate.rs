//! Value validation against types.
//!
//! Two strengths are offered:
//!
//! - **shallow** (`is_valid`): generic element types are erased, so
//!   `T::Array[Integer]` accepts any array. Cheap, constant time for
//!   containers.
//! - **recursive** (`is_recursively_valid`): container elements are checked
//!   too, down to `MAX_VALIDATION_DEPTH`. Past that depth the remainder is
//!   treated as valid.
//!
//! Type parameters and type members are always valid: generics are erased at
//! runtime and only the static checker tracks them.

use crate::TypeDatabase;
use crate::hierarchy::{ClassId, ClassKind};
use crate::recursion::{DepthGuard, RecursionProfile};
use crate::types::{ContainerKind, TypeData, TypeId};
use crate::value::{InspectOptions, Value};
use rtype_common::limits::{MAX_DESCRIBE_SAMPLE, STACK_GROW_SIZE, STACK_RED_ZONE};
use tracing::debug;

pub struct ValueChecker<'a> {
    db: &'a dyn TypeDatabase,
    deep: bool,
    guard: DepthGuard,
}

impl<'a> ValueChecker<'a> {
    pub fn new(db: &'a dyn TypeDatabase, deep: bool) -> Self {
        Self {
            db,
            deep,
            guard: DepthGuard::with_profile(RecursionProfile::ValueValidation),
        }
    }

    pub fn check(&mut self, ty: TypeId, value: &Value) -> bool {
        if ty == TypeId::UNTYPED {
            return true;
        }
        let Some(data) = self.db.lookup(ty) else {
            return false;
        };
        let db = self.db;
        let classes = db.classes();
        match data {
            TypeData::Untyped
            | TypeData::Unknown
            | TypeData::Void
            | TypeData::TypeParameter(_)
            | TypeData::TypeVariable(..) => true,
            TypeData::Simple(class) => value.is_a(class, classes),
            TypeData::Union(members) => members.iter().any(|&m| self.check(m, value)),
            TypeData::Intersection(members) => members.iter().all(|&m| self.check(m, value)),
            TypeData::Container(kind, element) => {
                value.is_a(kind.underlying_class(), classes)
                    && (!self.deep || self.check_elements(kind, element, value))
            }
            TypeData::Hash(key, val) => {
                let Value::Hash(pairs) = value else {
                    return value.is_a(ClassId::HASH, classes) && !self.deep;
                };
                !self.deep
                    || self.descend(|this| {
                        pairs
                            .iter()
                            .all(|(k, v)| this.check(key, k) && this.check(val, v))
                    })
            }
            TypeData::Proc(_) => value.is_a(ClassId::PROC, classes),
            TypeData::ClassOf(class) => {
                matches!(value, Value::Class(id) if classes.is_subclass_of(*id, class))
            }
            TypeData::TypedClass(_) => {
                matches!(value, Value::Class(id) if classes.kind(*id) == Some(ClassKind::Class))
            }
            TypeData::TypedModule(_) => matches!(value, Value::Class(_)),
            TypeData::Singleton(key) => {
                matches!(value, Value::Object(obj) if obj.id() == key.object)
            }
        }
    }

    fn check_elements(&mut self, kind: ContainerKind, element: TypeId, value: &Value) -> bool {
        if element == TypeId::UNTYPED {
            return true;
        }
        match value {
            Value::Range(bounds) => self.descend(|this| {
                [&bounds.0, &bounds.1]
                    .into_iter()
                    .filter(|end| !end.is_nil())
                    .all(|end| this.check(element, end))
            }),
            // Pairs against a single-parameter enumerable: erased.
            Value::Hash(_) => true,
            _ => match value.elements() {
                Some(items) => self.descend(|this| items.iter().all(|item| this.check(element, item))),
                None => {
                    debug!(?kind, "container without enumerable elements; element type erased");
                    true
                }
            },
        }
    }

    /// Run `f` one level deeper; past the depth limit the answer is `true`.
    fn descend(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        if !self.guard.enter() {
            debug!(
                depth = self.guard.depth(),
                "validation depth limit reached; remaining elements treated as valid"
            );
            return true;
        }
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || f(self));
        self.guard.leave();
        result
    }
}

/// Shallow validity (generic element types erased).
pub fn is_valid(db: &dyn TypeDatabase, ty: TypeId, value: &Value) -> bool {
    ValueChecker::new(db, false).check(ty, value)
}

/// Deep validity (container elements checked).
pub fn is_recursively_valid(db: &dyn TypeDatabase, ty: TypeId, value: &Value) -> bool {
    ValueChecker::new(db, true).check(ty, value)
}

// =============================================================================
// Describing values
// =============================================================================

/// Generic runtime type of a container value, e.g. `T::Array[T.any(Integer,
/// String)]`, computed from a bounded sample of its elements. `None` for
/// non-containers.
pub fn describe_container(db: &dyn TypeDatabase, value: &Value) -> Option<String> {
    let rendered = match value {
        Value::Array(items) => db.array(sample_union(db, items.iter())),
        Value::Set(items) => db.set(sample_union(db, items.iter())),
        Value::Enumerator(items) => db.enumerator(sample_union(db, items.iter())),
        Value::Range(bounds) => db.range(sample_union(
            db,
            [&bounds.0, &bounds.1].into_iter().filter(|v| !v.is_nil()),
        )),
        Value::Hash(pairs) => {
            let key = sample_union(db, pairs.iter().map(|(k, _)| k));
            let val = sample_union(db, pairs.iter().map(|(_, v)| v));
            db.hash(key, val)
        }
        _ => return None,
    };
    Some(db.name_of(rendered).to_string())
}

/// Union of the classes of the first few items; `T.untyped` when empty.
fn sample_union<'v>(db: &dyn TypeDatabase, items: impl Iterator<Item = &'v Value>) -> TypeId {
    let classes = db.classes();
    let members: Vec<TypeId> = items
        .take(MAX_DESCRIBE_SAMPLE)
        .map(|v| db.simple(v.class_id(classes)))
        .collect();
    if members.is_empty() {
        TypeId::UNTYPED
    } else {
        db.union(members)
    }
}

/// `type String with value "foo"`.
pub fn describe_value(db: &dyn TypeDatabase, value: &Value, opts: &InspectOptions) -> String {
    let classes = db.classes();
    format!(
        "type {} with value {}",
        classes.name(value.class_id(classes)),
        value.inspect(classes, opts)
    )
}

/// Error text for a value that failed validation against `ty`.
///
/// When the value passes the shallow check (so only an element is wrong) the
/// generic runtime type of the container is shown instead of its contents.
pub fn mismatch_message(
    db: &dyn TypeDatabase,
    ty: TypeId,
    value: &Value,
    opts: &InspectOptions,
) -> String {
    let expected = db.name_of(ty);
    if is_valid(db, ty, value) {
        if let Some(described) = describe_container(db, value) {
            return format!("Expected type {expected}, got {described}");
        }
    }
    format!(
        "Expected type {expected}, got {}",
        describe_value(db, value, opts)
    )
}

#[cfg(test)]
#[path = "tests/validate_tests.rs"]
mod tests;

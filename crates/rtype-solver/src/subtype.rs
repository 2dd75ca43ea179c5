//! Subtype relation.
//!
//! `a <: b` holds when every value of `a` is acceptable wherever `b` is
//! required. The relation is sound but deliberately incomplete: unions and
//! intersections are not normalised, so some relations that hold in theory
//! (e.g. full distributivity) are not derived.
//!
//! ## Rule precedence
//!
//! Composite shapes are decomposed first, in this exact order. Reordering the
//! rules changes the answer for nested union-of-intersection inputs.
//!
//! 1. `a` is a union: every member of `a` must be `<: b`
//!    (so `T.noreturn`, the empty union, is below everything)
//! 2. `b` is an intersection: `a` must be `<:` every member of `b`
//! 3. `b` is a union: `a` must be `<:` some member of `b`; when `a` is an
//!    intersection it is also enough that some member of `a` is `<:` some
//!    member of `b`
//! 4. `a` is an intersection: some member of `a` must be `<: b`
//! 5. both single: sentinel rules, then the shape-specific rule
//!
//! Identity and `T.untyped` on either side short-circuit before rule 1.

use crate::TypeDatabase;
use crate::hierarchy::{ClassId, ClassKind};
use crate::recursion::{DepthGuard, RecursionProfile};
use crate::types::{ProcShape, TypeData, TypeId};
use rtype_common::limits::{STACK_GROW_SIZE, STACK_RED_ZONE};
use tracing::{debug, trace};

/// Stateful checker for one or more subtype queries.
pub struct SubtypeChecker<'a> {
    db: &'a dyn TypeDatabase,
    guard: DepthGuard,
}

impl<'a> SubtypeChecker<'a> {
    pub fn new(db: &'a dyn TypeDatabase) -> Self {
        Self {
            db,
            guard: DepthGuard::with_profile(RecursionProfile::SubtypeCheck),
        }
    }

    /// `true` if the depth limit was hit during any query of this checker.
    pub fn depth_exceeded(&self) -> bool {
        self.guard.is_exceeded()
    }

    pub fn is_subtype(&mut self, a: TypeId, b: TypeId) -> bool {
        if a == b || a == TypeId::UNTYPED || b == TypeId::UNTYPED {
            return true;
        }
        if !self.guard.enter() {
            debug!(
                source = a.0,
                target = b.0,
                "subtype depth limit exceeded; answering false"
            );
            return false;
        }
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.check(a, b));
        self.guard.leave();
        result
    }

    fn check(&mut self, a: TypeId, b: TypeId) -> bool {
        let (Some(source), Some(target)) = (self.db.lookup(a), self.db.lookup(b)) else {
            return false;
        };

        // Rule 1
        if let TypeData::Union(members) = &source {
            return members.iter().all(|&m| self.is_subtype(m, b));
        }
        // Rule 2
        if let TypeData::Intersection(members) = &target {
            return members.iter().all(|&m| self.is_subtype(a, m));
        }
        // Rule 3
        if let TypeData::Union(targets) = &target {
            if targets.iter().any(|&t| self.is_subtype(a, t)) {
                return true;
            }
            if let TypeData::Intersection(sources) = &source {
                return sources
                    .iter()
                    .any(|&s| targets.iter().any(|&t| self.is_subtype(s, t)));
            }
            return false;
        }
        // Rule 4
        if let TypeData::Intersection(sources) = &source {
            return sources.iter().any(|&s| self.is_subtype(s, b));
        }
        // Rule 5
        self.check_single(&source, &target)
    }

    fn check_single(&mut self, source: &TypeData, target: &TypeData) -> bool {
        let db = self.db;
        let classes = db.classes();
        match (source, target) {
            // Sentinels. Identity was handled by the caller, so `Void` here
            // means the other side is not `Void`.
            (TypeData::Void, _) | (_, TypeData::Void) => false,
            (_, TypeData::Unknown) => true,
            (TypeData::Unknown, _) => false,

            // Erased generics.
            (TypeData::TypeParameter(_) | TypeData::TypeVariable(..), _)
            | (_, TypeData::TypeParameter(_) | TypeData::TypeVariable(..)) => true,

            (TypeData::Simple(x), TypeData::Simple(y)) => classes.is_subclass_of(*x, *y),

            (TypeData::Container(k1, e1), TypeData::Container(k2, e2)) => {
                classes.is_subclass_of(k1.underlying_class(), k2.underlying_class())
                    && self.is_subtype(*e1, *e2)
            }
            (TypeData::Hash(k1, v1), TypeData::Hash(k2, v2)) => {
                self.is_subtype(*k1, *k2) && self.is_subtype(*v1, *v2)
            }
            // Hash elements are pairs; against a single-parameter enumerable
            // the element type is erased.
            (TypeData::Hash(..), TypeData::Container(kind, _)) => {
                classes.is_subclass_of(ClassId::HASH, kind.underlying_class())
            }
            (TypeData::Container(kind, _), TypeData::Simple(c)) => {
                classes.is_subclass_of(kind.underlying_class(), *c)
            }
            (TypeData::Hash(..), TypeData::Simple(c)) => {
                classes.is_subclass_of(ClassId::HASH, *c)
            }

            (TypeData::Proc(p1), TypeData::Proc(p2)) => self.check_proc(p1, p2),
            (TypeData::Proc(_), TypeData::Simple(c)) => classes.is_subclass_of(ClassId::PROC, *c),

            (TypeData::ClassOf(x), TypeData::ClassOf(y)) => classes.is_subclass_of(*x, *y),
            (TypeData::ClassOf(x), TypeData::TypedClass(instance)) => {
                classes.kind(*x) == Some(ClassKind::Class)
                    && self.is_subtype(db.simple(*x), *instance)
            }
            (TypeData::ClassOf(x), TypeData::TypedModule(instance)) => {
                self.is_subtype(db.simple(*x), *instance)
            }
            (TypeData::ClassOf(x), TypeData::Simple(c)) => {
                classes.singleton_ancestors(*x).contains(c)
            }
            (
                TypeData::TypedClass(s),
                TypeData::TypedClass(t) | TypeData::TypedModule(t),
            )
            | (TypeData::TypedModule(s), TypeData::TypedModule(t)) => self.is_subtype(*s, *t),
            (TypeData::TypedClass(_), TypeData::Simple(c)) => {
                classes.is_subclass_of(ClassId::CLASS, *c)
            }
            (TypeData::TypedModule(_), TypeData::Simple(c)) => {
                classes.is_subclass_of(ClassId::MODULE, *c)
            }

            // Singleton values relate only to themselves (identity is
            // handled by the caller).
            (TypeData::Singleton(k1), TypeData::Singleton(k2)) => k1 == k2,

            _ => false,
        }
    }

    /// Parameters are contravariant, the return type covariant. A `void`
    /// target return accepts any source return.
    fn check_proc(&mut self, source: &ProcShape, target: &ProcShape) -> bool {
        if source.arity() != target.arity() {
            return false;
        }
        let params_ok = source
            .params
            .iter()
            .zip(target.params.iter())
            .all(|((_, s), (_, t))| self.is_subtype(*t, *s));
        if !params_ok {
            return false;
        }
        target.returns == TypeId::VOID || self.is_subtype(source.returns, target.returns)
    }
}

/// `a <: b`.
pub fn is_subtype_of(db: &dyn TypeDatabase, a: TypeId, b: TypeId) -> bool {
    let mut checker = SubtypeChecker::new(db);
    let result = checker.is_subtype(a, b);
    trace!(target: "rtype::subtype", source = a.0, target_type = b.0, result, "subtype query");
    result
}

/// Mutual subtyping.
pub fn are_equivalent(db: &dyn TypeDatabase, a: TypeId, b: TypeId) -> bool {
    let mut checker = SubtypeChecker::new(db);
    checker.is_subtype(a, b) && checker.is_subtype(b, a)
}

#[cfg(test)]
#[path = "tests/subtype_tests.rs"]
mod tests;

//! Rendering of types as user-facing type expressions.
//!
//! The rendered form is what appears in error messages and what the type
//! expression parser accepts back. Two readability rewrites are applied to
//! unions; they are presentation only and never consulted by the subtype
//! checker:
//!
//! - `T.any(X, NilClass)` renders as `T.nilable(X)`
//! - `T.any(TrueClass, FalseClass)` renders as `T::Boolean`

use crate::TypeDatabase;
use crate::types::{TypeData, TypeId, Variance};
use std::fmt::Write as _;

pub struct TypeFormatter<'a> {
    db: &'a dyn TypeDatabase,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(db: &'a dyn TypeDatabase) -> Self {
        Self { db }
    }

    pub fn format(&self, id: TypeId) -> String {
        let Some(data) = self.db.lookup(id) else {
            return format!("<unknown type {}>", id.0);
        };
        match data {
            TypeData::Untyped => "T.untyped".to_string(),
            TypeData::Unknown => "T.anything".to_string(),
            TypeData::Void => "<VOID>".to_string(),
            TypeData::Simple(class) => self.db.classes().name(class).to_string(),
            TypeData::Union(members) => self.format_union(&members),
            TypeData::Intersection(members) => {
                format!("T.all({})", self.join(members.iter().copied()))
            }
            TypeData::Container(kind, element) => {
                format!("{}[{}]", kind.generic_name(), self.format(element))
            }
            TypeData::Hash(key, value) => {
                format!("T::Hash[{}, {}]", self.format(key), self.format(value))
            }
            TypeData::Proc(shape) => {
                let mut out = String::from("T.proc");
                if let Some(bind) = shape.bind {
                    let _ = write!(out, ".bind({})", self.format(bind));
                }
                if !shape.params.is_empty() {
                    out.push_str(".params(");
                    for (i, (name, ty)) in shape.params.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        let _ = write!(out, "{name}: {}", self.format(*ty));
                    }
                    out.push(')');
                }
                if shape.returns == TypeId::VOID {
                    out.push_str(".void");
                } else {
                    let _ = write!(out, ".returns({})", self.format(shape.returns));
                }
                out
            }
            TypeData::ClassOf(class) => {
                format!("T.class_of({})", self.db.classes().name(class))
            }
            TypeData::TypedClass(inner) => format!("T::Class[{}]", self.format(inner)),
            TypeData::TypedModule(inner) => format!("T::Module[{}]", self.format(inner)),
            TypeData::Singleton(key) => key.label.to_string(),
            TypeData::TypeParameter(name) => format!("T.type_parameter(:{name})"),
            TypeData::TypeVariable(variance, fixed) => match (fixed, variance.symbol()) {
                (Some(fixed), _) => format!("T.type_member(fixed: {})", self.format(fixed)),
                (None, Some(symbol)) => format!("T.type_member({symbol})"),
                (None, None) => {
                    debug_assert_eq!(variance, Variance::Invariant);
                    "T.type_member".to_string()
                }
            },
        }
    }

    fn format_union(&self, members: &[TypeId]) -> String {
        if members.is_empty() {
            return "T.noreturn".to_string();
        }
        let nilable = members.contains(&TypeId::NIL);
        let has_boolean =
            members.contains(&TypeId::TRUE_CLASS) && members.contains(&TypeId::FALSE_CLASS);

        let mut rendered: Vec<String> = Vec::with_capacity(members.len());
        let mut boolean_emitted = false;
        for &member in members {
            if member == TypeId::NIL {
                continue;
            }
            if has_boolean && (member == TypeId::TRUE_CLASS || member == TypeId::FALSE_CLASS) {
                if !boolean_emitted {
                    rendered.push("T::Boolean".to_string());
                    boolean_emitted = true;
                }
                continue;
            }
            rendered.push(self.format(member));
        }

        let inner = match rendered.len() {
            // `T.any(NilClass)` never survives construction, but a bare
            // NilClass member list renders faithfully anyway.
            0 => return "NilClass".to_string(),
            1 => rendered.pop().unwrap_or_default(),
            _ => format!("T.any({})", rendered.join(", ")),
        };
        if nilable {
            format!("T.nilable({inner})")
        } else {
            inner
        }
    }

    fn join(&self, members: impl Iterator<Item = TypeId>) -> String {
        members
            .map(|m| self.format(m))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
#[path = "tests/format_tests.rs"]
mod tests;

//! Dynamic value model.
//!
//! Validation operates on [`Value`]s: the values a dynamically typed program
//! passes around. Scalars are stored inline, containers are reference counted
//! so that passing arguments through a validated call never deep-copies, and
//! objects/procs have identity (two objects are equal only if they are the same
//! object).

use crate::hierarchy::{ClassId, ClassTable};
use rtype_common::limits::{MAX_INSPECT_DEPTH, MAX_INSPECT_ELEMENTS, MAX_INSPECT_LENGTH};
use serde::Deserialize;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for object and proc identities.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

fn next_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

// =============================================================================
// Value
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(Arc<str>),
    Symbol(Arc<str>),
    Array(Arc<Vec<Value>>),
    /// Insertion-ordered key/value pairs.
    Hash(Arc<Vec<(Value, Value)>>),
    Set(Arc<Vec<Value>>),
    /// `begin..end`; either end may be `Nil` (beginless/endless).
    Range(Arc<(Value, Value)>),
    /// A materialised enumerator over the given elements.
    Enumerator(Arc<Vec<Value>>),
    Proc(ProcRef),
    /// A class or module object.
    Class(ClassId),
    Object(ObjectRef),
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn symbol(s: impl Into<Arc<str>>) -> Self {
        Value::Symbol(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Arc::new(items.into_iter().collect()))
    }

    pub fn hash(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Hash(Arc::new(pairs.into_iter().collect()))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Value::Set(Arc::new(unique))
    }

    pub fn range(begin: Value, end: Value) -> Self {
        Value::Range(Arc::new((begin, end)))
    }

    pub fn enumerator(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Enumerator(Arc::new(items.into_iter().collect()))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The class of this value (`nil.class == NilClass`, ...).
    ///
    /// Class and module objects report `Class` / `Module` according to the
    /// table; unknown ids fall back to `Class`.
    pub fn class_id(&self, classes: &ClassTable) -> ClassId {
        match self {
            Value::Nil => ClassId::NIL_CLASS,
            Value::Bool(true) => ClassId::TRUE_CLASS,
            Value::Bool(false) => ClassId::FALSE_CLASS,
            Value::Integer(_) => ClassId::INTEGER,
            Value::Float(_) => ClassId::FLOAT,
            Value::String(_) => ClassId::STRING,
            Value::Symbol(_) => ClassId::SYMBOL,
            Value::Array(_) => ClassId::ARRAY,
            Value::Hash(_) => ClassId::HASH,
            Value::Set(_) => ClassId::SET,
            Value::Range(_) => ClassId::RANGE,
            Value::Enumerator(_) => ClassId::ENUMERATOR,
            Value::Proc(_) => ClassId::PROC,
            Value::Class(id) => match classes.kind(*id) {
                Some(crate::hierarchy::ClassKind::Module) => ClassId::MODULE,
                _ => ClassId::CLASS,
            },
            Value::Object(obj) => obj.class(),
        }
    }

    /// `value.is_a?(ancestor)`.
    pub fn is_a(&self, ancestor: ClassId, classes: &ClassTable) -> bool {
        if let Value::Class(id) = self {
            if classes.singleton_ancestors(*id).contains(&ancestor) {
                return true;
            }
        }
        classes.is_subclass_of(self.class_id(classes), ancestor)
    }

    /// Elements of an enumerable container (hash pairs are not included).
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::Set(items) | Value::Enumerator(items) => {
                Some(items.as_slice())
            }
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // JSON
    // -------------------------------------------------------------------------

    /// Convert a JSON document into a value: objects become string-keyed
    /// hashes, integral numbers become `Integer`, other numbers `Float`.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from_json)),
            serde_json::Value::Object(map) => Value::hash(
                map.iter()
                    .map(|(k, v)| (Value::string(k.as_str()), Value::from_json(v))),
            ),
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Ruby-style `inspect`, bounded by `opts` so that rendering a value into
    /// an error message never explodes.
    ///
    /// Rendering stops as soon as `max_length` characters have been written,
    /// so the cost is bounded by the options rather than by the value.
    pub fn inspect(&self, classes: &ClassTable, opts: &InspectOptions) -> String {
        let mut out = Bounded::new(opts.max_length);
        self.write_inspect(&mut out, classes, opts, 0);
        out.finish()
    }

    fn write_inspect(&self, out: &mut Bounded, classes: &ClassTable, opts: &InspectOptions, depth: u32) {
        if out.is_full() {
            return;
        }
        match self {
            Value::Nil => out.push_str("nil"),
            Value::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Value::Integer(i) => {
                let _ = write!(out, "{i}");
            }
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    let _ = write!(out, "{f:.1}");
                } else {
                    let _ = write!(out, "{f}");
                }
            }
            Value::String(s) => write_quoted(out, s),
            Value::Symbol(s) => {
                let _ = write!(out, ":{s}");
            }
            Value::Array(items) => write_seq(out, "[", "]", items, classes, opts, depth),
            Value::Enumerator(items) => {
                out.push_str("#<Enumerator: ");
                write_seq(out, "[", "]", items, classes, opts, depth);
                out.push('>');
            }
            Value::Set(items) => {
                out.push_str("#<Set: ");
                write_seq(out, "{", "}", items, classes, opts, depth);
                out.push('>');
            }
            Value::Hash(pairs) => {
                if depth >= opts.max_depth {
                    out.push_str("{...}");
                    return;
                }
                out.push('{');
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if out.is_full() {
                        return;
                    }
                    if i >= opts.max_elements {
                        out.push_str(", ...");
                        break;
                    }
                    if i > 0 {
                        out.push_str(", ");
                    }
                    k.write_inspect(out, classes, opts, depth + 1);
                    out.push_str(" => ");
                    v.write_inspect(out, classes, opts, depth + 1);
                }
                out.push('}');
            }
            Value::Range(bounds) => {
                if !bounds.0.is_nil() {
                    bounds.0.write_inspect(out, classes, opts, depth + 1);
                }
                out.push_str("..");
                if !bounds.1.is_nil() {
                    bounds.1.write_inspect(out, classes, opts, depth + 1);
                }
            }
            Value::Proc(p) => {
                let _ = write!(out, "#<Proc:{:#x} (arity {})>", p.id(), p.arity());
            }
            Value::Class(id) => out.push_str(&classes.name(*id)),
            Value::Object(obj) => match obj.label() {
                Some(label) => {
                    let _ = write!(out, "#<{label}>");
                }
                None => {
                    let _ = write!(out, "#<{}:{:#x}>", classes.name(obj.class()), obj.id());
                }
            },
        }
    }
}

fn write_seq(
    out: &mut Bounded,
    open: &str,
    close: &str,
    items: &[Value],
    classes: &ClassTable,
    opts: &InspectOptions,
    depth: u32,
) {
    if depth >= opts.max_depth {
        let _ = write!(out, "{open}...{close}");
        return;
    }
    out.push_str(open);
    for (i, item) in items.iter().enumerate() {
        if out.is_full() {
            return;
        }
        if i >= opts.max_elements {
            out.push_str(", ...");
            break;
        }
        if i > 0 {
            out.push_str(", ");
        }
        item.write_inspect(out, classes, opts, depth + 1);
    }
    out.push_str(close);
}

/// Double-quoted with the same escapes as `{:?}`, one character at a time so
/// a long string stops escaping once the buffer is full.
fn write_quoted(out: &mut Bounded, s: &str) {
    out.push('"');
    for c in s.chars() {
        if out.is_full() {
            return;
        }
        match c {
            '\'' => out.push(c),
            _ => c.escape_debug().for_each(|e| out.push(e)),
        }
    }
    out.push('"');
}

/// Inspect buffer holding at most `limit` characters. Anything written past
/// the limit is dropped and the result gets a `...` suffix.
struct Bounded {
    buf: String,
    len: usize,
    limit: usize,
    overflowed: bool,
}

impl Bounded {
    fn new(limit: usize) -> Self {
        Self {
            buf: String::new(),
            len: 0,
            limit,
            overflowed: false,
        }
    }

    fn is_full(&self) -> bool {
        self.overflowed
    }

    fn push(&mut self, c: char) {
        if self.len >= self.limit {
            self.overflowed = true;
            return;
        }
        self.buf.push(c);
        self.len += 1;
    }

    fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            if self.overflowed {
                return;
            }
            self.push(c);
        }
    }

    fn finish(mut self) -> String {
        if self.overflowed {
            self.buf.push_str("...");
        }
        self.buf
    }
}

impl fmt::Write for Bounded {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        if self.overflowed { Err(fmt::Error) } else { Ok(()) }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<ClassId> for Value {
    fn from(id: ClassId) -> Self {
        Value::Class(id)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

/// Caps applied by [`Value::inspect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InspectOptions {
    pub max_length: usize,
    pub max_depth: u32,
    pub max_elements: usize,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            max_length: MAX_INSPECT_LENGTH,
            max_depth: MAX_INSPECT_DEPTH,
            max_elements: MAX_INSPECT_ELEMENTS,
        }
    }
}

// =============================================================================
// Objects and procs
// =============================================================================

#[derive(Debug)]
struct ObjectData {
    id: u64,
    class: ClassId,
    label: Option<Arc<str>>,
}

/// An instance of a user class. Equality is identity.
#[derive(Clone, Debug)]
pub struct ObjectRef(Arc<ObjectData>);

impl ObjectRef {
    /// Allocate a fresh object. Prefer the runtime's instantiation entry point,
    /// which enforces abstract-class rules.
    pub fn new(class: ClassId) -> Self {
        Self(Arc::new(ObjectData {
            id: next_object_id(),
            class,
            label: None,
        }))
    }

    /// Allocate a labelled singleton (an enum member such as `Suit::Spades`).
    pub fn labelled(class: ClassId, label: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(ObjectData {
            id: next_object_id(),
            class,
            label: Some(label.into()),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn class(&self) -> ClassId {
        self.0.class
    }

    pub fn label(&self) -> Option<&str> {
        self.0.label.as_deref()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ObjectRef {}

/// A block/lambda value. Only its identity and arity are observable here.
#[derive(Clone, Debug)]
pub struct ProcRef {
    id: u64,
    arity: usize,
}

impl ProcRef {
    pub fn new(arity: usize) -> Self {
        Self {
            id: next_object_id(),
            arity,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl PartialEq for ProcRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
#[path = "tests/value_tests.rs"]
mod tests;

//! Method definitions and call arguments.

use crate::error::CallError;
use crate::signature::ParamKind;
use indexmap::IndexMap;
use rtype_common::SourceLocation;
use rtype_solver::Value;
use std::fmt;
use std::sync::Arc;

/// The callable stored in the method table: `(receiver, args) -> result`.
pub type MethodBody = Arc<dyn Fn(&Value, &Args) -> Result<Value, CallError> + Send + Sync>;

/// A parameter as written in the method definition (no type).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodParam {
    pub name: Arc<str>,
    pub kind: ParamKind,
}

impl MethodParam {
    pub fn new(name: impl Into<Arc<str>>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn req(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ParamKind::Required)
    }

    pub fn opt(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ParamKind::Optional)
    }

    pub fn rest(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ParamKind::Rest)
    }

    pub fn key(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ParamKind::KeyRequired)
    }

    pub fn key_opt(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ParamKind::KeyOptional)
    }

    pub fn key_rest(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ParamKind::KeyRest)
    }

    pub fn block(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ParamKind::Block)
    }
}

/// `public`, `protected` or `private`, ordered from most to least visible.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        })
    }
}

/// A method definition: name, parameter list, body and location.
#[derive(Clone)]
pub struct MethodDef {
    pub name: Arc<str>,
    pub params: Vec<MethodParam>,
    pub body: MethodBody,
    pub location: SourceLocation,
    pub visibility: Visibility,
}

impl MethodDef {
    pub fn new(
        name: impl Into<Arc<str>>,
        params: Vec<MethodParam>,
        location: SourceLocation,
        body: impl Fn(&Value, &Args) -> Result<Value, CallError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            body: Arc::new(body),
            location,
            visibility: Visibility::Public,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// `private def ...`
    pub fn private(self) -> Self {
        self.with_visibility(Visibility::Private)
    }

    /// `protected def ...`
    pub fn protected(self) -> Self {
        self.with_visibility(Visibility::Protected)
    }

    /// A method whose body is never meant to run (abstract declarations).
    pub fn stub(
        name: impl Into<Arc<str>>,
        params: Vec<MethodParam>,
        location: SourceLocation,
    ) -> Self {
        Self::new(name, params, location, |_, _| Ok(Value::Nil))
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("location", &self.location)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

/// Arguments of one call, in the shape the caller wrote them.
#[derive(Clone, Debug, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: IndexMap<Arc<str>, Value>,
    pub block: Option<Value>,
    pub caller: SourceLocation,
}

impl Args {
    pub fn new(caller: SourceLocation) -> Self {
        Self {
            caller,
            ..Self::default()
        }
    }

    /// Positional arguments only.
    pub fn positional(caller: SourceLocation, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            ..Self::new(caller)
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    pub fn with_block(mut self, block: Value) -> Self {
        self.block = Some(block);
        self
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }
}

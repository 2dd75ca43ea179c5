//! The `sig` declaration builder.
//!
//! ```ignore
//! SigBuilder::new(loc)
//!     .override_()?
//!     .params([("x", "Integer"), ("blk", "T.proc.returns(String)")])?
//!     .returns("String")?
//! ```
//!
//! Every combinator consumes the builder and fails immediately on misuse, so a
//! bad declaration is reported at its own location rather than when the
//! method is called. Types are kept raw until the method the declaration
//! annotates is known ([`Declaration::build`]).

use crate::error::{DeclarationError, SigBuildError};
use crate::method::{MethodDef, MethodParam};
use crate::signature::{
    AllowIncompatible, CheckedLevel, FailurePolicy, Mode, ParamDescriptor, ParamKind, Signature,
};
use indexmap::IndexMap;
use rtype_common::SourceLocation;
use rtype_solver::{ClassId, RawType, TypeDatabase, TypeId, coerce};
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Returns {
    Undeclared,
    Void,
    Type(RawType),
}

/// Accumulates one `sig`.
#[derive(Clone, Debug)]
pub struct SigBuilder {
    location: SourceLocation,
    mode: Mode,
    allow_incompatible: AllowIncompatible,
    params: Option<IndexMap<Arc<str>, RawType>>,
    returns: Returns,
    bind: Option<RawType>,
    checked: Option<CheckedLevel>,
    on_failure: Option<FailurePolicy>,
    type_parameters: Option<Vec<Arc<str>>>,
    generated: bool,
    is_final: bool,
}

impl SigBuilder {
    pub fn new(location: SourceLocation) -> Self {
        Self {
            location,
            mode: Mode::Standard,
            allow_incompatible: AllowIncompatible::No,
            params: None,
            returns: Returns::Undeclared,
            bind: None,
            checked: None,
            on_failure: None,
            type_parameters: None,
            generated: false,
            is_final: false,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    fn fail(&self, message: &str) -> DeclarationError {
        DeclarationError::new(message, self.location.clone())
    }

    // -------------------------------------------------------------------------
    // Modes
    // -------------------------------------------------------------------------

    pub fn abstract_(mut self) -> Result<Self, DeclarationError> {
        match self.mode {
            Mode::Standard => self.mode = Mode::Abstract,
            Mode::Abstract => {
                return Err(self.fail(".abstract cannot be repeated in a single signature"));
            }
            _ => {
                return Err(self.fail(
                    "`.abstract` cannot be combined with `.override`, `.overridable` or `.implementation`",
                ));
            }
        }
        Ok(self)
    }

    pub fn overridable(mut self) -> Result<Self, DeclarationError> {
        self.mode = match self.mode {
            Mode::Standard => Mode::Overridable,
            Mode::Override => Mode::OverridableOverride,
            Mode::Implementation => Mode::OverridableImplementation,
            Mode::Abstract => {
                return Err(self.fail("`.overridable` cannot be combined with `.abstract`"));
            }
            Mode::Overridable | Mode::OverridableOverride | Mode::OverridableImplementation => {
                return Err(self.fail(".overridable cannot be repeated in a single signature"));
            }
        };
        Ok(self)
    }

    pub fn override_(self) -> Result<Self, DeclarationError> {
        self.override_with(AllowIncompatible::No)
    }

    /// `.override(allow_incompatible: true)`: skip shape, variance and
    /// visibility checks against the overridden method.
    pub fn override_allow_incompatible(self) -> Result<Self, DeclarationError> {
        self.override_with(AllowIncompatible::All)
    }

    /// `.override(allow_incompatible: :visibility)`
    pub fn override_allow_incompatible_visibility(self) -> Result<Self, DeclarationError> {
        self.override_with(AllowIncompatible::Visibility)
    }

    fn override_with(mut self, allow_incompatible: AllowIncompatible) -> Result<Self, DeclarationError> {
        self.mode = match self.mode {
            Mode::Standard => Mode::Override,
            Mode::Overridable => Mode::OverridableOverride,
            Mode::Override | Mode::OverridableOverride => {
                return Err(self.fail(".override cannot be repeated in a single signature"));
            }
            Mode::Implementation | Mode::OverridableImplementation => {
                return Err(self.fail("`.implementation` cannot be combined with `.override`"));
            }
            Mode::Abstract => {
                return Err(self.fail("`.override` cannot be combined with `.abstract`"));
            }
        };
        self.allow_incompatible = allow_incompatible;
        Ok(self)
    }

    pub fn implementation(mut self) -> Result<Self, DeclarationError> {
        self.mode = match self.mode {
            Mode::Standard => Mode::Implementation,
            Mode::Overridable => Mode::OverridableImplementation,
            Mode::Abstract => {
                return Err(self.fail("`.implementation` cannot be combined with `.abstract`"));
            }
            Mode::Override | Mode::OverridableOverride => {
                return Err(self.fail("`.implementation` cannot be combined with `.override`"));
            }
            Mode::Implementation | Mode::OverridableImplementation => {
                return Err(self.fail(".implementation cannot be repeated in a single signature"));
            }
        };
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    /// Failures of generated signatures are logged instead of raised.
    pub fn generated(mut self) -> Result<Self, DeclarationError> {
        if self.generated {
            return Err(self.fail("You can't call .generated multiple times in a signature."));
        }
        self.generated = true;
        Ok(self)
    }

    /// The method cannot be overridden or redefined.
    pub fn final_(mut self) -> Result<Self, DeclarationError> {
        if self.is_final {
            return Err(self.fail("You can't call .final multiple times in a signature."));
        }
        self.is_final = true;
        Ok(self)
    }

    pub fn checked(mut self, level: CheckedLevel) -> Result<Self, DeclarationError> {
        if self.checked.is_some() {
            return Err(self.fail("You can't call .checked multiple times in a signature."));
        }
        if level == CheckedLevel::Never && self.on_failure.is_some() {
            return Err(self.fail(
                "You can't use .checked(:never) with .on_failure because .on_failure will have no effect.",
            ));
        }
        self.checked = Some(level);
        Ok(self)
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Result<Self, DeclarationError> {
        if self.on_failure.is_some() {
            return Err(self.fail("You can't call .on_failure multiple times in a signature."));
        }
        if self.checked == Some(CheckedLevel::Never) {
            return Err(self.fail(
                "You can't use .on_failure with .checked(:never) because .on_failure will have no effect.",
            ));
        }
        self.on_failure = Some(policy);
        Ok(self)
    }

    pub fn type_parameters(
        mut self,
        names: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) -> Result<Self, DeclarationError> {
        if self.type_parameters.is_some() {
            return Err(self.fail("You can't call .type_parameters multiple times in a signature."));
        }
        self.type_parameters = Some(names.into_iter().map(Into::into).collect());
        Ok(self)
    }

    /// Type of `self` inside the method.
    pub fn bind(mut self, ty: impl Into<RawType>) -> Result<Self, DeclarationError> {
        if self.bind.is_some() {
            return Err(self.fail("You can't call .bind multiple times in a signature."));
        }
        self.bind = Some(ty.into());
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Params and return
    // -------------------------------------------------------------------------

    /// Declare parameter types by name. A repeated name keeps its first
    /// position and its last type.
    pub fn params<N, T>(
        mut self,
        params: impl IntoIterator<Item = (N, T)>,
    ) -> Result<Self, DeclarationError>
    where
        N: Into<Arc<str>>,
        T: Into<RawType>,
    {
        if self.params.is_some() {
            return Err(self.fail("You can't call .params twice"));
        }
        if !matches!(self.returns, Returns::Undeclared) {
            return Err(self.fail("You must declare .params before .returns"));
        }
        let declared: IndexMap<Arc<str>, RawType> = params
            .into_iter()
            .map(|(name, ty)| (name.into(), ty.into()))
            .collect();
        if declared.is_empty() {
            return Err(self.fail(
                "'params' was called without any arguments. Either declare the parameters or drop the call to .params.",
            ));
        }
        self.params = Some(declared);
        Ok(self)
    }

    pub fn returns(mut self, ty: impl Into<RawType>) -> Result<Self, DeclarationError> {
        match self.returns {
            Returns::Undeclared => {}
            Returns::Void => return Err(self.fail("You can't call .returns after calling .void.")),
            Returns::Type(_) => {
                return Err(self.fail("You can't call .returns multiple times in a signature."));
            }
        }
        self.returns = Returns::Type(ty.into());
        Ok(self)
    }

    pub fn void(mut self) -> Result<Self, DeclarationError> {
        if !matches!(self.returns, Returns::Undeclared) {
            return Err(self.fail("You can't call .void after calling .returns."));
        }
        self.returns = Returns::Void;
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Finalize
    // -------------------------------------------------------------------------

    /// Close the declaration. `default_checked` applies when `.checked` was
    /// not called.
    pub fn finalize(self, default_checked: CheckedLevel) -> Result<Declaration, DeclarationError> {
        if matches!(self.returns, Returns::Undeclared) && self.mode != Mode::Abstract {
            return Err(self.fail(
                "You must provide a return type; use the `.returns` or `.void` builder methods.",
            ));
        }
        let checked = match self.checked {
            Some(level) => level,
            None if self.on_failure.is_some() && default_checked == CheckedLevel::Never => {
                return Err(self.fail(
                    "To use .on_failure you must additionally call .checked(:tests) or .checked(:always), otherwise, the .on_failure has no effect.",
                ));
            }
            None => default_checked,
        };
        let returns = match self.returns {
            Returns::Type(ty) => Some(ty),
            Returns::Void | Returns::Undeclared => None,
        };
        Ok(Declaration {
            location: self.location,
            mode: self.mode,
            allow_incompatible: self.allow_incompatible,
            params: self.params.unwrap_or_default(),
            returns,
            bind: self.bind,
            checked,
            on_failure: self.on_failure.unwrap_or_default(),
            type_parameters: self.type_parameters.unwrap_or_default(),
            generated: self.generated,
            is_final: self.is_final,
        })
    }
}

/// Anything a method definition accepts as its pending `sig`: a builder, or
/// the result of a builder chain (so `?` can be left to the definition).
pub trait IntoDeclaration {
    fn into_builder(self) -> Result<SigBuilder, DeclarationError>;
}

impl IntoDeclaration for SigBuilder {
    fn into_builder(self) -> Result<SigBuilder, DeclarationError> {
        Ok(self)
    }
}

impl IntoDeclaration for Result<SigBuilder, DeclarationError> {
    fn into_builder(self) -> Result<SigBuilder, DeclarationError> {
        self
    }
}

// =============================================================================
// Declaration
// =============================================================================

/// A finalized `sig` whose types are not yet resolved.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub location: SourceLocation,
    pub mode: Mode,
    pub allow_incompatible: AllowIncompatible,
    pub params: IndexMap<Arc<str>, RawType>,
    /// `None` for `.void`.
    pub returns: Option<RawType>,
    pub bind: Option<RawType>,
    pub checked: CheckedLevel,
    pub on_failure: FailurePolicy,
    pub type_parameters: Vec<Arc<str>>,
    pub generated: bool,
    pub is_final: bool,
}

impl Declaration {
    /// Match the declaration against the method it annotates and resolve
    /// every type.
    pub fn build(
        self,
        db: &dyn TypeDatabase,
        owner: ClassId,
        method: &MethodDef,
    ) -> Result<Signature, SigBuildError> {
        let owner_name = db.classes().name(owner);
        let describe = || format!("{}#{} at {}", owner_name, method.name, method.location);
        check_param_names(&self.params, &method.params, &method.name, &describe)?;

        let mut seen_optional = false;
        let mut params = Vec::with_capacity(method.params.len());
        for param in &method.params {
            match param.kind {
                ParamKind::Optional => seen_optional = true,
                ParamKind::Required if seen_optional => {
                    return Err(SigBuildError::RequiredAfterOptional { method: describe() });
                }
                _ => {}
            }
            let raw = self.params.get(&param.name).cloned().unwrap_or(RawType::Type(TypeId::UNTYPED));
            let ty = resolve(db, raw, &method.name, &param.name)?;
            params.push(ParamDescriptor {
                name: param.name.clone(),
                kind: param.kind,
                ty,
            });
        }

        let returns = match self.returns {
            Some(raw) => resolve(db, raw, &method.name, "<return>")?,
            None => TypeId::VOID,
        };
        let bind = self
            .bind
            .map(|raw| resolve(db, raw, &method.name, "<bind>"))
            .transpose()?;

        Ok(Signature::new(
            owner,
            owner_name.clone(),
            method.name.clone(),
            params,
            returns,
            bind,
            self.mode,
            self.checked,
            self.on_failure,
            self.location,
            self.generated,
            self.is_final,
            self.allow_incompatible,
            self.type_parameters,
        ))
    }
}

fn check_param_names(
    declared: &IndexMap<Arc<str>, RawType>,
    defined: &[MethodParam],
    method: &Arc<str>,
    describe: &dyn Fn() -> String,
) -> Result<(), SigBuildError> {
    let missing: Vec<Arc<str>> = defined
        .iter()
        .filter(|p| !declared.contains_key(&p.name))
        .map(|p| p.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(SigBuildError::MissingParams {
            method: method.clone(),
            names: missing,
        });
    }
    let extra: Vec<Arc<str>> = declared
        .keys()
        .filter(|name| !defined.iter().any(|p| &p.name == *name))
        .cloned()
        .collect();
    if !extra.is_empty() {
        return Err(SigBuildError::ExtraParams {
            method: method.clone(),
            names: extra,
        });
    }
    // Same name sets from here on; only the order can differ.
    for (index, (name, param)) in declared.keys().zip(defined).enumerate() {
        if *name != param.name {
            let defined_at = defined
                .iter()
                .position(|p| p.name == *name)
                .unwrap_or(index);
            return Err(SigBuildError::OutOfOrder {
                name: name.clone(),
                declared: index + 1,
                defined: defined_at + 1,
                method: describe(),
            });
        }
    }
    Ok(())
}

fn resolve(
    db: &dyn TypeDatabase,
    raw: RawType,
    method: &Arc<str>,
    name: &str,
) -> Result<TypeId, SigBuildError> {
    coerce(db, raw).map_err(|source| SigBuildError::InvalidType {
        method: method.clone(),
        name: name.into(),
        source,
    })
}

#[cfg(test)]
#[path = "tests/builder_tests.rs"]
mod tests;

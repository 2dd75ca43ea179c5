//! Inheritance contracts between a method and the method it overrides.
//!
//! Checked once, when the overriding method is installed. The rules run in
//! this order and the first violation wins:
//!
//! 1. no ancestor method: `.override` / `.implementation` are errors
//! 2. ancestor without a signature: nothing is checked
//! 3. ancestor declared `.final`: error
//! 4. abstract ancestor: the child must be `.implementation` (or abstract)
//! 5. `.override` child: the ancestor must be overridable
//! 6. `.implementation` child: the ancestor must be abstract
//! 7. plain or abstract child: the ancestor must be a plain method
//! 8. explicit `.override`/`.implementation` child: at least as visible as
//!    the ancestor
//! 9. parameter shape (see [`crate::shape`])
//! 10. parameter/return type variance, when both signatures are checked
//!
//! Rule 8 is skipped for any `allow_incompatible`, rules 9 and 10 only for
//! `.override(allow_incompatible: true)`.

use crate::config::TestMode;
use crate::error::{ContractError, ContractKind};
use crate::method::Visibility;
use crate::shape::{check_shape, relation};
use crate::signature::{CheckedLevel, Mode, ParamDescriptor, ParamKind, Signature};
use rtype_common::SourceLocation;
use rtype_solver::{TypeDatabase, TypeId, is_subtype_of};
use tracing::debug;

/// A signed method together with where it lives.
#[derive(Clone, Copy, Debug)]
pub struct MethodSite<'a> {
    pub owner: &'a str,
    /// Location of the method definition.
    pub location: &'a SourceLocation,
    pub signature: &'a Signature,
    pub visibility: Visibility,
}

impl MethodSite<'_> {
    /// `Owner at file:line`.
    pub fn loc_str(&self) -> String {
        format!("{} at {}", self.owner, self.location)
    }
}

/// The nearest same-named method found in the ancestor chain.
#[derive(Clone, Copy, Debug)]
pub enum Ancestor<'a> {
    None,
    Unsigned,
    Signed(MethodSite<'a>),
}

/// Validate a signed method against its nearest ancestor method.
///
/// `test_mode` decides whether `.checked(:tests)` signatures take part in the
/// variance check.
pub fn check_override(
    db: &dyn TypeDatabase,
    test_mode: &TestMode,
    child: &MethodSite<'_>,
    ancestor: Ancestor<'_>,
) -> Result<(), ContractError> {
    let base = match ancestor {
        Ancestor::None => return check_without_parent(child),
        Ancestor::Unsigned => {
            debug!(method = %child.signature.method_name, "overridden method has no signature");
            return Ok(());
        }
        Ancestor::Signed(base) => base,
    };
    if base.signature.is_final {
        return Err(final_override(
            &child.signature.method_name,
            &base,
            child.owner,
            child.location,
        ));
    }
    check_mode(child, &base)?;
    check_visibility(child, &base)?;
    if child.signature.allow_incompatible.signature() {
        return Ok(());
    }
    check_shape(child, &base)?;
    if !is_checked(child.signature, test_mode) || !is_checked(base.signature, test_mode) {
        debug!(method = %child.signature.method_name, "variance skipped for an unchecked signature");
        return Ok(());
    }
    check_variance(db, child, &base)
}

/// `always`, or `tests` while test mode is on. Only reads the test-mode flag
/// (which locks it) for `tests` signatures.
fn is_checked(signature: &Signature, test_mode: &TestMode) -> bool {
    match signature.checked {
        CheckedLevel::Always => true,
        CheckedLevel::Tests => test_mode.check_tests(),
        CheckedLevel::Never => false,
    }
}

fn check_without_parent(child: &MethodSite<'_>) -> Result<(), ContractError> {
    let sig = child.signature;
    let method = &sig.method_name;
    let mode = sig.mode.pretty();
    let here = child.loc_str();
    if sig.mode.is_override() {
        return Err(ContractError::new(
            ContractKind::MissingParent,
            format!(
                "You marked `{method}` as {mode}, but that method doesn't already exist in this class/module to be overridden.\n  \
                 Either check for typos and for missing includes or super classes to make the parent method shows up\n  \
                 ... or remove {mode} here: {here}\n"
            ),
        ));
    }
    if sig.mode.is_implementation() {
        return Err(ContractError::new(
            ContractKind::MissingParent,
            format!(
                "You marked `{method}` as {mode}, but it doesn't match up with a corresponding abstract method.\n  \
                 Either check for typos and for missing includes or super classes to make the parent method shows up\n  \
                 ... or remove {mode} here: {here}\n"
            ),
        ));
    }
    Ok(())
}

fn check_mode(child: &MethodSite<'_>, base: &MethodSite<'_>) -> Result<(), ContractError> {
    let child_mode = child.signature.mode;
    let base_mode = base.signature.mode;
    let method = &child.signature.method_name;
    let fail = |message: String| Err(ContractError::new(ContractKind::Mode, message));

    if base_mode == Mode::Abstract && !child_mode.is_implementation() && child_mode != Mode::Abstract {
        return fail(format!(
            "You must use `.implementation` when overriding the abstract method `{method}`.\n  \
             Abstract definition: {}\n  \
             Implementation definition: {}\n",
            base.loc_str(),
            child.loc_str()
        ));
    }
    if child_mode.is_override() && !base_mode.permits_override() {
        return fail(format!(
            "You declared `{method}` as {}, but the method it overrides is not declared as `overridable`.\n  \
             Parent definition: {}\n  \
             Child definition:  {}\n",
            child_mode.pretty(),
            base.loc_str(),
            child.loc_str()
        ));
    }
    if child_mode.is_implementation() && base_mode != Mode::Abstract {
        return fail(format!(
            "You declared `{method}` as {}, but the method it overrides is not declared as abstract.\n  \
             Either mark {method} as `abstract.` in the parent: {}\n  \
             ... or mark {method} as `override.` in the child: {}\n",
            child_mode.pretty(),
            base.loc_str(),
            child.loc_str()
        ));
    }
    let plain_child = match child_mode {
        Mode::Standard | Mode::Overridable => true,
        Mode::Abstract => base_mode != Mode::Abstract,
        _ => false,
    };
    if plain_child && base_mode != Mode::Standard {
        return fail(format!(
            "You must use `.override` when overriding the existing method `{method}`.\n  \
             Parent definition: {}\n  \
             Child definition:  {}\n",
            base.loc_str(),
            child.loc_str()
        ));
    }
    Ok(())
}

/// Only explicit `.override`/`.implementation` children are held to their
/// ancestor's visibility.
fn check_visibility(child: &MethodSite<'_>, base: &MethodSite<'_>) -> Result<(), ContractError> {
    let mode = child.signature.mode;
    if !(mode.is_override() || mode.is_implementation())
        || child.signature.allow_incompatible.visibility()
        || child.visibility <= base.visibility
    {
        return Ok(());
    }
    let (_, noun) = relation(base);
    Err(ContractError::new(
        ContractKind::Visibility,
        format!(
            "Incompatible visibility for {} of method {}\n\
             * Base: {} (in {})\n\
             * {noun}: {} (in {})\n\
             (The override must be at least as permissive as the base.)",
            noun.to_ascii_lowercase(),
            child.signature.method_name,
            base.visibility,
            base.loc_str(),
            child.visibility,
            child.loc_str()
        ),
    ))
}

/// Parameters are contravariant, the return type covariant. A `void` base
/// return accepts any override return.
fn check_variance(
    db: &dyn TypeDatabase,
    child: &MethodSite<'_>,
    base: &MethodSite<'_>,
) -> Result<(), ContractError> {
    let sig = child.signature;
    let super_sig = base.signature;
    let (_, noun) = relation(base);
    let noun_lower = noun.to_ascii_lowercase();
    let method = &sig.method_name;
    let sites = |base_ty: TypeId, child_ty: TypeId| {
        format!(
            "* Base: `{}` (in {})\n* {noun}: `{}` (in {})",
            db.name_of(base_ty),
            base.loc_str(),
            db.name_of(child_ty),
            child.loc_str()
        )
    };

    let named = |p: &&ParamDescriptor| matches!(p.kind, ParamKind::Required | ParamKind::Optional);
    for (index, (super_param, param)) in super_sig
        .params
        .iter()
        .filter(named)
        .zip(sig.params.iter().filter(named))
        .enumerate()
    {
        if !is_subtype_of(db, super_param.ty, param.ty) {
            return Err(ContractError::new(
                ContractKind::Variance,
                format!(
                    "Incompatible type for arg #{} (`{}`) in {noun_lower} of method `{method}`:\n{}\n(The types must be contravariant.)",
                    index + 1,
                    param.name,
                    sites(super_param.ty, param.ty)
                ),
            ));
        }
    }

    let keyrest = sig.params.iter().find(|p| p.kind == ParamKind::KeyRest);
    for super_param in super_sig
        .params
        .iter()
        .filter(|p| matches!(p.kind, ParamKind::KeyRequired | ParamKind::KeyOptional))
    {
        let own = sig
            .params
            .iter()
            .find(|p| p.kind.is_keyword() && p.kind != ParamKind::KeyRest && p.name == super_param.name)
            .or(keyrest);
        let Some(param) = own else {
            continue;
        };
        if !is_subtype_of(db, super_param.ty, param.ty) {
            return Err(ContractError::new(
                ContractKind::Variance,
                format!(
                    "Incompatible type for arg `{}` in {noun_lower} of method `{method}`:\n{}\n(The types must be contravariant.)",
                    super_param.name,
                    sites(super_param.ty, param.ty)
                ),
            ));
        }
    }

    if super_sig.returns != TypeId::VOID && !is_subtype_of(db, sig.returns, super_sig.returns) {
        return Err(ContractError::new(
            ContractKind::Variance,
            format!(
                "Incompatible return type in {noun_lower} of method `{method}`:\n{}\n(The types must be covariant.)",
                sites(super_sig.returns, sig.returns)
            ),
        ));
    }
    Ok(())
}

// =============================================================================
// Final methods and entity rules
// =============================================================================

/// An ancestor's final method is overridden (signed or not).
pub fn final_override(
    method: &str,
    base: &MethodSite<'_>,
    child_owner: &str,
    child_location: &SourceLocation,
) -> ContractError {
    ContractError::new(
        ContractKind::FinalMethod,
        format!(
            "The method `{method}` on {} was declared as final and cannot be overridden in {child_owner}\n  \
             Made final here: {}\n  \
             Overridden here: {child_location}",
            base.owner, base.location
        ),
    )
}

/// A final method is defined a second time on the same owner.
pub fn final_redefinition(existing: &MethodSite<'_>, location: &SourceLocation) -> ContractError {
    ContractError::new(
        ContractKind::FinalMethod,
        format!(
            "The method `{}` on {} was declared as final and cannot be redefined\n  \
             Made final here: {}\n  \
             Redefined here: {location}",
            existing.signature.method_name, existing.owner, existing.location
        ),
    )
}

/// Every method of an `interface!` module must be abstract.
pub fn interface_method(owner: &str, method: &str) -> ContractError {
    ContractError::new(
        ContractKind::Interface,
        format!("`{owner}` is declared as an interface, so `{method}` must be declared abstract (`sig {{ abstract... }}`)"),
    )
}

/// Abstract methods need an `abstract!` or `interface!` owner.
pub fn abstract_owner(owner: &str, method: &str, location: &SourceLocation) -> ContractError {
    ContractError::new(
        ContractKind::AbstractOwner,
        format!(
            "`{owner}#{method}` at {location}: Before declaring an abstract method, you must mark your class/module as abstract using `abstract!` or `interface!`"
        ),
    )
}

#[cfg(test)]
#[path = "tests/contracts_tests.rs"]
mod tests;

//! Parameter-shape compatibility between an overriding method and the method
//! it overrides.
//!
//! An override must be callable everywhere the base method is: it may accept
//! more, never less. Checks run in a fixed order and the first violation is
//! reported.

use crate::contracts::MethodSite;
use crate::error::{ContractError, ContractKind};
use crate::signature::{Mode, ParamKind};
use std::sync::Arc;

/// `verb`/`noun` pair used in messages, depending on whether the base is
/// abstract.
pub(crate) fn relation(base: &MethodSite<'_>) -> (&'static str, &'static str) {
    if base.signature.mode == Mode::Abstract {
        ("implements", "Implementation")
    } else {
        ("overrides", "Override")
    }
}

pub(crate) fn base_override_loc(child: &MethodSite<'_>, base: &MethodSite<'_>) -> String {
    let (_, noun) = relation(base);
    format!(
        "\n * Base definition: in {}\n * {noun}: in {}",
        base.loc_str(),
        child.loc_str()
    )
}

fn symbol_list(names: &[Arc<str>]) -> String {
    let rendered: Vec<String> = names.iter().map(|n| format!(":{n}")).collect();
    format!("[{}]", rendered.join(", "))
}

fn param_name(site: &MethodSite<'_>, kind: ParamKind) -> Arc<str> {
    site.signature
        .params
        .iter()
        .find(|p| p.kind == kind)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "args".into())
}

pub fn check_shape(child: &MethodSite<'_>, base: &MethodSite<'_>) -> Result<(), ContractError> {
    let sig = child.signature;
    let super_sig = base.signature;
    let method = &sig.method_name;
    let (verb, _) = relation(base);
    let fail = |detail: String| {
        Err(ContractError::new(
            ContractKind::Shape,
            format!(
                "Your definition of `{method}` {detail}: {}",
                base_override_loc(child, base)
            ),
        ))
    };

    if !sig.has_rest() && sig.arg_count() < super_sig.arg_count() {
        return fail(format!(
            "must accept at least {} positional arguments to be compatible with the method it {verb}",
            super_sig.arg_count()
        ));
    }
    if !sig.has_rest() && super_sig.has_rest() {
        return fail(format!(
            "must have `*{}` to be compatible with the method it {verb}",
            param_name(base, ParamKind::Rest)
        ));
    }
    if sig.req_arg_count() > super_sig.req_arg_count() {
        return fail(format!(
            "must have no more than {} required argument(s) to be compatible with the method it {verb}",
            super_sig.req_arg_count()
        ));
    }
    if !sig.has_keyrest() {
        let own = sig.kwarg_names();
        let missing: Vec<Arc<str>> = super_sig
            .kwarg_names()
            .into_iter()
            .filter(|name| !own.contains(name))
            .collect();
        if !missing.is_empty() {
            return fail(format!(
                "is missing these keyword arg(s): {} which are defined in the method it {verb}",
                symbol_list(&missing)
            ));
        }
        if super_sig.has_keyrest() {
            return fail(format!(
                "must have `**{}` to be compatible with the method it {verb}",
                param_name(base, ParamKind::KeyRest)
            ));
        }
    }
    let base_required = super_sig.req_kwarg_names();
    let extra: Vec<Arc<str>> = sig
        .req_kwarg_names()
        .into_iter()
        .filter(|name| !base_required.contains(name))
        .collect();
    if !extra.is_empty() {
        return fail(format!(
            "has extra required keyword arg(s) {} relative to the method it {verb}, making it incompatible",
            symbol_list(&extra)
        ));
    }
    if super_sig.block().is_some() && sig.block().is_none() {
        return fail(format!(
            "must accept a block parameter to be compatible with the method it {verb}"
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/shape_tests.rs"]
mod tests;

//! Argument binding.
//!
//! Matches the arguments of a call against a method's parameter list the way
//! the interpreter would. Leading required positionals bind from the front
//! and required positionals after `*rest` (or an optional) from the back;
//! optionals take what is left in order and `*rest` the remainder. Keywords
//! bind by name, with unknown names collected into `**kwrest`. Arity problems
//! are reported as [`ArgumentError`]s before any type is looked at.

use crate::error::ArgumentError;
use crate::method::{Args, MethodParam};
use crate::signature::ParamKind;
use rtype_solver::Value;
use std::sync::Arc;

static NIL: Value = Value::Nil;

/// One parameter paired with the value it received.
///
/// `*rest` binds once per element and `**kwrest` once per extra keyword, so
/// every element is checked against the declared element type.
#[derive(Debug)]
pub struct BoundArg<'a> {
    pub param: &'a MethodParam,
    pub value: &'a Value,
}

pub fn bind_arguments<'a>(
    params: &'a [MethodParam],
    args: &'a Args,
) -> Result<Vec<BoundArg<'a>>, ArgumentError> {
    let required = count(params, ParamKind::Required);
    let optional = count(params, ParamKind::Optional);
    let rest = params.iter().find(|p| p.kind == ParamKind::Rest);
    let given = args.positional.len();

    if given < required || (rest.is_none() && given > required + optional) {
        let expected = match (rest.is_some(), optional) {
            (true, _) => format!("{required}+"),
            (false, 0) => required.to_string(),
            (false, _) => format!("{required}..{}", required + optional),
        };
        return Err(ArgumentError::WrongNumber { given, expected });
    }

    let positional: Vec<&MethodParam> = params.iter().filter(|p| p.kind.is_positional()).collect();
    let lead = positional
        .iter()
        .take_while(|p| p.kind == ParamKind::Required)
        .count();
    let post = required - lead;
    let mut leading = args.positional[..lead].iter();
    let mut middle = args.positional[lead..given - post].iter();
    let mut trailing = args.positional[given - post..].iter();

    let mut bound = Vec::with_capacity(params.len() + given);
    for (index, &param) in positional.iter().enumerate() {
        let value = match param.kind {
            ParamKind::Required if index < lead => leading.next(),
            ParamKind::Required => trailing.next(),
            ParamKind::Optional => middle.next(),
            ParamKind::Rest => {
                bound.extend(middle.by_ref().map(|value| BoundArg { param, value }));
                None
            }
            _ => None,
        };
        if let Some(value) = value {
            bound.push(BoundArg { param, value });
        }
    }

    bind_keywords(params, args, &mut bound)?;

    if let Some(param) = params.iter().find(|p| p.kind == ParamKind::Block) {
        bound.push(BoundArg {
            param,
            value: args.block.as_ref().unwrap_or(&NIL),
        });
    }
    Ok(bound)
}

fn bind_keywords<'a>(
    params: &'a [MethodParam],
    args: &'a Args,
    bound: &mut Vec<BoundArg<'a>>,
) -> Result<(), ArgumentError> {
    let missing: Vec<Arc<str>> = params
        .iter()
        .filter(|p| p.kind == ParamKind::KeyRequired && !args.keywords.contains_key(&p.name))
        .map(|p| p.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(ArgumentError::MissingKeywords(missing));
    }

    let key_rest = params.iter().find(|p| p.kind == ParamKind::KeyRest);
    let mut unknown = Vec::new();
    for (name, value) in &args.keywords {
        let named = params.iter().find(|p| {
            matches!(p.kind, ParamKind::KeyRequired | ParamKind::KeyOptional) && p.name == *name
        });
        match (named, key_rest) {
            (Some(param), _) | (None, Some(param)) => bound.push(BoundArg { param, value }),
            (None, None) => unknown.push(name.clone()),
        }
    }
    if !unknown.is_empty() {
        return Err(ArgumentError::UnknownKeywords(unknown));
    }
    Ok(())
}

fn count(params: &[MethodParam], kind: ParamKind) -> usize {
    params.iter().filter(|p| p.kind == kind).count()
}

#[cfg(test)]
#[path = "tests/binding_tests.rs"]
mod tests;

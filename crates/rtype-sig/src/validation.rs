//! Call validation.
//!
//! [`install`] wraps a method body so that every call binds and checks its
//! arguments, runs the original body, and checks the return value. The
//! wrapper is built once per definition; per-call work is limited to the
//! checks themselves.

use crate::binding::bind_arguments;
use crate::config::ValidationConfig;
use crate::error::{CallError, FailureKind, TypeError};
use crate::handlers::Handlers;
use crate::method::{Args, MethodBody, MethodParam};
use crate::signature::{CheckedLevel, FailurePolicy, Mode, ParamKind, Signature};
use rtype_common::SourceLocation;
use rtype_solver::{TypeId, TypeInterner, Value, is_recursively_valid, is_valid, mismatch_message};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared state every installed wrapper needs.
#[derive(Default)]
pub struct ValidationContext {
    pub types: TypeInterner,
    pub config: ValidationConfig,
    pub handlers: Handlers,
}

impl ValidationContext {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            types: TypeInterner::new(),
            config,
            handlers: Handlers::new(),
        }
    }

    /// Validity under the configured strength.
    pub fn is_valid(&self, ty: TypeId, value: &Value) -> bool {
        if self.config.deep_container_checks {
            is_recursively_valid(&self.types, ty, value)
        } else {
            is_valid(&self.types, ty, value)
        }
    }

    pub fn mismatch_message(&self, ty: TypeId, value: &Value) -> String {
        mismatch_message(&self.types, ty, value, &self.config.inspect)
    }
}

/// Wrap `original` so that calls are validated against `signature`.
///
/// Abstract signatures get a body that always fails; `Never`-checked
/// signatures get `original` back unchanged.
pub fn install(
    original: MethodBody,
    signature: Arc<Signature>,
    ctx: Arc<ValidationContext>,
) -> MethodBody {
    if signature.mode == Mode::Abstract {
        let method = signature.method_name.clone();
        let owner = signature.owner_name.clone();
        return Arc::new(move |_: &Value, _: &Args| {
            Err(CallError::AbstractMethod {
                method: method.clone(),
                owner: owner.clone(),
            })
        });
    }
    if signature.checked == CheckedLevel::Never {
        debug!(method = %signature.method_name, "checked(:never); installing unwrapped body");
        return original;
    }

    let params: Vec<MethodParam> = signature
        .params
        .iter()
        .map(|p| MethodParam::new(p.name.clone(), p.kind))
        .collect();

    Arc::new(move |receiver: &Value, args: &Args| {
        if signature.checked == CheckedLevel::Tests && !ctx.config.test_mode.check_tests() {
            return original(receiver, args);
        }

        let bound = bind_arguments(&params, args)?;
        if let Some(bind) = signature.bind {
            check(&ctx, &signature, FailureKind::Bind, None, bind, receiver, &args.caller)?;
        }
        for arg in &bound {
            let Some(declared) = signature.param(&arg.param.name) else {
                continue;
            };
            let kind = match arg.param.kind {
                ParamKind::Block => FailureKind::BlockParameter,
                _ => FailureKind::Parameter,
            };
            check(
                &ctx,
                &signature,
                kind,
                Some(arg.param.name.clone()),
                declared.ty,
                arg.value,
                &args.caller,
            )?;
        }

        let result = original(receiver, args)?;
        if signature.returns != TypeId::VOID {
            check(
                &ctx,
                &signature,
                FailureKind::ReturnValue,
                None,
                signature.returns,
                &result,
                &args.caller,
            )?;
        }
        Ok(result)
    })
}

fn check(
    ctx: &ValidationContext,
    signature: &Signature,
    kind: FailureKind,
    name: Option<Arc<str>>,
    ty: TypeId,
    value: &Value,
    caller: &SourceLocation,
) -> Result<(), CallError> {
    if ctx.is_valid(ty, value) {
        return Ok(());
    }
    let message = ctx.mismatch_message(ty, value);
    let error = TypeError::new(
        signature,
        kind,
        name,
        message,
        ty,
        value.clone(),
        caller.clone(),
    );
    report(ctx, signature, error)
}

fn report(ctx: &ValidationContext, signature: &Signature, error: TypeError) -> Result<(), CallError> {
    if signature.generated {
        warn!(
            method = %signature.method_name,
            failures = error.failure_count,
            "{}",
            error.pretty_message
        );
        return Ok(());
    }
    if let FailurePolicy::Soft { notify } = &signature.on_failure {
        warn!(
            method = %signature.method_name,
            notify = %notify,
            failures = error.failure_count,
            "{}",
            error.pretty_message
        );
        ctx.handlers.on_soft_failure(notify, &error);
        return Ok(());
    }
    ctx.handlers
        .on_call_validation_error(signature, error)
        .map_err(CallError::from)
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;

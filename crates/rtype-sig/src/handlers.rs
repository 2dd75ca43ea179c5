//! Pluggable error handlers.
//!
//! Every slot starts empty, which selects the default behaviour described on
//! each setter. Handlers may be replaced at any time; a call in flight keeps
//! the handler it already loaded.

use crate::error::{DeclarationError, InlineTypeError, SigBuildError, TypeError};
use crate::signature::Signature;
use std::sync::{Arc, RwLock};

pub type TypeErrorHandler = dyn Fn(&InlineTypeError) -> Result<(), InlineTypeError> + Send + Sync;
pub type DeclErrorHandler = dyn Fn(&DeclarationError) + Send + Sync;
pub type BuildErrorHandler = dyn Fn(&SigBuildError) -> Result<(), SigBuildError> + Send + Sync;
pub type CallValidationHandler =
    dyn Fn(&Signature, &TypeError) -> Result<(), TypeError> + Send + Sync;
pub type SoftFailureHandler = dyn Fn(&str, &TypeError) + Send + Sync;

type Slot<F> = RwLock<Option<Arc<F>>>;

fn load<F: ?Sized>(slot: &Slot<F>) -> Option<Arc<F>> {
    match slot.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn store<F: ?Sized>(slot: &Slot<F>, handler: Option<Arc<F>>) {
    match slot.write() {
        Ok(mut guard) => *guard = handler,
        Err(poisoned) => *poisoned.into_inner() = handler,
    }
}

#[derive(Default)]
pub struct Handlers {
    type_error: Slot<TypeErrorHandler>,
    sig_decl_error: Slot<DeclErrorHandler>,
    sig_build_error: Slot<BuildErrorHandler>,
    call_validation_error: Slot<CallValidationHandler>,
    soft_failure: Slot<SoftFailureHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline assertion failures (`let_type`, `cast`, `must`). Default:
    /// return the error. `Ok` from the handler lets the assertion pass.
    pub fn set_type_error_handler(
        &self,
        handler: impl Fn(&InlineTypeError) -> Result<(), InlineTypeError> + Send + Sync + 'static,
    ) {
        let handler: Arc<TypeErrorHandler> = Arc::new(handler);
        store(&self.type_error, Some(handler));
    }

    /// Observer for declaration errors. The error is raised regardless.
    pub fn set_sig_decl_error_handler(
        &self,
        handler: impl Fn(&DeclarationError) + Send + Sync + 'static,
    ) {
        let handler: Arc<DeclErrorHandler> = Arc::new(handler);
        store(&self.sig_decl_error, Some(handler));
    }

    /// Signature/method mismatches. Default: fatal. `Ok` installs the method
    /// without validation.
    pub fn set_sig_build_error_handler(
        &self,
        handler: impl Fn(&SigBuildError) -> Result<(), SigBuildError> + Send + Sync + 'static,
    ) {
        let handler: Arc<BuildErrorHandler> = Arc::new(handler);
        store(&self.sig_build_error, Some(handler));
    }

    /// Call-time type errors of signatures with the default failure policy.
    /// `Ok` lets the call continue.
    pub fn set_call_validation_error_handler(
        &self,
        handler: impl Fn(&Signature, &TypeError) -> Result<(), TypeError> + Send + Sync + 'static,
    ) {
        let handler: Arc<CallValidationHandler> = Arc::new(handler);
        store(&self.call_validation_error, Some(handler));
    }

    /// Notified with the policy's `notify` target on soft failures.
    pub fn set_soft_failure_handler(
        &self,
        handler: impl Fn(&str, &TypeError) + Send + Sync + 'static,
    ) {
        let handler: Arc<SoftFailureHandler> = Arc::new(handler);
        store(&self.soft_failure, Some(handler));
    }

    /// Restore every default.
    pub fn reset(&self) {
        store(&self.type_error, None);
        store(&self.sig_decl_error, None);
        store(&self.sig_build_error, None);
        store(&self.call_validation_error, None);
        store(&self.soft_failure, None);
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    pub(crate) fn on_inline_type_error(&self, error: InlineTypeError) -> Result<(), InlineTypeError> {
        match load(&self.type_error) {
            Some(handler) => handler(&error),
            None => Err(error),
        }
    }

    pub(crate) fn on_declaration_error(&self, error: DeclarationError) -> DeclarationError {
        if let Some(handler) = load(&self.sig_decl_error) {
            handler(&error);
        }
        error
    }

    pub(crate) fn on_build_error(&self, error: SigBuildError) -> Result<(), SigBuildError> {
        match load(&self.sig_build_error) {
            Some(handler) => handler(&error),
            None => Err(error),
        }
    }

    pub(crate) fn on_call_validation_error(
        &self,
        signature: &Signature,
        error: TypeError,
    ) -> Result<(), TypeError> {
        match load(&self.call_validation_error) {
            Some(handler) => handler(signature, &error),
            None => Err(error),
        }
    }

    pub(crate) fn on_soft_failure(&self, notify: &str, error: &TypeError) {
        if let Some(handler) = load(&self.soft_failure) {
            handler(notify, error);
        }
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("type_error", &load(&self.type_error).is_some())
            .field("sig_decl_error", &load(&self.sig_decl_error).is_some())
            .field("sig_build_error", &load(&self.sig_build_error).is_some())
            .field("call_validation_error", &load(&self.call_validation_error).is_some())
            .field("soft_failure", &load(&self.soft_failure).is_some())
            .finish()
    }
}

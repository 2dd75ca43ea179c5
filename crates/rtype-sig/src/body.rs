//! Class bodies: `sig` followed by `def`.
//!
//! A [`ClassBody`] holds at most one pending declaration. `def` consumes it;
//! a second `sig` before that, or closing the body with one still pending, is
//! a declaration error. A body dropped without [`ClassBody::finish`] reports
//! its pending declaration to the declaration-error handler.

use crate::builder::{IntoDeclaration, SigBuilder};
use crate::error::{DeclarationError, Error};
use crate::method::MethodDef;
use crate::runtime::Runtime;
use rtype_solver::ClassId;
use tracing::warn;

const DANGLING_SIG: &str = "sig with no following method";

#[must_use = "call `finish` to report a `sig` left without a method"]
pub struct ClassBody<'rt> {
    runtime: &'rt Runtime,
    class: ClassId,
    pending: Option<SigBuilder>,
}

impl std::fmt::Debug for ClassBody<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassBody")
            .field("class", &self.class)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl<'rt> ClassBody<'rt> {
    pub(crate) fn new(runtime: &'rt Runtime, class: ClassId) -> Self {
        Self {
            runtime,
            class,
            pending: None,
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Stage a declaration for the next `def`.
    pub fn sig(&mut self, sig: impl IntoDeclaration) -> Result<&mut Self, Error> {
        let builder = sig
            .into_builder()
            .map_err(|e| self.runtime.handlers().on_declaration_error(e))?;
        if let Some(previous) = &self.pending {
            let err = DeclarationError::new(
                "You called sig twice without declaring a method in between",
                previous.location().clone(),
            );
            self.pending = None;
            return Err(self.runtime.handlers().on_declaration_error(err).into());
        }
        self.pending = Some(builder);
        Ok(self)
    }

    /// Define a method, consuming the pending declaration if any.
    pub fn def(&mut self, def: MethodDef) -> Result<&mut Self, Error> {
        let pending = self.pending.take();
        self.runtime.define_method(self.class, def, pending)?;
        Ok(self)
    }

    /// Close the body.
    pub fn finish(mut self) -> Result<ClassId, Error> {
        if let Some(pending) = self.pending.take() {
            let err = DeclarationError::new(DANGLING_SIG, pending.location().clone());
            return Err(self.runtime.handlers().on_declaration_error(err).into());
        }
        Ok(self.class)
    }
}

impl Drop for ClassBody<'_> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            let err = DeclarationError::new(DANGLING_SIG, pending.location().clone());
            warn!(location = %err.location, "class body dropped with a pending sig");
            self.runtime.handlers().on_declaration_error(err);
        }
    }
}

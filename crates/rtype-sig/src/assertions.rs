//! Inline assertions: `T.let`, `T.cast`, `T.must`.
//!
//! Failures go through the type-error handler, which raises by default.

use crate::error::InlineTypeError;
use crate::runtime::Runtime;
use rtype_solver::{RawType, Value, coerce};

impl Runtime {
    /// `T.let(value, type)`: the value must be valid for the type.
    pub fn let_type(&self, value: Value, ty: impl Into<RawType>) -> Result<Value, InlineTypeError> {
        self.assert_type("T.let", value, ty)
    }

    /// `T.cast(value, type)`. Unchecked statically; checked here like `let`.
    pub fn cast(&self, value: Value, ty: impl Into<RawType>) -> Result<Value, InlineTypeError> {
        self.assert_type("T.cast", value, ty)
    }

    /// `T.must(value)`: the value must not be `nil`.
    pub fn must(&self, value: Value) -> Result<Value, InlineTypeError> {
        if value.is_nil() {
            self.handlers().on_inline_type_error(InlineTypeError {
                message: "Passed `nil` into T.must".to_string(),
            })?;
        }
        Ok(value)
    }

    fn assert_type(
        &self,
        what: &str,
        value: Value,
        ty: impl Into<RawType>,
    ) -> Result<Value, InlineTypeError> {
        let ty = coerce(self.types(), ty).map_err(|e| InlineTypeError {
            message: format!("{what}: {e}"),
        })?;
        if !self.context().is_valid(ty, &value) {
            let message = format!("{what}: {}", self.context().mismatch_message(ty, &value));
            self.handlers()
                .on_inline_type_error(InlineTypeError { message })?;
        }
        Ok(value)
    }
}

#[cfg(test)]
#[path = "tests/assertions_tests.rs"]
mod tests;

//! Depth limiting for recursive type and value walks.
//!
//! Type nodes are interned bottom-up and therefore acyclic, but both types and
//! values can nest arbitrarily deep. `DepthGuard` bounds a single walk and
//! remembers whether the bound was ever hit so callers can log it once.
//!
//! # Profiles
//!
//! [`RecursionProfile`] names the limit at the call site instead of a bare
//! number:
//!
//! ```ignore
//! let guard = DepthGuard::with_profile(RecursionProfile::SubtypeCheck);
//! ```

use rtype_common::limits::{MAX_SUBTYPE_DEPTH, MAX_VALIDATION_DEPTH};

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Structural subtype checks over nested generics.
    ///
    /// depth = `MAX_SUBTYPE_DEPTH`
    SubtypeCheck,

    /// Recursive value validation (container elements).
    ///
    /// depth = `MAX_VALIDATION_DEPTH`
    ValueValidation,

    /// Caller-chosen limit.
    Custom { max_depth: u32 },
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            RecursionProfile::SubtypeCheck => MAX_SUBTYPE_DEPTH,
            RecursionProfile::ValueValidation => MAX_VALIDATION_DEPTH,
            RecursionProfile::Custom { max_depth } => max_depth,
        }
    }
}

/// Depth counter with an "exceeded" latch.
#[derive(Debug)]
pub struct DepthGuard {
    depth: u32,
    max_depth: u32,
    exceeded: bool,
}

impl DepthGuard {
    pub const fn with_profile(profile: RecursionProfile) -> Self {
        Self {
            depth: 0,
            max_depth: profile.max_depth(),
            exceeded: false,
        }
    }

    /// Enter one level. Returns `false` (and latches `exceeded`) when the
    /// limit is reached; the caller must not call `leave` in that case.
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0, "DepthGuard::leave without matching enter");
        self.depth = self.depth.saturating_sub(1);
    }

    pub const fn depth(&self) -> u32 {
        self.depth
    }

    pub const fn is_exceeded(&self) -> bool {
        self.exceeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_latches_when_exceeded() {
        let mut guard = DepthGuard::with_profile(RecursionProfile::Custom { max_depth: 2 });
        assert!(guard.enter());
        assert!(guard.enter());
        assert!(!guard.enter());
        assert!(guard.is_exceeded());
        guard.leave();
        guard.leave();
        assert_eq!(guard.depth(), 0);
        // The latch survives unwinding.
        assert!(guard.is_exceeded());
    }

    #[test]
    fn test_profiles_use_central_limits() {
        assert_eq!(
            RecursionProfile::SubtypeCheck.max_depth(),
            MAX_SUBTYPE_DEPTH
        );
        assert_eq!(
            RecursionProfile::ValueValidation.max_depth(),
            MAX_VALIDATION_DEPTH
        );
    }
}

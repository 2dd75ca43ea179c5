//! Centralized limits and thresholds for the runtime type system.
//!
//! This module provides shared constants for recursion depths and rendering caps
//! used throughout the codebase. Centralizing these values keeps the subtype
//! checker, the value validator and the error-message renderer consistent.
//!
//! # Categories
//!
//! - **Recursion Depths**: Limits to prevent stack overflow when walking nested
//!   types or deeply nested values
//! - **Rendering Caps**: Limits on how much of a value is rendered into an error
//!   message, so that a failing call never pays for formatting a huge structure

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting depth for a single subtype query.
///
/// Type nodes are acyclic (they are interned bottom-up), so this only triggers
/// for pathologically deep types such as a hundred nested `T::Array[...]`.
/// When exceeded the query answers `false`.
pub const MAX_SUBTYPE_DEPTH: u32 = 100;

/// Maximum depth for recursive value validation.
///
/// Values can nest arbitrarily deep (arrays of hashes of arrays ...). Element
/// checks stop descending past this depth and treat the remainder as valid,
/// mirroring the erasure applied to shallow checks.
///
/// ```ruby
/// # 300 levels of nesting: only the first MAX_VALIDATION_DEPTH are inspected
/// [[[[[[[[[[ ... ]]]]]]]]]]
/// ```
pub const MAX_VALIDATION_DEPTH: u32 = 64;

/// Red-zone size handed to `stacker::maybe_grow` for recursive walks.
pub const STACK_RED_ZONE: usize = 64 * 1024;

/// Stack segment allocated by `stacker::maybe_grow` when the red zone is hit.
pub const STACK_GROW_SIZE: usize = 1024 * 1024;

// =============================================================================
// Rendering Caps (error messages)
// =============================================================================

/// Maximum number of characters of a rendered value kept in an error message.
///
/// Longer renderings are cut and suffixed with `...`.
pub const MAX_INSPECT_LENGTH: usize = 256;

/// Maximum nesting depth rendered for container values.
///
/// Deeper containers render as `[...]` / `{...}`.
pub const MAX_INSPECT_DEPTH: u32 = 4;

/// Maximum number of container elements rendered before eliding the rest.
pub const MAX_INSPECT_ELEMENTS: usize = 16;

/// Maximum number of container elements sampled when describing the runtime
/// type of a container (e.g. `T::Array[T.any(Integer, String)]`).
pub const MAX_DESCRIBE_SAMPLE: usize = 32;

//! Common types and utilities for the rtype runtime type system.
//!
//! This crate provides foundational types used across all rtype crates:
//! - Source locations for declarations and call sites (`SourceLocation`)
//! - Centralized limits and thresholds (recursion depths, inspection caps)

// Centralized limits and thresholds
pub mod limits;

// Declaration / call-site locations
pub mod location;
pub use location::SourceLocation;

//! Source locations for declarations and call sites.
//!
//! Every fatal error produced by the runtime names the file and line of the
//! offending declaration, and call-time errors name both the caller and the
//! definition. Locations are supplied by the embedder (there is no parser here),
//! so the type is deliberately tiny: a shared file path and a 1-based line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A `file:line` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<Arc<str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location used when the embedder did not supply one.
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0)
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0 && &*self.file == "<unknown>"
    }

    pub fn path(&self) -> &Path {
        Path::new(&*self.file)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

//! Diagnostic records surfaced by every compiler pass.
//!
//! A diagnostic is a `(message, line, column)` triple. Messages are plain
//! text and never embed terminal color codes; the CLI presentation layer is
//! responsible for formatting.

use serde::{Deserialize, Serialize};

use crate::position::{SourcePosition, line_column_at};

/// A single compiler diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    /// 1-indexed source line (0 for synthetic nodes with no origin token).
    pub line: u32,
    /// 0-indexed column.
    pub column: u32,
}

impl Diagnostic {
    #[must_use]
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// Build a diagnostic whose position is resolved from a byte offset.
    #[must_use]
    pub fn at_offset(message: impl Into<String>, source: &str, offset: u32) -> Self {
        let SourcePosition { line, column } = line_column_at(source, offset);
        Self::new(message, line, column)
    }

    /// Build a diagnostic with no source position (synthetic nodes).
    #[must_use]
    pub fn unpositioned(message: impl Into<String>) -> Self {
        Self::new(message, 0, 0)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

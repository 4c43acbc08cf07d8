//! Common types and utilities for the firec compiler.
//!
//! This crate provides foundational types used across all firec crates:
//! - Line/column source positions (`position`)
//! - Diagnostics (`Diagnostic`, `(message, line, column)` triples)
//! - The canonical type model and value categories (`types`)

// Position - byte offset <-> line/column conversion
pub mod position;
pub use position::{SourcePosition, line_column_at, source_line};

// Diagnostics - plain-text error records
pub mod diagnostics;
pub use diagnostics::Diagnostic;

// Type model - canonical type names and Owned/Copyable classification
pub mod types;
pub use types::{OwnershipCatalog, ValueCategory};

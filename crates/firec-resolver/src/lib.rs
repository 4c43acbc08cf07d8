//! Module graph resolution and merge for the firec compiler.
//!
//! A dotted module path `a.b.c` maps to `<root>/a/b/c.fire`. The resolver
//! loads the import graph depth-first with cycle detection, orders modules
//! topologically, and merges exported top-level declarations into a single
//! tree for the downstream passes.
//!
//! Module errors abort resolution immediately and name the failing module;
//! merge conflicts are accumulated as diagnostics.

pub mod module;
pub use module::{Module, ResolveError, collect_exports, collect_imports};

pub mod resolver;
pub use resolver::ModuleResolver;

pub mod merge;
pub use merge::{MergedProgram, build_merged_program};

//! Parser, arena AST, and in-parse semantic passes for the firec compiler.
//!
//! This crate provides:
//! - `NodeArena` / `Node` / `NodeKind` - the annotated syntax tree, stored as
//!   an arena with index handles (parent/children are ids, not references)
//! - `ParserState` - recursive-descent parser with error recovery that also
//!   populates the module-wide registries while building the tree
//! - Identifier resolution (lexical scope chain, shadowing rules)
//! - The in-place type check that annotates every expression node with its
//!   `return_type`
//!
//! The parser accumulates diagnostics and keeps going where possible; one
//! run reports many problems.

pub mod node;
pub use node::{ImportData, ImportKind, ImportSymbol, Node, NodeArena, NodeId, NodeKind};

pub mod registries;
pub use registries::{MethodSig, ParamSig, Registries, builtin_return_type};

pub mod state;
pub use state::ParserState;

mod expressions;
mod statements;
mod functions;
mod classes;
mod imports;
mod resolve;
mod typecheck;

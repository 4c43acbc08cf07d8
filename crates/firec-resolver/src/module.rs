//! Loaded-module records and resolver errors.

use std::path::PathBuf;

use firec_parser::{ImportData, ImportKind, NodeArena, NodeId, NodeKind, ParserState};
use indexmap::IndexMap;

/// A loaded module: its dotted name, file path, parsed tree, imports, and
/// collected exports. Cached by dotted name in the resolver.
pub struct Module {
    pub dotted: String,
    pub path: PathBuf,
    pub parser: ParserState,
    pub imports: Vec<ImportData>,
    /// Exported top-level declarations, in source order.
    pub exports: IndexMap<String, NodeId>,
}

/// Collect the import statements directly under a root node.
#[must_use]
pub fn collect_imports(arena: &NodeArena, root: NodeId) -> Vec<ImportData> {
    arena
        .node(root)
        .children
        .iter()
        .filter_map(|&child| {
            let node = arena.node(child);
            if node.kind == NodeKind::ImportStatement {
                node.import.clone()
            } else {
                None
            }
        })
        .collect()
}

/// Top-level function definitions, class definitions, and variable
/// declarations are exposed as exports keyed by name.
#[must_use]
pub fn collect_exports(arena: &NodeArena, root: NodeId) -> IndexMap<String, NodeId> {
    let mut exports = IndexMap::new();
    for &child in &arena.node(root).children {
        let node = arena.node(child);
        if matches!(
            node.kind,
            NodeKind::FunctionDefinition | NodeKind::ClassDefinition | NodeKind::VariableDeclaration
        ) {
            exports.insert(node.name.clone(), child);
        }
    }
    exports
}

/// Errors that abort module resolution. The failing module is always named
/// in the message.
#[derive(Debug)]
pub enum ResolveError {
    ModuleNotFound {
        dotted: String,
        path: PathBuf,
    },
    CyclicImport {
        cycle: Vec<String>,
    },
    ExternalPackage {
        module_path: String,
    },
    RelativeImport {
        module_path: String,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The imported file failed to parse; carries the first parser error.
    Parse {
        path: PathBuf,
        message: String,
        line: u32,
        column: u32,
    },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModuleNotFound { dotted, path } => {
                write!(f, "Module not found: {dotted} (looked in {})", path.display())
            }
            Self::CyclicImport { cycle } => {
                write!(f, "Cyclic import detected: {}", cycle.join(" -> "))
            }
            Self::ExternalPackage { module_path } => {
                write!(f, "External packages are not supported: {module_path}")
            }
            Self::RelativeImport { module_path } => {
                write!(f, "Relative imports are not supported: {module_path}")
            }
            Self::Io { path, source } => {
                write!(f, "Failed to read {}: {source}", path.display())
            }
            Self::Parse {
                path,
                message,
                line,
                column,
            } => {
                write!(
                    f,
                    "Parse error in {}: {message} at {line}:{column}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Whether an import should be skipped by the loader (externals error out
/// elsewhere; everything else is loadable).
#[must_use]
pub fn is_loadable(import: &ImportData) -> bool {
    import.kind != ImportKind::External
}

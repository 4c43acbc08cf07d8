//! Topological merge of module exports into a single tree.
//!
//! Dependency modules contribute their exports in topological order (first
//! definition wins; later conflicts are reported). The entry module's
//! non-import top-level statements follow in source order; an entry-level
//! symbol replaces a same-named imported one in place.

use firec_common::Diagnostic;
use firec_parser::{Node, NodeArena, NodeId, NodeKind, ParserState, Registries};
use rustc_hash::FxHashMap;

use crate::resolver::ModuleResolver;

/// The merged compilation unit handed to the ownership passes and the
/// emitter.
#[derive(Debug)]
pub struct MergedProgram {
    pub arena: NodeArena,
    pub root: NodeId,
    /// Union of every module's registries (entry definitions win).
    pub registries: Registries,
    /// Top-level name -> (base type, is_array), used to discharge deferred
    /// undefined-identifier diagnostics.
    pub merged_symbols: FxHashMap<String, (Option<String>, bool)>,
    /// Merge-conflict diagnostics.
    pub errors: Vec<Diagnostic>,
}

impl MergedProgram {
    /// Wrap a single parsed file (no imports) as a merged program.
    #[must_use]
    pub fn from_parser(parser: ParserState) -> Self {
        let root = parser.root;
        let registries = parser.registries.clone();
        Self {
            arena: parser.arena,
            root,
            registries,
            merged_symbols: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    /// Whether the merged root carries a class definition with this name.
    #[must_use]
    pub fn has_top_level_class(&self, name: &str) -> bool {
        self.arena.node(self.root).children.iter().any(|&child| {
            let node = self.arena.node(child);
            node.kind == NodeKind::ClassDefinition && node.name == name
        })
    }
}

/// Copy a subtree from one arena into another, rewiring parent ids.
fn copy_subtree(source: &NodeArena, id: NodeId, target: &mut NodeArena) -> NodeId {
    let mut copy = source.node(id).clone();
    let children = std::mem::take(&mut copy.children);
    copy.parent = None;
    let new_id = target.alloc(copy);
    for child in children {
        let new_child = copy_subtree(source, child, target);
        target.add_child(new_id, new_child);
    }
    new_id
}

const MERGEABLE: [NodeKind; 3] = [
    NodeKind::FunctionDefinition,
    NodeKind::ClassDefinition,
    NodeKind::VariableDeclaration,
];

/// Build the merged tree for the entry module plus its dependencies in
/// topological order.
#[must_use]
pub fn build_merged_program(
    resolver: &ModuleResolver,
    entry: &ParserState,
    topo: &[String],
) -> MergedProgram {
    let mut arena = NodeArena::new();
    let root = arena.alloc(Node::new(NodeKind::Root, None, "root", 0));
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut seen: FxHashMap<String, NodeId> = FxHashMap::default();

    // Dependency exports first, in topological order. First definition
    // wins; later same-named exports are reported.
    for dotted in topo {
        let Some(module) = resolver.modules.get(dotted) else {
            continue;
        };
        for (name, &export) in &module.exports {
            let kind = module.parser.arena.node(export).kind;
            if !MERGEABLE.contains(&kind) {
                continue;
            }
            if seen.contains_key(name) {
                errors.push(Diagnostic::unpositioned(format!(
                    "Conflicting top-level symbol '{name}' from imports; already defined."
                )));
                continue;
            }
            let copied = copy_subtree(&module.parser.arena, export, &mut arena);
            arena.add_child(root, copied);
            seen.insert(name.clone(), copied);
        }
    }

    // Entry module's non-import top-level statements, in source order. An
    // entry symbol replaces a conflicting imported one in place.
    for &child in &entry.arena.node(entry.root).children {
        let node = entry.arena.node(child);
        if node.kind == NodeKind::ImportStatement {
            continue;
        }
        if MERGEABLE.contains(&node.kind) {
            if let Some(&previous) = seen.get(&node.name) {
                errors.push(Diagnostic::unpositioned(format!(
                    "Top-level symbol '{}' in entry conflicts with imported symbol.",
                    node.name
                )));
                let name = node.name.clone();
                let copied = copy_subtree(&entry.arena, child, &mut arena);
                let position = arena
                    .node(root)
                    .children
                    .iter()
                    .position(|&c| c == previous);
                match position {
                    Some(position) => {
                        let mut children = arena.node(root).children.clone();
                        children[position] = copied;
                        arena.set_children(root, children);
                    }
                    None => arena.add_child(root, copied),
                }
                seen.insert(name, copied);
                continue;
            }
            let name = node.name.clone();
            let copied = copy_subtree(&entry.arena, child, &mut arena);
            arena.add_child(root, copied);
            seen.insert(name, copied);
            continue;
        }
        let copied = copy_subtree(&entry.arena, child, &mut arena);
        arena.add_child(root, copied);
    }

    // Union the registries: entry first so its definitions win.
    let mut registries = entry.registries.clone();
    for dotted in topo {
        if let Some(module) = resolver.modules.get(dotted) {
            registries.merge(&module.parser.registries);
        }
    }

    let merged_symbols = annotate_merged(&mut arena, root);

    MergedProgram {
        arena,
        root,
        registries,
        merged_symbols,
        errors,
    }
}

/// Post-merge annotation: propagate merged top-level declaration types to
/// identifier uses and call return types, and produce the merged symbol
/// table.
fn annotate_merged(
    arena: &mut NodeArena,
    root: NodeId,
) -> FxHashMap<String, (Option<String>, bool)> {
    let mut function_types: FxHashMap<String, String> = FxHashMap::default();
    let mut symbols: FxHashMap<String, (Option<String>, bool)> = FxHashMap::default();

    for &child in &arena.node(root).children {
        let node = arena.node(child);
        match node.kind {
            NodeKind::FunctionDefinition => {
                let return_type = node
                    .return_type
                    .clone()
                    .unwrap_or_else(|| "void".to_string());
                function_types.insert(node.name.clone(), return_type.clone());
                symbols.insert(node.name.clone(), (Some(return_type), false));
            }
            NodeKind::VariableDeclaration => {
                if node.var_type.is_some() {
                    symbols.insert(node.name.clone(), (node.var_type.clone(), node.is_array));
                }
            }
            _ => {}
        }
    }

    let children = arena.node(root).children.clone();
    for child in children {
        annotate_node(arena, child, &function_types, &symbols);
    }
    symbols
}

fn annotate_node(
    arena: &mut NodeArena,
    id: NodeId,
    function_types: &FxHashMap<String, String>,
    symbols: &FxHashMap<String, (Option<String>, bool)>,
) {
    {
        let node = arena.node_mut(id);
        match node.kind {
            NodeKind::FunctionCall => {
                if let Some(return_type) = function_types.get(&node.name) {
                    node.return_type = Some(return_type.clone());
                }
            }
            NodeKind::Identifier => {
                if let Some((var_type, is_array)) = symbols.get(&node.name) {
                    node.var_type = var_type.clone();
                    node.is_array = *is_array;
                }
            }
            _ => {}
        }
    }
    for child in arena.children(id) {
        annotate_node(arena, child, function_types, symbols);
    }
}

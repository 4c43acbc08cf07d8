//! Ownership preprocessor: deterministic destruction of Owned locals.
//!
//! Rewrites the merged tree so that every Owned local is dropped on every
//! control-flow exit of its scope: explicit `drop(x)` calls are appended at
//! scope tails and inserted before `return`/`break`/`continue`, and
//! reassignment of an Owned local is wrapped as `{ drop(x); x = e; }`.
//!
//! The rewrite is recorded by an `enable_drops` directive at the head of
//! the root; a tree that already carries the directive is left untouched,
//! so running the pass twice is a no-op.

use firec_common::OwnershipCatalog;
use firec_parser::{Node, NodeArena, NodeId, NodeKind};
use rustc_hash::FxHashMap;

pub const DROP_DIRECTIVE_NAME: &str = "enable_drops";

/// Where a tracked variable was introduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Local,
    Param,
    Global,
}

#[derive(Clone, Debug)]
struct VarInfo {
    var_type: Option<String>,
    is_array: bool,
    origin: Origin,
}

#[derive(Clone, Debug)]
struct OwnedLocal {
    name: String,
    var_type: Option<String>,
    is_array: bool,
}

fn has_drop_directive(arena: &NodeArena, root: NodeId) -> bool {
    arena.node(root).children.iter().any(|&child| {
        let node = arena.node(child);
        node.kind == NodeKind::Directive && node.name == DROP_DIRECTIVE_NAME
    })
}

/// Insert explicit `drop()` calls for Owned locals at scope exits and early
/// control-flow exits. Idempotent: keyed on the `enable_drops` directive.
pub fn enable_and_insert_drops(arena: &mut NodeArena, root: NodeId, catalog: &OwnershipCatalog) {
    if has_drop_directive(arena, root) {
        tracing::debug!(target: "firec_preprocessor", "drops already inserted, skipping");
        return;
    }

    let directive = arena.alloc(Node::new(NodeKind::Directive, None, DROP_DIRECTIVE_NAME, 0));
    arena.insert_child(root, 0, directive);

    let mut inserter = DropInserter {
        arena,
        catalog,
        scope_stack: vec![Vec::new()],
        var_maps: vec![FxHashMap::default()],
    };

    // The top-level program is treated as an outer scope.
    let children = inserter.arena.children(root);
    let mut new_children: Vec<NodeId> = children
        .into_iter()
        .map(|child| inserter.process(child, true))
        .collect();
    let top_frame = inserter.scope_stack.last().cloned().unwrap_or_default();
    for local in &top_frame {
        new_children.push(inserter.make_drop_call(local));
    }
    inserter.arena.set_children(root, new_children);
}

struct DropInserter<'a> {
    arena: &'a mut NodeArena,
    catalog: &'a OwnershipCatalog,
    /// Owned locals per lexical scope, in declaration order.
    scope_stack: Vec<Vec<OwnedLocal>>,
    /// Name lookup frames, disambiguating local/param/global origins.
    var_maps: Vec<FxHashMap<String, VarInfo>>,
}

impl DropInserter<'_> {
    fn make_identifier(&mut self, local: &OwnedLocal) -> NodeId {
        let mut node = Node::new(NodeKind::Identifier, None, local.name.clone(), 0);
        node.var_type = local.var_type.clone();
        node.return_type = local.var_type.clone();
        node.is_array = local.is_array;
        node.is_ref_counted = local.is_array;
        self.arena.alloc(node)
    }

    fn make_drop_call(&mut self, local: &OwnedLocal) -> NodeId {
        let identifier = self.make_identifier(local);
        let mut call = Node::new(NodeKind::FunctionCall, None, "drop", 0);
        call.return_type = Some("void".to_string());
        let call = self.arena.alloc(call);
        self.arena.add_child(call, identifier);
        call
    }

    fn lookup(&self, name: &str) -> Option<&VarInfo> {
        self.var_maps.iter().rev().find_map(|frame| frame.get(name))
    }

    fn is_owned(&self, var_type: Option<&str>, is_array: bool) -> bool {
        self.catalog.is_owned(var_type, is_array)
    }

    /// Process one node, returning its (possibly wrapped) replacement.
    /// `at_top_level` marks direct children of the root, whose declarations
    /// register with global origin.
    fn process(&mut self, id: NodeId, at_top_level: bool) -> NodeId {
        let kind = self.arena.node(id).kind;
        match kind {
            NodeKind::VariableDeclaration => {
                let node = self.arena.node(id);
                let name = node.name.clone();
                let var_type = node.var_type.clone();
                let is_array = node.is_array;
                if self.is_owned(var_type.as_deref(), is_array) {
                    self.scope_stack
                        .last_mut()
                        .expect("at least the root frame")
                        .push(OwnedLocal {
                            name: name.clone(),
                            var_type: var_type.clone(),
                            is_array,
                        });
                }
                let origin = if at_top_level {
                    Origin::Global
                } else {
                    Origin::Local
                };
                self.var_maps
                    .last_mut()
                    .expect("at least the root frame")
                    .insert(
                        name,
                        VarInfo {
                            var_type,
                            is_array,
                            origin,
                        },
                    );
                self.process_children(id);
                id
            }

            NodeKind::VariableAssignment => {
                let target = self.arena.node(id).name.clone();
                let info = self.lookup(&target).cloned();
                self.process_children(id);
                if let Some(info) = info {
                    if info.origin != Origin::Param
                        && self.is_owned(info.var_type.as_deref(), info.is_array)
                    {
                        // Wrap as { drop(target); target = expr; } so the old
                        // value is released before the store.
                        let token = self.arena.node(id).token.clone();
                        let index = self.arena.node(id).index;
                        let wrapper = self.arena.alloc(Node::new(
                            NodeKind::Scope,
                            token,
                            "scope",
                            index,
                        ));
                        let drop_call = self.make_drop_call(&OwnedLocal {
                            name: target,
                            var_type: info.var_type,
                            is_array: info.is_array,
                        });
                        self.arena.add_child(wrapper, drop_call);
                        self.arena.add_child(wrapper, id);
                        return wrapper;
                    }
                }
                id
            }

            NodeKind::FunctionDefinition | NodeKind::ClassMethodDefinition => {
                // Parameters get their own lookup frame so reassignment of a
                // parameter is never wrapped with a drop of the caller's
                // value.
                self.var_maps.push(FxHashMap::default());
                let children = self.arena.children(id);
                let mut new_children = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    let child_node = self.arena.node(*child);
                    if i + 1 < children.len() {
                        if child_node.kind == NodeKind::Parameter {
                            let name = child_node.name.clone();
                            let var_type = child_node.var_type.clone();
                            let is_array = child_node.is_array;
                            self.var_maps
                                .last_mut()
                                .expect("frame pushed above")
                                .insert(
                                    name,
                                    VarInfo {
                                        var_type,
                                        is_array,
                                        origin: Origin::Param,
                                    },
                                );
                            new_children.push(*child);
                        }
                    } else {
                        new_children.push(self.process(*child, false));
                    }
                }
                self.arena.set_children(id, new_children);
                self.var_maps.pop();
                id
            }

            NodeKind::Scope => {
                self.scope_stack.push(Vec::new());
                self.var_maps.push(FxHashMap::default());
                let children = self.arena.children(id);
                let mut new_children: Vec<NodeId> = children
                    .into_iter()
                    .map(|child| self.process(child, false))
                    .collect();
                // Fall-through cleanup at the tail of the scope, in
                // declaration order.
                let frame = self.scope_stack.last().cloned().unwrap_or_default();
                for local in &frame {
                    new_children.push(self.make_drop_call(local));
                }
                self.arena.set_children(id, new_children);
                self.scope_stack.pop();
                self.var_maps.pop();
                id
            }

            NodeKind::ReturnStatement => {
                // Drops for every Owned local live across all open frames,
                // outer to inner, then the original return.
                let token = self.arena.node(id).token.clone();
                let index = self.arena.node(id).index;
                let wrapper = self
                    .arena
                    .alloc(Node::new(NodeKind::Scope, token, "scope", index));
                let locals: Vec<OwnedLocal> = self
                    .scope_stack
                    .iter()
                    .flat_map(|frame| frame.iter().cloned())
                    .collect();
                for local in &locals {
                    let drop_call = self.make_drop_call(local);
                    self.arena.add_child(wrapper, drop_call);
                }
                self.arena.add_child(wrapper, id);
                wrapper
            }

            NodeKind::BreakStatement | NodeKind::ContinueStatement => {
                // Only the innermost open frame is cleaned before the
                // transfer.
                let token = self.arena.node(id).token.clone();
                let index = self.arena.node(id).index;
                let wrapper = self
                    .arena
                    .alloc(Node::new(NodeKind::Scope, token, "scope", index));
                let frame = self.scope_stack.last().cloned().unwrap_or_default();
                for local in &frame {
                    let drop_call = self.make_drop_call(local);
                    self.arena.add_child(wrapper, drop_call);
                }
                self.arena.add_child(wrapper, id);
                wrapper
            }

            _ => {
                self.process_children(id);
                id
            }
        }
    }

    fn process_children(&mut self, id: NodeId) {
        let children = self.arena.children(id);
        let new_children: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.process(child, false))
            .collect();
        self.arena.set_children(id, new_children);
    }
}

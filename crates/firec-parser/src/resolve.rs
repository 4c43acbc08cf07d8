//! Identifier resolution: a lexical scope chain walk over the built tree.
//!
//! A new scope is introduced for each `Scope`, `FunctionDefinition`, and
//! `ClassMethodDefinition`. Shadowing of any outer binding is an error.
//! Resolved identifier uses are annotated with their type, array flag, and
//! value category; unresolved uses are reported immediately unless the file
//! has imports, in which case they are deferred for revalidation after the
//! import merge.

use rustc_hash::FxHashMap;

use crate::node::{NodeId, NodeKind};
use crate::state::ParserState;

type ScopeEntry = (Option<String>, bool);
type ScopeStack = Vec<FxHashMap<String, ScopeEntry>>;

fn lookup(scopes: &ScopeStack, name: &str) -> Option<ScopeEntry> {
    scopes.iter().rev().find_map(|frame| frame.get(name).cloned())
}

impl ParserState {
    pub(crate) fn resolve_variable_types(&mut self) {
        let mut scopes: ScopeStack = vec![FxHashMap::default()];
        let root = self.root;
        self.resolve_node(root, &mut scopes);
    }

    fn annotate_value_category(&mut self, id: NodeId) {
        let node = self.arena.node(id);
        let category = self
            .registries
            .catalog
            .value_category(node.var_type.as_deref(), node.is_array);
        self.arena.node_mut(id).value_category = category;
    }

    fn resolve_node(&mut self, id: NodeId, scopes: &mut ScopeStack) {
        let kind = self.arena.node(id).kind;
        match kind {
            NodeKind::Scope => {
                scopes.push(FxHashMap::default());
                for child in self.arena.children(id) {
                    self.resolve_node(child, scopes);
                }
                scopes.pop();
            }

            NodeKind::FunctionDefinition | NodeKind::ClassMethodDefinition => {
                scopes.push(FxHashMap::default());
                let children = self.arena.children(id);
                let (params, body) = match children.split_last() {
                    Some((body, params)) => (params.to_vec(), Some(*body)),
                    None => (Vec::new(), None),
                };
                for param in params {
                    let node = self.arena.node(param);
                    if node.kind != NodeKind::Parameter {
                        continue;
                    }
                    let name = node.name.clone();
                    let entry = (node.var_type.clone(), node.is_array);
                    let token = node.token.clone();
                    if lookup(scopes, &name).is_some() {
                        self.error(
                            format!(
                                "Parameter '{name}' already declared in an outer scope; shadowing not allowed"
                            ),
                            token.as_ref(),
                        );
                    }
                    scopes
                        .last_mut()
                        .expect("frame pushed above")
                        .insert(name, entry);
                    self.annotate_value_category(param);
                }
                // Methods always see `this` as the receiver type, even when
                // the receiver parameter is synthetic.
                if kind == NodeKind::ClassMethodDefinition {
                    if let Some(class_name) = self.arena.node(id).class_name.clone() {
                        if lookup(scopes, "this").is_none() {
                            scopes
                                .last_mut()
                                .expect("frame pushed above")
                                .insert("this".to_string(), (Some(class_name), false));
                        }
                    }
                }
                if let Some(body) = body {
                    self.resolve_node(body, scopes);
                }
                scopes.pop();
            }

            NodeKind::VariableDeclaration => {
                let node = self.arena.node(id);
                let name = node.name.clone();
                let entry = (node.var_type.clone(), node.is_array);
                let token = node.token.clone();
                if lookup(scopes, &name).is_some() {
                    self.error(
                        format!(
                            "Variable '{name}' already declared in an outer scope; shadowing not allowed"
                        ),
                        token.as_ref(),
                    );
                }
                scopes
                    .last_mut()
                    .expect("at least the root frame")
                    .insert(name, entry);
                self.annotate_value_category(id);
                for child in self.arena.children(id) {
                    self.resolve_node(child, scopes);
                }
            }

            NodeKind::VariableAssignment => {
                // Resolve the RHS first so identifiers inside it are typed.
                for child in self.arena.children(id) {
                    self.resolve_node(child, scopes);
                }
                let name = self.arena.node(id).name.clone();
                if lookup(scopes, &name).is_none() {
                    // Implicit declaration on first assignment for
                    // class-typed right-hand sides.
                    let inferred = self.infer_implicit_assignment_type(id, scopes);
                    scopes
                        .last_mut()
                        .expect("at least the root frame")
                        .insert(name, (inferred, false));
                }
            }

            NodeKind::Identifier => {
                let name = self.arena.node(id).name.clone();
                match lookup(scopes, &name) {
                    Some((var_type, is_array)) => {
                        let node = self.arena.node_mut(id);
                        node.var_type = var_type;
                        node.is_array = is_array;
                        self.annotate_value_category(id);
                    }
                    None => {
                        let token = self.arena.node(id).token.clone();
                        if self.defer_undefined_identifiers {
                            self.deferred_undefined.push((name, token));
                        } else {
                            self.error(format!("Variable '{name}' not defined"), token.as_ref());
                        }
                    }
                }
            }

            _ => {
                for child in self.arena.children(id) {
                    self.resolve_node(child, scopes);
                }
            }
        }
    }

    /// Infer the implicit type of `x = <rhs>` when `x` is undeclared and the
    /// RHS is a constructor-style call or an instance method call.
    fn infer_implicit_assignment_type(
        &self,
        id: NodeId,
        scopes: &ScopeStack,
    ) -> Option<String> {
        let rhs = *self.arena.node(id).children.first()?;
        let rhs_node = self.arena.node(rhs);
        match rhs_node.kind {
            NodeKind::FunctionCall if self.registries.user_types.contains(&rhs_node.name) => {
                Some(rhs_node.name.clone())
            }
            NodeKind::MethodCall => {
                let object = *rhs_node.children.first()?;
                let object_node = self.arena.node(object);
                let object_type = object_node.var_type.clone().or_else(|| {
                    if object_node.kind == NodeKind::Identifier {
                        lookup(scopes, &object_node.name).and_then(|(t, _)| t)
                    } else {
                        None
                    }
                })?;
                self.registries
                    .user_methods
                    .get(&object_type)?
                    .get(&rhs_node.name)?
                    .return_type
                    .clone()
            }
            _ => None,
        }
    }
}

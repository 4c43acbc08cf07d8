//! Ownership, move, and borrow analysis.
//!
//! A two-pass checker over the merged, drop-annotated tree:
//!
//! 1. Signature collection: record every function's parameter list without
//!    descending into bodies.
//! 2. Flow-sensitive walk: track ownership state per binding in a scope
//!    stack, detect use-after-move, validate borrowed parameters, and mark
//!    last uses for downstream drop placement.
//!
//! `drop(x)` calls are synthesised by the preprocessor; their arguments are
//! exempt from use-after-move checking so a frame's trailing drops never
//! trip over an earlier move.

use firec_common::{Diagnostic, OwnershipCatalog, types::is_generic_param_name};
use firec_parser::{NodeArena, NodeId, NodeKind, Registries};
use rustc_hash::FxHashMap;

/// State of a variable binding in the ownership tracking system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnershipState {
    /// Binding is valid and can be used.
    Valid,
    /// Ownership was moved; the binding is invalid.
    Moved,
    /// Currently borrowed (reserved for mutable borrow tracking).
    Borrowed,
}

/// Information about one variable binding.
#[derive(Clone, Debug)]
pub struct Binding {
    pub name: String,
    pub var_type: Option<String>,
    pub is_array: bool,
    pub state: OwnershipState,
    pub declaration_node: NodeId,
    pub move_node: Option<NodeId>,
    pub last_use_node: Option<NodeId>,
}

/// An active borrow, retired when its scope depth is exited.
#[derive(Clone, Debug)]
pub struct BorrowInfo {
    pub borrowed_name: String,
    pub borrow_node: NodeId,
    pub scope_depth: usize,
}

/// One recorded parameter of a collected function signature.
#[derive(Clone, Debug)]
pub struct ParamInfo {
    pub name: String,
    pub param_type: Option<String>,
    pub is_array: bool,
    pub is_borrowed: bool,
}

pub struct SemanticAnalyzer<'a> {
    arena: &'a NodeArena,
    catalog: &'a OwnershipCatalog,
    registries: &'a Registries,
    /// Source text for diagnostic positions (synthetic nodes report 0:0).
    source: &'a str,
    pub errors: Vec<Diagnostic>,

    scope_stack: Vec<FxHashMap<String, Binding>>,
    active_borrows: Vec<BorrowInfo>,
    in_move_rhs: bool,
    function_signatures: FxHashMap<String, Vec<ParamInfo>>,
}

impl<'a> SemanticAnalyzer<'a> {
    #[must_use]
    pub fn new(
        arena: &'a NodeArena,
        catalog: &'a OwnershipCatalog,
        registries: &'a Registries,
        source: &'a str,
    ) -> Self {
        Self {
            arena,
            catalog,
            registries,
            source,
            errors: Vec::new(),
            scope_stack: vec![FxHashMap::default()],
            active_borrows: Vec::new(),
            in_move_rhs: false,
            function_signatures: FxHashMap::default(),
        }
    }

    /// Signatures collected by pass 1 (function name -> parameter records).
    #[must_use]
    pub fn function_signatures(&self) -> &FxHashMap<String, Vec<ParamInfo>> {
        &self.function_signatures
    }

    /// Run the analysis. Returns true if no errors were recorded.
    pub fn analyze(&mut self, root: NodeId) -> bool {
        tracing::debug!(target: "firec_analyzer", "collecting function signatures");
        self.collect_function_signatures(root);
        tracing::debug!(target: "firec_analyzer", "analyzing ownership and borrows");
        self.analyze_node(root);
        self.errors.is_empty()
    }

    fn error(&mut self, message: String, node: NodeId) {
        let diagnostic = match &self.arena.node(node).token {
            Some(token) => Diagnostic::at_offset(message, self.source, token.index),
            None => Diagnostic::unpositioned(message),
        };
        self.errors.push(diagnostic);
    }

    // ========================================================================
    // Pass 1: signatures
    // ========================================================================

    fn collect_function_signatures(&mut self, id: NodeId) {
        let node = self.arena.node(id);
        if node.kind == NodeKind::FunctionDefinition {
            let params: Vec<ParamInfo> = node
                .children
                .iter()
                .filter_map(|&child| {
                    let child_node = self.arena.node(child);
                    (child_node.kind == NodeKind::Parameter).then(|| ParamInfo {
                        name: child_node.name.clone(),
                        param_type: child_node.var_type.clone(),
                        is_array: child_node.is_array,
                        is_borrowed: child_node.is_borrowed,
                    })
                })
                .collect();
            self.function_signatures.insert(node.name.clone(), params);
            // Bodies are not descended; only signatures matter here.
            return;
        }
        for &child in &node.children {
            self.collect_function_signatures(child);
        }
    }

    // ========================================================================
    // Scope and binding helpers
    // ========================================================================

    fn enter_scope(&mut self) {
        self.scope_stack.push(FxHashMap::default());
    }

    fn exit_scope(&mut self) {
        if self.scope_stack.len() > 1 {
            let depth = self.scope_stack.len();
            // Borrows created at this depth or deeper are retired.
            self.active_borrows.retain(|b| b.scope_depth < depth);
            self.scope_stack.pop();
        }
    }

    fn lookup_binding(&self, name: &str) -> Option<&Binding> {
        self.scope_stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
    }

    fn lookup_binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.scope_stack
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    fn register_binding(
        &mut self,
        name: &str,
        var_type: Option<String>,
        is_array: bool,
        node: NodeId,
    ) {
        self.scope_stack
            .last_mut()
            .expect("at least the root scope")
            .insert(
                name.to_string(),
                Binding {
                    name: name.to_string(),
                    var_type,
                    is_array,
                    state: OwnershipState::Valid,
                    declaration_node: node,
                    move_node: None,
                    last_use_node: None,
                },
            );
    }

    fn mark_moved(&mut self, name: &str, move_node: NodeId) {
        if let Some(binding) = self.lookup_binding_mut(name) {
            binding.state = OwnershipState::Moved;
            binding.move_node = Some(move_node);
        }
    }

    fn check_use_after_move(&mut self, name: &str, use_node: NodeId) {
        if self
            .lookup_binding(name)
            .is_some_and(|b| b.state == OwnershipState::Moved)
        {
            tracing::debug!(target: "firec_analyzer", variable = name, "use after move");
            self.error(
                format!("Use-after-move error: variable '{name}' was moved, cannot use it here"),
                use_node,
            );
        }
    }

    /// Borrowing is only valid for Owned types. Generic type parameters are
    /// "maybe-Owned" and pass: Copyable instantiations copy, Owned ones
    /// borrow.
    fn validate_borrow(&mut self, var_type: Option<&str>, is_array: bool, node: NodeId) {
        if var_type.is_some_and(is_generic_param_name) {
            return;
        }
        if !self.catalog.is_owned(var_type, is_array) {
            let type_display = match var_type {
                Some(base) if is_array => format!("{base}[]"),
                Some(base) => base.to_string(),
                None => "<unknown>".to_string(),
            };
            self.error(
                format!(
                    "Cannot borrow Copyable type '{type_display}'; pass by value instead. Borrowing is only allowed for Owned types"
                ),
                node,
            );
        }
    }

    fn is_owned_binding(&self, name: &str) -> bool {
        self.lookup_binding(name)
            .is_some_and(|b| self.catalog.is_owned(b.var_type.as_deref(), b.is_array))
    }

    // ========================================================================
    // Pass 2: flow-sensitive walk
    // ========================================================================

    fn analyze_node(&mut self, id: NodeId) {
        let node = self.arena.node(id);
        let kind = node.kind;
        let children = node.children.clone();

        match kind {
            NodeKind::VariableDeclaration => {
                let name = self.arena.node(id).name.clone();
                let var_type = self.arena.node(id).var_type.clone();
                let is_array = self.arena.node(id).is_array;

                // An Owned identifier initializer is a move of the source
                // binding; Copyable initializers copy.
                let move_source: Option<String> = children.first().and_then(|&init| {
                    let init_node = self.arena.node(init);
                    (init_node.kind == NodeKind::Identifier
                        && self.is_owned_binding(&init_node.name))
                    .then(|| init_node.name.clone())
                });

                if move_source.is_some() {
                    self.in_move_rhs = true;
                }
                for &child in &children {
                    self.analyze_node(child);
                }
                if let Some(source_name) = move_source {
                    self.in_move_rhs = false;
                    self.mark_moved(&source_name, id);
                }

                self.register_binding(&name, var_type, is_array, id);
            }

            NodeKind::VariableAssignment => {
                let name = self.arena.node(id).name.clone();
                // The target must still be valid before the store.
                self.check_use_after_move(&name, id);

                for &child in &children {
                    self.analyze_node(child);
                }

                if let Some(&rhs) = children.first() {
                    let rhs_node = self.arena.node(rhs);
                    if rhs_node.kind == NodeKind::Identifier
                        && self.is_owned_binding(&rhs_node.name)
                    {
                        let rhs_name = rhs_node.name.clone();
                        self.mark_moved(&rhs_name, id);
                    }
                }
            }

            NodeKind::Identifier => {
                let name = self.arena.node(id).name.clone();
                if !self.in_move_rhs {
                    self.check_use_after_move(&name, id);
                }
                if let Some(binding) = self.lookup_binding_mut(&name) {
                    binding.last_use_node = Some(id);
                }
            }

            NodeKind::FunctionCall => {
                let func_name = self.arena.node(id).name.clone();
                if func_name == "drop" {
                    // Synthesised destructor calls: arguments are exempt
                    // from use-after-move checking.
                    return;
                }

                match self.function_signatures.get(&func_name).cloned() {
                    Some(signature) => {
                        for (i, &arg) in children.iter().enumerate() {
                            let Some(param) = signature.get(i) else {
                                continue;
                            };
                            self.analyze_node(arg);
                            // Passing an Owned identifier to a non-borrowed
                            // parameter transfers ownership.
                            let arg_node = self.arena.node(arg);
                            if !param.is_borrowed
                                && arg_node.kind == NodeKind::Identifier
                                && self.is_owned_binding(&arg_node.name)
                            {
                                let arg_name = arg_node.name.clone();
                                self.mark_moved(&arg_name, id);
                            }
                        }
                    }
                    None => {
                        // Builtin or unknown callee: recurse structurally.
                        for &child in &children {
                            self.analyze_node(child);
                        }
                    }
                }
            }

            NodeKind::Scope => {
                self.enter_scope();
                for &child in &children {
                    self.analyze_node(child);
                }
                self.exit_scope();
            }

            NodeKind::FunctionDefinition | NodeKind::ClassMethodDefinition => {
                self.enter_scope();
                let depth = self.scope_stack.len();
                for &child in &children {
                    let child_node = self.arena.node(child);
                    match child_node.kind {
                        NodeKind::Parameter => {
                            let name = child_node.name.clone();
                            let var_type = child_node.var_type.clone();
                            let is_array = child_node.is_array;
                            let is_borrowed = child_node.is_borrowed;
                            if is_borrowed {
                                self.validate_borrow(var_type.as_deref(), is_array, child);
                                self.active_borrows.push(BorrowInfo {
                                    borrowed_name: name.clone(),
                                    borrow_node: child,
                                    scope_depth: depth,
                                });
                            }
                            self.register_binding(&name, var_type, is_array, child);
                        }
                        NodeKind::Scope => self.analyze_node(child),
                        _ => {}
                    }
                }
                self.exit_scope();
            }

            NodeKind::ClassDefinition => {
                for &child in &children {
                    if self.arena.node(child).kind == NodeKind::ClassMethodDefinition {
                        self.analyze_node(child);
                    }
                }
            }

            NodeKind::SuperCall => {
                // The base class must define a constructor for
                // `this.super(...)` to target.
                if let Some(base) = self.arena.node(id).base_class.clone() {
                    let has_constructor = self
                        .registries
                        .user_methods
                        .get(&base)
                        .is_some_and(|methods| methods.contains_key(&base));
                    if !has_constructor {
                        self.error(
                            format!("No constructor defined for base type '{base}'"),
                            id,
                        );
                    }
                }
                for &child in &children {
                    self.analyze_node(child);
                }
            }

            // Control flow recurses with the shared binding table; a move in
            // either arm conservatively poisons the binding.
            _ => {
                for &child in &children {
                    self.analyze_node(child);
                }
            }
        }
    }
}

//! C source emitter.
//!
//! Consumes the merged, drop-annotated tree and produces one self-contained
//! C translation unit: runtime preamble, class structs, monomorphised
//! generic instances, functions, and a `main` holding the entry module's
//! top-level statements.

use firec_parser::{NodeArena, NodeId, NodeKind, Registries};
use rustc_hash::FxHashMap;

pub mod runtime;
pub mod types;

mod expr;
mod stmt;

use types::{c_type, mangle_generic};

pub struct CEmitter<'a> {
    pub(crate) arena: &'a NodeArena,
    root: NodeId,
    pub(crate) registries: &'a Registries,
    pub(crate) out: String,
    pub(crate) indent: usize,
    /// Type-parameter substitution active while emitting a monomorphised
    /// generic instance.
    pub(crate) type_subst: FxHashMap<String, String>,
}

impl<'a> CEmitter<'a> {
    #[must_use]
    pub fn new(arena: &'a NodeArena, root: NodeId, registries: &'a Registries) -> Self {
        Self {
            arena,
            root,
            registries,
            out: String::new(),
            indent: 0,
            type_subst: FxHashMap::default(),
        }
    }

    /// Generate the complete C translation unit.
    #[must_use]
    pub fn generate(mut self) -> String {
        self.out.push_str(runtime::RUNTIME_PREAMBLE);
        self.out.push('\n');

        let top_level = self.arena.children(self.root);
        let classes: Vec<NodeId> = top_level
            .iter()
            .copied()
            .filter(|&id| self.arena.node(id).kind == NodeKind::ClassDefinition)
            .collect();
        let functions: Vec<NodeId> = top_level
            .iter()
            .copied()
            .filter(|&id| self.arena.node(id).kind == NodeKind::FunctionDefinition)
            .collect();
        let globals: Vec<NodeId> = top_level
            .iter()
            .copied()
            .filter(|&id| self.arena.node(id).kind == NodeKind::VariableDeclaration)
            .collect();

        self.emit_class_structs(&classes);
        let instances = self.collect_generic_instances();
        self.emit_prototypes(&classes, &functions, &instances);
        self.emit_globals(&globals);
        self.emit_class_helpers(&classes);
        self.emit_functions(&functions, &instances);
        self.emit_main(&top_level);
        self.out
    }

    // ========================================================================
    // Writer helpers
    // ========================================================================

    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Apply the active generic substitution to a base type name.
    pub(crate) fn subst(&self, base: &str) -> String {
        self.type_subst
            .get(base)
            .cloned()
            .unwrap_or_else(|| base.to_string())
    }

    pub(crate) fn ctype(&self, base: &str, is_array: bool) -> String {
        c_type(&self.subst(base), is_array, self.registries)
    }

    /// Static type of an expression node as `(base, is_array)`, with the
    /// generic substitution applied.
    pub(crate) fn expr_type(&self, id: NodeId) -> Option<(String, bool)> {
        let node = self.arena.node(id);
        let display = match node.kind {
            NodeKind::Identifier => {
                let base = node.var_type.clone()?;
                return Some((self.subst(&base), node.is_array));
            }
            NodeKind::ArrayLiteral => {
                let first = *node.children.first()?;
                let (base, _) = self.expr_type(first)?;
                return Some((base, true));
            }
            _ => node.return_type.clone()?,
        };
        let (base, is_array) = firec_common::types::split_array_type(&display);
        Some((self.subst(base), is_array))
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn emit_class_structs(&mut self, classes: &[NodeId]) {
        for &class in classes {
            let name = self.arena.node(class).name.clone();
            self.line(&format!("struct {name};"));
        }
        if !classes.is_empty() {
            self.blank();
        }
        for &class in classes {
            let name = self.arena.node(class).name.clone();
            self.line(&format!("struct {name} {{"));
            self.indent += 1;
            for child in self.arena.children(class) {
                let node = self.arena.node(child);
                if node.kind != NodeKind::ClassField {
                    continue;
                }
                let field_type = node.var_type.clone().unwrap_or_default();
                let field_name = node.name.clone();
                let ctype = self.ctype(&field_type, false);
                self.line(&format!("{} {field_name};", ctype.trim_end()));
            }
            self.indent -= 1;
            self.line("};");
            self.blank();
        }
    }

    /// Every distinct `(name, type_args)` tuple recorded on generic call
    /// nodes becomes one monomorphised instance.
    fn collect_generic_instances(&self) -> Vec<(String, Vec<String>)> {
        let mut instances: Vec<(String, Vec<String>)> = Vec::new();
        for index in 0..self.arena.len() {
            let node = self.arena.node(NodeId(index as u32));
            if node.kind == NodeKind::FunctionCall && !node.type_args.is_empty() {
                let key = (node.name.clone(), node.type_args.clone());
                if !instances.contains(&key) {
                    instances.push(key);
                }
            }
        }
        instances
    }

    fn function_signature(&self, id: NodeId, mangled: Option<&str>) -> String {
        let node = self.arena.node(id);
        let (return_base, return_is_array) = node
            .return_type
            .as_deref()
            .map(firec_common::types::split_array_type)
            .map_or(("void".to_string(), false), |(b, a)| (b.to_string(), a));
        let return_ctype = self.ctype(&return_base, return_is_array);
        let name = mangled.unwrap_or(&node.name);

        let mut params: Vec<String> = Vec::new();
        for &child in &node.children {
            let child_node = self.arena.node(child);
            if child_node.kind != NodeKind::Parameter {
                continue;
            }
            let base = child_node.var_type.clone().unwrap_or_default();
            let ctype = self.ctype(&base, child_node.is_array);
            params.push(format!("{} {}", ctype.trim_end(), child_node.name));
        }
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };
        format!("static {} {name}({params})", return_ctype.trim_end())
    }

    fn method_signature(&self, class_name: &str, method: NodeId) -> String {
        let node = self.arena.node(method);
        if node.is_constructor {
            // Constructors initialize caller-provided storage.
            let mut params = vec![format!("struct {class_name} *this")];
            for &child in &node.children {
                let child_node = self.arena.node(child);
                if child_node.kind != NodeKind::Parameter || child_node.name == "this" {
                    continue;
                }
                let base = child_node.var_type.clone().unwrap_or_default();
                let ctype = self.ctype(&base, child_node.is_array);
                params.push(format!("{} {}", ctype.trim_end(), child_node.name));
            }
            return format!(
                "static void {class_name}_{}({})",
                node.name,
                params.join(", ")
            );
        }

        let (return_base, return_is_array) = node
            .return_type
            .as_deref()
            .map(firec_common::types::split_array_type)
            .map_or(("void".to_string(), false), |(b, a)| (b.to_string(), a));
        let return_ctype = self.ctype(&return_base, return_is_array);
        let mut params: Vec<String> = Vec::new();
        for &child in &node.children {
            let child_node = self.arena.node(child);
            if child_node.kind != NodeKind::Parameter {
                continue;
            }
            let base = child_node.var_type.clone().unwrap_or_default();
            let ctype = self.ctype(&base, child_node.is_array);
            params.push(format!("{} {}", ctype.trim_end(), child_node.name));
        }
        format!(
            "static {} {class_name}_{}({})",
            return_ctype.trim_end(),
            node.name,
            params.join(", ")
        )
    }

    fn class_constructor(&self, class: NodeId) -> Option<NodeId> {
        self.arena
            .node(class)
            .children
            .iter()
            .copied()
            .find(|&m| self.arena.node(m).is_constructor)
    }

    fn emit_prototypes(
        &mut self,
        classes: &[NodeId],
        functions: &[NodeId],
        instances: &[(String, Vec<String>)],
    ) {
        for &class in classes {
            let class_name = self.arena.node(class).name.clone();
            for method in self.arena.children(class) {
                if self.arena.node(method).kind != NodeKind::ClassMethodDefinition {
                    continue;
                }
                let signature = self.method_signature(&class_name, method);
                self.line(&format!("{signature};"));
            }
            let field_params = self.field_constructor_params(class);
            self.line(&format!(
                "static struct {class_name} *{class_name}_of({field_params});"
            ));
            if self.class_constructor(class).is_some() {
                let ctor_params = self.constructor_value_params(class);
                self.line(&format!(
                    "static struct {class_name} *{class_name}_new({ctor_params});"
                ));
            }
        }

        for &function in functions {
            if !self.arena.node(function).type_params.is_empty() {
                continue;
            }
            let signature = self.function_signature(function, None);
            self.line(&format!("{signature};"));
        }
        for (name, type_args) in instances {
            if let Some(&function) = self
                .arena
                .children(self.root)
                .iter()
                .find(|&&f| self.arena.node(f).kind == NodeKind::FunctionDefinition
                    && self.arena.node(f).name == *name)
            {
                self.with_generic_subst(function, type_args, |emitter| {
                    let signature =
                        emitter.function_signature(function, Some(&mangle_generic(name, type_args)));
                    emitter.line(&format!("{signature};"));
                });
            }
        }
        self.blank();
    }

    fn field_constructor_params(&self, class: NodeId) -> String {
        let mut params: Vec<String> = Vec::new();
        for &child in &self.arena.node(class).children {
            let node = self.arena.node(child);
            if node.kind != NodeKind::ClassField {
                continue;
            }
            let base = node.var_type.clone().unwrap_or_default();
            let ctype = self.ctype(&base, false);
            params.push(format!("{} {}", ctype.trim_end(), node.name));
        }
        if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        }
    }

    fn constructor_value_params(&self, class: NodeId) -> String {
        let Some(ctor) = self.class_constructor(class) else {
            return "void".to_string();
        };
        let mut params: Vec<String> = Vec::new();
        for &child in &self.arena.node(ctor).children {
            let node = self.arena.node(child);
            if node.kind != NodeKind::Parameter || node.name == "this" {
                continue;
            }
            let base = node.var_type.clone().unwrap_or_default();
            let ctype = self.ctype(&base, node.is_array);
            params.push(format!("{} {}", ctype.trim_end(), node.name));
        }
        if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        }
    }

    fn emit_globals(&mut self, globals: &[NodeId]) {
        for &global in globals {
            let node = self.arena.node(global);
            let base = node.var_type.clone().unwrap_or_default();
            let name = node.name.clone();
            let is_array = node.is_array;
            let ctype = self.ctype(&base, is_array);
            self.line(&format!("static {} {name};", ctype.trim_end()));
        }
        if !globals.is_empty() {
            self.blank();
        }
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    fn emit_class_helpers(&mut self, classes: &[NodeId]) {
        for &class in classes {
            let class_name = self.arena.node(class).name.clone();

            // Positional constructor over the ordered field list.
            let field_params = self.field_constructor_params(class);
            self.line(&format!(
                "static struct {class_name} *{class_name}_of({field_params}) {{"
            ));
            self.indent += 1;
            self.line(&format!(
                "struct {class_name} *this = fs_alloc(sizeof(struct {class_name}));"
            ));
            for child in self.arena.children(class) {
                let node = self.arena.node(child);
                if node.kind == NodeKind::ClassField {
                    let field = node.name.clone();
                    self.line(&format!("this->{field} = {field};"));
                }
            }
            self.line("return this;");
            self.indent -= 1;
            self.line("}");
            self.blank();

            // Allocating wrapper around the user-defined constructor.
            if let Some(ctor) = self.class_constructor(class) {
                let ctor_name = self.arena.node(ctor).name.clone();
                let ctor_params = self.constructor_value_params(class);
                let mut args: Vec<String> = vec!["this".to_string()];
                for &child in &self.arena.node(ctor).children.clone() {
                    let node = self.arena.node(child);
                    if node.kind == NodeKind::Parameter && node.name != "this" {
                        args.push(node.name.clone());
                    }
                }
                self.line(&format!(
                    "static struct {class_name} *{class_name}_new({ctor_params}) {{"
                ));
                self.indent += 1;
                self.line(&format!(
                    "struct {class_name} *this = fs_alloc(sizeof(struct {class_name}));"
                ));
                self.line(&format!(
                    "{class_name}_{ctor_name}({});",
                    args.join(", ")
                ));
                self.line("return this;");
                self.indent -= 1;
                self.line("}");
                self.blank();
            }

            for method in self.arena.children(class) {
                if self.arena.node(method).kind != NodeKind::ClassMethodDefinition {
                    continue;
                }
                let signature = self.method_signature(&class_name, method);
                self.line(&format!("{signature} {{"));
                self.indent += 1;
                if let Some(&body) = self.arena.node(method).children.last() {
                    if self.arena.node(body).kind == NodeKind::Scope {
                        for stmt in self.arena.children(body) {
                            self.emit_statement(stmt);
                        }
                    }
                }
                self.indent -= 1;
                self.line("}");
                self.blank();
            }
        }
    }

    fn emit_functions(&mut self, functions: &[NodeId], instances: &[(String, Vec<String>)]) {
        for &function in functions {
            if !self.arena.node(function).type_params.is_empty() {
                continue;
            }
            self.emit_function_definition(function, None);
        }
        for (name, type_args) in instances {
            let Some(&function) = self
                .arena
                .children(self.root)
                .iter()
                .find(|&&f| self.arena.node(f).kind == NodeKind::FunctionDefinition
                    && self.arena.node(f).name == *name)
            else {
                continue;
            };
            self.with_generic_subst(function, type_args, |emitter| {
                emitter.emit_function_definition(function, Some(mangle_generic(name, type_args)));
            });
        }
    }

    fn with_generic_subst(
        &mut self,
        function: NodeId,
        type_args: &[String],
        f: impl FnOnce(&mut Self),
    ) {
        let type_params = self.arena.node(function).type_params.clone();
        let previous = std::mem::take(&mut self.type_subst);
        for (param, arg) in type_params.iter().zip(type_args) {
            self.type_subst.insert(param.clone(), arg.clone());
        }
        f(self);
        self.type_subst = previous;
    }

    fn emit_function_definition(&mut self, function: NodeId, mangled: Option<String>) {
        let signature = self.function_signature(function, mangled.as_deref());
        self.line(&format!("{signature} {{"));
        self.indent += 1;
        if let Some(&body) = self.arena.node(function).children.last() {
            if self.arena.node(body).kind == NodeKind::Scope {
                for stmt in self.arena.children(body) {
                    self.emit_statement(stmt);
                }
            }
        }
        self.indent -= 1;
        self.line("}");
        self.blank();
    }

    fn emit_main(&mut self, top_level: &[NodeId]) {
        self.line("int main(void) {");
        self.indent += 1;
        for &child in top_level {
            let node = self.arena.node(child);
            match node.kind {
                NodeKind::Directive
                | NodeKind::ClassDefinition
                | NodeKind::FunctionDefinition
                | NodeKind::ImportStatement => {}
                NodeKind::VariableDeclaration => {
                    // Globals are declared file-scope; initialize here.
                    let name = node.name.clone();
                    if let Some(&init) = node.children.first() {
                        let value = self.emit_expression(init);
                        self.line(&format!("{name} = {value};"));
                    }
                }
                _ => self.emit_statement(child),
            }
        }
        self.line("return 0;");
        self.indent -= 1;
        self.line("}");
    }
}

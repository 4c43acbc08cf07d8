//! Statement lowering to C.

use firec_parser::{NodeId, NodeKind};

use crate::CEmitter;

impl CEmitter<'_> {
    pub(crate) fn emit_statement(&mut self, id: NodeId) {
        let kind = self.arena.node(id).kind;
        match kind {
            NodeKind::VariableDeclaration => {
                let name = self.arena.node(id).name.clone();
                let base = self.arena.node(id).var_type.clone().unwrap_or_default();
                let is_array = self.arena.node(id).is_array;
                let init = self.arena.node(id).children.first().copied();
                let ctype = self.ctype(&base, is_array);
                match init {
                    Some(init) => {
                        let value = self.emit_expression(init);
                        self.line(&format!("{} {name} = {value};", ctype.trim_end()));
                    }
                    None => self.line(&format!("{} {name};", ctype.trim_end())),
                }
            }

            NodeKind::VariableAssignment => {
                let name = self.arena.node(id).name.clone();
                let value_id = self.arena.node(id).children[0];
                let value = self.emit_expression(value_id);
                self.line(&format!("{name} = {value};"));
            }

            NodeKind::CompoundAssignment => {
                let name = self.arena.node(id).name.clone();
                let op = self
                    .arena
                    .node(id)
                    .token
                    .as_ref()
                    .map(|t| t.lexeme.clone())
                    .unwrap_or_else(|| "+=".to_string());
                let value_id = self.arena.node(id).children[0];
                let value = self.emit_expression(value_id);
                self.line(&format!("{name} {op} {value};"));
            }

            NodeKind::UnaryExpression => {
                // Statement-level ++/--.
                let code = self.emit_expression(id);
                self.line(&format!("{code};"));
            }

            NodeKind::Assignment => {
                let children = self.arena.node(id).children.clone();
                let target = self.emit_expression(children[0]);
                let value = self.emit_expression(children[1]);
                self.line(&format!("{target} = {value};"));
            }

            NodeKind::FunctionCall
            | NodeKind::MethodCall
            | NodeKind::SuperCall
            | NodeKind::TypeMethodCall
            | NodeKind::ConstructorCall => {
                let code = self.emit_expression(id);
                self.line(&format!("{code};"));
            }

            NodeKind::ReturnStatement => {
                let value = self.arena.node(id).children.first().copied();
                match value {
                    Some(value) => {
                        let code = self.emit_expression(value);
                        self.line(&format!("return {code};"));
                    }
                    None => self.line("return;"),
                }
            }

            NodeKind::IfStatement => {
                let children = self.arena.node(id).children.clone();
                let condition = self.emit_expression(children[0]);
                self.line(&format!("if ({condition}) {{"));
                self.indent += 1;
                for stmt in self.arena.children(children[1]) {
                    self.emit_statement(stmt);
                }
                self.indent -= 1;
                if let Some(&else_branch) = children.get(2) {
                    self.line("} else {");
                    self.indent += 1;
                    for stmt in self.arena.children(else_branch) {
                        self.emit_statement(stmt);
                    }
                    self.indent -= 1;
                }
                self.line("}");
            }

            NodeKind::WhileStatement => {
                let children = self.arena.node(id).children.clone();
                let condition = self.emit_expression(children[0]);
                self.line(&format!("while ({condition}) {{"));
                self.indent += 1;
                for stmt in self.arena.children(children[1]) {
                    self.emit_statement(stmt);
                }
                self.indent -= 1;
                self.line("}");
            }

            NodeKind::BreakStatement => self.line("break;"),
            NodeKind::ContinueStatement => self.line("continue;"),

            NodeKind::Scope => {
                self.line("{");
                self.indent += 1;
                for stmt in self.arena.children(id) {
                    self.emit_statement(stmt);
                }
                self.indent -= 1;
                self.line("}");
            }

            // Directives influence earlier passes, not the output.
            NodeKind::Directive | NodeKind::ImportStatement => {}

            _ => {}
        }
    }
}

//! Expression lowering to C.

use firec_lexer::TokenKind;
use firec_parser::{NodeId, NodeKind};

use crate::CEmitter;
use crate::types::{is_float, is_signed_int, is_unsigned_int, mangle_generic};

impl CEmitter<'_> {
    pub(crate) fn emit_expression(&mut self, id: NodeId) -> String {
        let kind = self.arena.node(id).kind;
        match kind {
            NodeKind::Literal => self.emit_literal(id),
            NodeKind::Identifier => self.arena.node(id).name.clone(),
            NodeKind::BinaryExpression => self.emit_binary(id),
            NodeKind::UnaryExpression => {
                let op = self.arena.node(id).name.clone();
                let operand = self.arena.node(id).children.first().copied();
                match operand {
                    Some(operand) => {
                        let operand = self.emit_expression(operand);
                        format!("({op}{operand})")
                    }
                    // Statement-level ++/-- keeps the identifier in its
                    // token.
                    None => {
                        let target = self
                            .arena
                            .node(id)
                            .token
                            .as_ref()
                            .map(|t| t.lexeme.clone())
                            .unwrap_or_default();
                        format!("{target}{op}")
                    }
                }
            }
            NodeKind::EqualityExpression => self.emit_equality(id),
            NodeKind::RelationalExpression => {
                let op = self.arena.node(id).name.clone();
                let children = self.arena.node(id).children.clone();
                let left = self.emit_expression(children[0]);
                let right = self.emit_expression(children[1]);
                format!("({left} {op} {right})")
            }
            NodeKind::CastExpression => self.emit_cast(id),
            NodeKind::ArrayLiteral => self.emit_array_literal(id),
            NodeKind::ArrayAccess => self.emit_array_access(id),
            NodeKind::FieldAccess => {
                let field = self.arena.node(id).name.clone();
                let object_id = self.arena.node(id).children[0];
                let object = self.emit_expression(object_id);
                format!("{object}->{field}")
            }
            NodeKind::FunctionCall => self.emit_call(id),
            NodeKind::MethodCall => self.emit_method_call(id),
            NodeKind::TypeMethodCall => {
                let class_name = self.arena.node(id).class_name.clone().unwrap_or_default();
                let children = self.arena.node(id).children.clone();
                let args = self.emit_arguments(&children);
                format!("{class_name}_new({args})")
            }
            NodeKind::ConstructorCall => {
                let class_name = self.arena.node(id).name.clone();
                let children = self.arena.node(id).children.clone();
                let args = self.emit_arguments(&children);
                format!("{class_name}_new({args})")
            }
            NodeKind::SuperCall => {
                let base = self.arena.node(id).base_class.clone().unwrap_or_default();
                let children = self.arena.node(id).children.clone();
                let mut args = vec![format!("(struct {base} *)this")];
                for child in children {
                    args.push(self.emit_expression(child));
                }
                format!("{base}_{base}({})", args.join(", "))
            }
            _ => "0".to_string(),
        }
    }

    fn emit_arguments(&mut self, children: &[NodeId]) -> String {
        children
            .iter()
            .map(|&c| self.emit_expression(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn emit_literal(&self, id: NodeId) -> String {
        let node = self.arena.node(id);
        let Some(token) = &node.token else {
            return node.name.clone();
        };
        let text = token.lexeme.clone();
        match token.kind {
            TokenKind::IntegerLiteral => {
                for suffix in ["i64", "u64", "i32", "u32", "i16", "u16", "i8", "u8"] {
                    if let Some(digits) = text.strip_suffix(suffix) {
                        return match suffix {
                            "i64" => format!("{digits}LL"),
                            "u64" => format!("{digits}ULL"),
                            s if s.starts_with('u') => format!("{digits}U"),
                            _ => digits.to_string(),
                        };
                    }
                }
                text
            }
            TokenKind::FloatLiteral => {
                if let Some(digits) = text.strip_suffix("f128") {
                    format!("{digits}L")
                } else if let Some(digits) = text.strip_suffix("f64") {
                    digits.to_string()
                } else if let Some(digits) = text.strip_suffix("f32") {
                    format!("{digits}f")
                } else {
                    // A bare `f` suffix is already valid C.
                    text
                }
            }
            TokenKind::DoubleLiteral | TokenKind::BooleanLiteral => text,
            TokenKind::NullLiteral => "NULL".to_string(),
            TokenKind::StringLiteral => {
                // Strip prefix flags; the quoted body is valid C.
                match text.find('"') {
                    Some(quote) => text[quote..].to_string(),
                    None => text,
                }
            }
            _ => text,
        }
    }

    fn is_string_typed(&self, id: NodeId) -> bool {
        self.expr_type(id)
            .is_some_and(|(base, is_array)| !is_array && base == "string")
    }

    /// Convert an operand to a `char *` for string contexts.
    fn emit_string_operand(&mut self, id: NodeId) -> String {
        let operand_type = self.expr_type(id);
        let code = self.emit_expression(id);
        let Some((base, is_array)) = operand_type else {
            return code;
        };
        if is_array {
            return format!("fs_array_to_str({code})");
        }
        match base.as_str() {
            "string" => code,
            "bool" => format!("fs_bool_to_str({code})"),
            b if is_signed_int(b) => format!("fs_int_to_str((long long)({code}))"),
            b if is_unsigned_int(b) => format!("fs_uint_to_str((unsigned long long)({code}))"),
            b if is_float(b) => format!("fs_float_to_str((double)({code}))"),
            _ => code,
        }
    }

    fn emit_binary(&mut self, id: NodeId) -> String {
        let op = self.arena.node(id).name.clone();
        let children = self.arena.node(id).children.clone();
        let (left_id, right_id) = (children[0], children[1]);

        if op == "+" && (self.is_string_typed(left_id) || self.is_string_typed(right_id)) {
            let left = self.emit_string_operand(left_id);
            let right = self.emit_string_operand(right_id);
            return format!("fs_str_concat({left}, {right})");
        }
        let left = self.emit_expression(left_id);
        let right = self.emit_expression(right_id);
        format!("({left} {op} {right})")
    }

    fn emit_equality(&mut self, id: NodeId) -> String {
        let op = self.arena.node(id).name.clone();
        let children = self.arena.node(id).children.clone();
        let (left_id, right_id) = (children[0], children[1]);

        let string_operands = self.is_string_typed(left_id) && self.is_string_typed(right_id);
        let left = self.emit_expression(left_id);
        let right = self.emit_expression(right_id);
        if string_operands {
            if op == "==" {
                format!("fs_str_eq({left}, {right})")
            } else {
                format!("!fs_str_eq({left}, {right})")
            }
        } else {
            format!("({left} {op} {right})")
        }
    }

    fn emit_cast(&mut self, id: NodeId) -> String {
        let target = self.subst(&self.arena.node(id).name);
        let operand_id = self.arena.node(id).children[0];

        if target == "string" {
            return self.emit_string_operand(operand_id);
        }
        let code = self.emit_expression(operand_id);
        let ctype = self.ctype(&target, false);
        format!("({})({code})", ctype.trim_end())
    }

    fn emit_array_literal(&mut self, id: NodeId) -> String {
        let children = self.arena.node(id).children.clone();
        if children.is_empty() {
            return "fs_array_from(NULL, 0, 1)".to_string();
        }
        let element_type = self
            .expr_type(children[0])
            .map_or_else(|| "int32".to_string(), |(base, _)| base);
        let ctype = self.ctype(&element_type, false);
        let ctype = ctype.trim_end().to_string();
        let elements = self.emit_arguments(&children);
        format!(
            "fs_array_from(({ctype}[]){{{elements}}}, {}, sizeof({ctype}))",
            children.len()
        )
    }

    fn emit_array_access(&mut self, id: NodeId) -> String {
        let children = self.arena.node(id).children.clone();
        let element_type = self
            .expr_type(id)
            .map_or_else(|| "int32".to_string(), |(base, _)| base);
        let ctype = self.ctype(&element_type, false);
        let array = self.emit_expression(children[0]);
        let index = self.emit_expression(children[1]);
        format!("(({}*)({array})->data)[{index}]", ctype.trim_end())
    }

    pub(crate) fn emit_call(&mut self, id: NodeId) -> String {
        let name = self.arena.node(id).name.clone();
        let children = self.arena.node(id).children.clone();
        let type_args = self.arena.node(id).type_args.clone();

        match name.as_str() {
            "print" | "stdout" => return self.emit_print(&children, name == "print"),
            "input" => {
                let args = self.emit_arguments(&children);
                return format!("fs_input({args})");
            }
            "typeof" => {
                let type_name = children
                    .first()
                    .and_then(|&arg| self.expr_type(arg))
                    .map_or_else(
                        || "unknown".to_string(),
                        |(base, is_array)| firec_common::types::display_type(&base, is_array),
                    );
                return format!("\"{type_name}\"");
            }
            "drop" => return self.emit_drop(&children),
            // Numeric constructor builtins lower to casts.
            "int" | "int32" => {
                let args = self.emit_arguments(&children);
                return format!("(int32_t)({args})");
            }
            "float32" => {
                let args = self.emit_arguments(&children);
                return format!("(float)({args})");
            }
            "float64" => {
                let args = self.emit_arguments(&children);
                return format!("(double)({args})");
            }
            "float128" => {
                let args = self.emit_arguments(&children);
                return format!("(long double)({args})");
            }
            "bool" => {
                let args = self.emit_arguments(&children);
                return format!("(({args}) != 0)");
            }
            "char" => {
                let args = self.emit_arguments(&children);
                return format!("(char)({args})");
            }
            "string" => {
                return children
                    .first()
                    .map_or_else(|| "\"\"".to_string(), |&arg| self.emit_string_operand(arg));
            }
            _ => {}
        }

        // Calling a class name builds an instance positionally over its
        // ordered field list.
        if self.registries.user_types.contains(&name) {
            let args = self.emit_arguments(&children);
            return format!("{name}_of({args})");
        }

        let call_name = if type_args.is_empty() {
            name
        } else {
            mangle_generic(&name, &type_args)
        };
        let args = self.emit_arguments(&children);
        format!("{call_name}({args})")
    }

    /// `drop(x)` lowers to the matching runtime free for heap-backed values
    /// and to nothing for Copyable scalars.
    fn emit_drop(&mut self, children: &[NodeId]) -> String {
        let Some(&arg) = children.first() else {
            return "(void)0".to_string();
        };
        let arg_type = self.expr_type(arg);
        let code = self.emit_expression(arg);
        match arg_type {
            Some((_, true)) => format!("fs_array_free({code})"),
            Some((base, false))
                if self.registries.catalog.is_owned(Some(base.as_str()), false) =>
            {
                format!("firescript_free({code})")
            }
            _ => "(void)0".to_string(),
        }
    }

    fn emit_print(&mut self, children: &[NodeId], newline: bool) -> String {
        let nl = if newline { "\\n" } else { "" };
        let Some(&arg) = children.first() else {
            return format!("printf(\"{nl}\")");
        };
        let arg_type = self.expr_type(arg);
        let code = self.emit_expression(arg);
        let Some((base, is_array)) = arg_type else {
            return format!("printf(\"%s{nl}\", {code})");
        };
        if is_array {
            return format!("printf(\"%s{nl}\", fs_array_to_str({code}))");
        }
        match base.as_str() {
            "string" => format!("printf(\"%s{nl}\", {code})"),
            "bool" => format!("printf(\"%s{nl}\", fs_bool_to_str({code}))"),
            "char" => format!("printf(\"%c{nl}\", {code})"),
            "int64" => format!("printf(\"%lld{nl}\", (long long)({code}))"),
            "uint64" => format!("printf(\"%llu{nl}\", (unsigned long long)({code}))"),
            b if is_signed_int(b) => format!("printf(\"%d{nl}\", (int)({code}))"),
            b if is_unsigned_int(b) => format!("printf(\"%u{nl}\", (unsigned)({code}))"),
            "float128" => format!("printf(\"%Lf{nl}\", {code})"),
            b if is_float(b) => format!("printf(\"%f{nl}\", (double)({code}))"),
            _ => format!("printf(\"%p{nl}\", (void *)({code}))"),
        }
    }

    fn emit_method_call(&mut self, id: NodeId) -> String {
        let method = self.arena.node(id).name.clone();
        let children = self.arena.node(id).children.clone();
        let object_id = children[0];

        if let Some((_, true)) = self.expr_type(object_id) {
            // Fixed-size arrays expose length/size only.
            let object = self.emit_expression(object_id);
            return format!("(int32_t)(({object})->len)");
        }

        let class_name = self
            .expr_type(object_id)
            .map_or_else(String::new, |(base, _)| base);
        let mut args = vec![self.emit_expression(object_id)];
        for &arg in &children[1..] {
            args.push(self.emit_expression(arg));
        }
        format!("{class_name}_{method}({})", args.join(", "))
    }
}
